mod common;

use wave_analyzer::config::{AnalysisConfig, DetectorKind};
use wave_analyzer::core::fibonacci::FibonacciCalculator;
use wave_analyzer::core::indicators::rsi;
use wave_analyzer::core::pivots::{
    AdaptiveDetector, PivotDetector, WindowDetector, ZigZagDetector,
};
use wave_analyzer::core::waves::WaveFamily;
use wave_analyzer::exchange::{CandleSource, HistoricalSource};
use wave_analyzer::models::{SignalAction, Timeframe, WavePosition, WaveType};
use wave_analyzer::strategies::signals::TradingSignal;
use wave_analyzer::strategies::timeframe_aggregator::MultiTimeframeAggregator;
use wave_analyzer::strategies::wave_analyzer::{MultiTimeframeAnalyzer, WaveAnalyzer};
use wave_analyzer::AnalysisError;

use common::{rising_closes, swinging_market, waypoint_hourly};

fn config_with(detector: DetectorKind) -> AnalysisConfig {
    AnalysisConfig {
        detector,
        ..AnalysisConfig::default()
    }
}

#[test]
fn short_input_fails_validation() {
    let candles = swinging_market(30);
    let analyzer = WaveAnalyzer::from_config(&AnalysisConfig::default()).unwrap();
    match analyzer.analyze(&candles, Timeframe::H1) {
        Err(AnalysisError::InsufficientData { required, provided }) => {
            assert_eq!(required, 50);
            assert_eq!(provided, 30);
        }
        other => panic!("expected InsufficientData, got {:?}", other),
    }
}

#[test]
fn detectors_stay_in_bounds_and_ordered() {
    let candles = swinging_market(300);
    let detectors: Vec<Box<dyn PivotDetector>> = vec![
        Box::new(WindowDetector::new(5, 1.0)),
        Box::new(ZigZagDetector::new(3.0)),
        Box::new(AdaptiveDetector::new(14, 2.0)),
    ];
    for d in &detectors {
        let set = d.detect(&candles);
        assert!(!set.is_empty(), "{} found nothing", d.name());
        for side in [&set.highs, &set.lows] {
            assert!(side.iter().all(|p| p.index < candles.len()));
            assert!(side.windows(2).all(|w| w[0].index < w[1].index));
        }
        // no hidden state between calls
        assert_eq!(set, d.detect(&candles), "{}", d.name());
    }
}

#[test]
fn fibonacci_reference_levels() {
    let levels = FibonacciCalculator::new().calculate_levels(100.0, 200.0);
    assert!((levels.retracement(0.618).unwrap() - 138.2).abs() < 1e-9);
    assert!((levels.extension(1.618).unwrap() - 261.8).abs() < 1e-9);
}

#[test]
fn rsi_bounded_and_saturates_on_rising_prices() {
    let closes = rising_closes(100);
    assert!(rsi(&closes, 14) > 99.0);
    let market = swinging_market(300).closes();
    for end in 1..market.len() {
        let v = rsi(&market[..end], 14);
        assert!((0.0..=100.0).contains(&v));
    }
}

#[test]
fn trades_respect_min_risk_reward_across_configs() {
    let candles = swinging_market(400);
    for detector in [DetectorKind::Window, DetectorKind::Zigzag, DetectorKind::Adaptive] {
        for family in [WaveFamily::Any, WaveFamily::Impulsive, WaveFamily::Corrective] {
            let cfg = AnalysisConfig {
                wave_family: family,
                min_risk_reward: 1.2,
                min_confidence: 0.0,
                ..config_with(detector)
            };
            let analyzer = WaveAnalyzer::from_config(&cfg).unwrap();
            // walk forward so many structures get a signal
            for end in (60..candles.len()).step_by(7) {
                let window = candles.slice(0, end);
                let analysis = analyzer.analyze(&window, Timeframe::H1).unwrap();
                let signal = &analysis.signal;
                assert!(signal.levels_ordered(), "{:?}", signal);
                if signal.action.is_directional() {
                    assert!(signal.risk_reward_ratio.unwrap() >= cfg.min_risk_reward);
                } else {
                    assert!(signal.entry_price.is_none());
                }
            }
        }
    }
}

#[test]
fn conflicting_timeframes_hold() {
    let buy = TradingSignal {
        action: SignalAction::Buy,
        confidence: 80.0,
        entry_price: Some(100.0),
        stop_loss: Some(95.0),
        take_profit_1: Some(110.0),
        take_profit_2: Some(115.0),
        take_profit_3: Some(130.0),
        risk_reward_ratio: Some(2.0),
        ..TradingSignal::hold("strategic", 80.0)
    };
    let sell = TradingSignal {
        action: SignalAction::Sell,
        confidence: 70.0,
        entry_price: Some(100.0),
        stop_loss: Some(105.0),
        take_profit_1: Some(90.0),
        take_profit_2: Some(85.0),
        take_profit_3: Some(70.0),
        risk_reward_ratio: Some(2.0),
        ..TradingSignal::hold("tactical", 70.0)
    };
    let out =
        MultiTimeframeAggregator::default().aggregate(&buy, Timeframe::H4, &sell, Timeframe::H1);
    assert_eq!(out.signal.action, SignalAction::Hold);
    assert!(!out.aligned);
    assert_eq!(out.strategic, buy);
    assert_eq!(out.tactical, sell);
}

#[test]
fn full_pipeline_is_deterministic() {
    let candles = swinging_market(250);
    let strategic = candles.resample(Timeframe::H4.as_duration());
    let cfg = AnalysisConfig {
        min_bars: 50,
        ..AnalysisConfig::default()
    };
    let mtf = MultiTimeframeAnalyzer::from_config(&cfg).unwrap();
    let a = mtf.analyze(&strategic, Timeframe::H4, &candles, Timeframe::H1);
    let b = mtf.analyze(&strategic, Timeframe::H4, &candles, Timeframe::H1);
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn impulse_path_counts_fifth_wave() {
    let candles = waypoint_hourly(&[
        (100.0, 0),
        (130.0, 12),
        (115.0, 10),
        (160.0, 14),
        (140.0, 10),
        (170.0, 12),
    ]);
    let cfg = AnalysisConfig {
        detector: DetectorKind::Zigzag,
        threshold_pct: 5.0,
        ..AnalysisConfig::default()
    };
    let analysis = WaveAnalyzer::from_config(&cfg)
        .unwrap()
        .analyze(&candles, Timeframe::H1)
        .unwrap();
    assert_eq!(analysis.pattern.wave_type, WaveType::Impulsive);
    assert_eq!(analysis.pattern.current_wave, WavePosition::Wave5);
    let p = &analysis.pattern;
    // target and invalidation straddle the current price
    let price = analysis.current_price;
    assert!((p.projection_target - price) * (p.invalidation_level - price) < 0.0);
}

#[tokio::test]
async fn historical_source_feeds_the_analyzer() {
    let candles = swinging_market(200);
    let mut source = HistoricalSource::new();
    source.load(Timeframe::H1, candles.as_slice().to_vec());

    // walk the cursor forward; only past bars are visible
    let start = source.earliest_time().unwrap();
    source.set_time(start + chrono::Duration::hours(119));
    let visible = source.fetch_ohlcv(Timeframe::H1, 500).await.unwrap();
    assert_eq!(visible.len(), 120);

    let h4 = source.fetch_ohlcv(Timeframe::H4, 500).await.unwrap();
    assert_eq!(h4.len(), 30);

    let analyzer = WaveAnalyzer::from_config(&AnalysisConfig::default()).unwrap();
    let analysis = analyzer.analyze(&visible, Timeframe::H1).unwrap();
    assert_eq!(analysis.bars, 120);
    assert_eq!(analysis.as_of, visible.last().unwrap().timestamp);

    // 30 strategic bars is below the minimum
    assert!(analyzer.analyze(&h4, Timeframe::H4).is_err());
}
