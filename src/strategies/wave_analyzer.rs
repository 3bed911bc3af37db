use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::core::fibonacci::{FibonacciCalculator, FibonacciLevels};
use crate::core::indicators::{IndicatorCache, IndicatorEngine, TechnicalIndicators};
use crate::core::pivots::{detector_from_config, PivotDetector};
use crate::core::waves::{PatternAnalyzer, WaveCounter};
use crate::error::{AnalysisError, Result};
use crate::models::{CandleSeries, PivotSet, Timeframe, WavePattern};
use crate::strategies::signals::{SignalGenerator, TradingSignal, WaveSignalGenerator};
use crate::strategies::timeframe_aggregator::{MultiTimeframeAggregator, MultiTimeframeSignal};

pub const DEFAULT_MIN_BARS: usize = 50;

/// One timeframe's result: structure, levels, indicators and the signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveAnalysis {
    pub timeframe: Timeframe,
    pub bars: usize,
    pub as_of: DateTime<Utc>,
    pub current_price: f64,
    pub pivot_count: usize,
    pub pattern: WavePattern,
    pub fibonacci: FibonacciLevels,
    pub indicators: TechnicalIndicators,
    pub signal: TradingSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTimeframeAnalysis {
    pub strategic: WaveAnalysis,
    pub tactical: WaveAnalysis,
    pub composite: MultiTimeframeSignal,
}

/// Per-timeframe pipeline: validate, detect pivots, count waves, anchor
/// Fibonacci levels, compute indicators, generate the signal.
pub struct WaveAnalyzer {
    detector: Box<dyn PivotDetector>,
    pattern_analyzer: Box<dyn PatternAnalyzer>,
    indicators: IndicatorEngine,
    signal_generator: Box<dyn SignalGenerator>,
    fibonacci: FibonacciCalculator,
    min_bars: usize,
}

impl WaveAnalyzer {
    pub fn new(
        detector: Box<dyn PivotDetector>,
        pattern_analyzer: Box<dyn PatternAnalyzer>,
        indicators: IndicatorEngine,
        signal_generator: Box<dyn SignalGenerator>,
    ) -> Self {
        Self {
            detector,
            pattern_analyzer,
            indicators,
            signal_generator,
            fibonacci: FibonacciCalculator::new(),
            min_bars: DEFAULT_MIN_BARS,
        }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::new(
            detector_from_config(cfg),
            Box::new(WaveCounter::with_family(cfg.wave_family)),
            IndicatorEngine::from_config(cfg),
            Box::new(WaveSignalGenerator::from_config(cfg)),
        )
        .with_min_bars(cfg.min_bars))
    }

    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars.max(1);
        self
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    /// Fails fast on anything the pipeline cannot compute over.
    pub fn validate(&self, candles: &CandleSeries) -> Result<()> {
        if candles.len() < self.min_bars {
            return Err(AnalysisError::InsufficientData {
                required: self.min_bars,
                provided: candles.len(),
            });
        }

        for (index, c) in candles.iter().enumerate() {
            let columns = [
                ("open", c.open),
                ("high", c.high),
                ("low", c.low),
                ("close", c.close),
                ("volume", c.volume),
            ];
            if let Some(&(column, _)) = columns.iter().find(|(_, v)| !v.is_finite()) {
                return Err(AnalysisError::MissingValue { column, index });
            }
            if c.high < c.low {
                return Err(AnalysisError::InvalidCandle {
                    index,
                    reason: format!("high {} below low {}", c.high, c.low),
                });
            }
            if c.volume < 0.0 {
                return Err(AnalysisError::InvalidCandle {
                    index,
                    reason: format!("negative volume {}", c.volume),
                });
            }
            if index > 0 && c.timestamp <= candles[index - 1].timestamp {
                return Err(AnalysisError::NonMonotonicIndex { index });
            }
        }
        Ok(())
    }

    pub fn analyze(&self, candles: &CandleSeries, timeframe: Timeframe) -> Result<WaveAnalysis> {
        self.run(candles, timeframe, None)
    }

    /// Same as `analyze`, reusing indicator snapshots from `cache`.
    pub fn analyze_cached(
        &self,
        candles: &CandleSeries,
        timeframe: Timeframe,
        cache: &mut IndicatorCache,
    ) -> Result<WaveAnalysis> {
        self.run(candles, timeframe, Some(cache))
    }

    fn run(
        &self,
        candles: &CandleSeries,
        timeframe: Timeframe,
        cache: Option<&mut IndicatorCache>,
    ) -> Result<WaveAnalysis> {
        self.validate(candles)?;
        let last = candles.last().ok_or(AnalysisError::InsufficientData {
            required: self.min_bars,
            provided: 0,
        })?;
        let current_price = last.close;

        let pivots = self.detector.detect(candles);
        tracing::debug!(
            "[ANALYSIS] {} {} -> {} highs / {} lows",
            timeframe,
            self.detector.name(),
            pivots.highs.len(),
            pivots.lows.len()
        );

        let pattern = self.pattern_analyzer.analyze(candles, &pivots);
        let fibonacci = self.anchor_levels(&pattern, &pivots, candles);
        let indicators = match cache {
            Some(cache) => self.indicators.compute_cached(candles, cache),
            None => self.indicators.compute(candles),
        };
        let signal = self
            .signal_generator
            .generate(&pattern, &indicators, &fibonacci, current_price);

        tracing::info!(
            "[ANALYSIS] {} | {} bars | {} {} {} ({:.1}) | RSI {:.1} | {} ({:.1})",
            timeframe,
            candles.len(),
            pattern.trend,
            pattern.wave_type,
            pattern.current_wave,
            pattern.confidence,
            indicators.rsi,
            signal.action,
            signal.confidence
        );

        Ok(WaveAnalysis {
            timeframe,
            bars: candles.len(),
            as_of: last.timestamp,
            current_price,
            pivot_count: pivots.len(),
            pattern,
            fibonacci,
            indicators,
            signal,
        })
    }

    /// Governing swing of the pattern, else the last pivot leg, else the series
    /// range ordered by when its high and low printed.
    fn anchor_levels(
        &self,
        pattern: &WavePattern,
        pivots: &PivotSet,
        candles: &CandleSeries,
    ) -> FibonacciLevels {
        if let Some(swing) = &pattern.governing_swing {
            return self.fibonacci.levels_for_swing(swing);
        }

        let merged = pivots.merged();
        if let [.., a, b] = merged.as_slice() {
            if a.price != b.price {
                return self.fibonacci.calculate_levels(a.price, b.price);
            }
        }

        match (candles.low_idx_min(), candles.high_idx_max()) {
            (Some(lo), Some(hi)) if hi < lo => {
                self.fibonacci.calculate_levels(candles[hi].high, candles[lo].low)
            }
            (Some(lo), Some(hi)) => {
                self.fibonacci.calculate_levels(candles[lo].low, candles[hi].high)
            }
            _ => {
                let price = current_or_zero(candles);
                self.fibonacci.calculate_levels(price, price)
            }
        }
    }
}

fn current_or_zero(candles: &CandleSeries) -> f64 {
    candles.last().map(|c| c.close).unwrap_or(0.0)
}

/// Runs a strategic and a tactical analyzer and reconciles their signals.
pub struct MultiTimeframeAnalyzer {
    pub strategic: WaveAnalyzer,
    pub tactical: WaveAnalyzer,
    pub aggregator: MultiTimeframeAggregator,
}

impl MultiTimeframeAnalyzer {
    pub fn new(
        strategic: WaveAnalyzer,
        tactical: WaveAnalyzer,
        aggregator: MultiTimeframeAggregator,
    ) -> Self {
        Self {
            strategic,
            tactical,
            aggregator,
        }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Result<Self> {
        Ok(Self::new(
            WaveAnalyzer::from_config(cfg)?,
            WaveAnalyzer::from_config(cfg)?,
            MultiTimeframeAggregator::from_config(cfg),
        ))
    }

    pub fn analyze(
        &self,
        strategic_candles: &CandleSeries,
        strategic_tf: Timeframe,
        tactical_candles: &CandleSeries,
        tactical_tf: Timeframe,
    ) -> Result<MultiTimeframeAnalysis> {
        let strategic = self.strategic.analyze(strategic_candles, strategic_tf)?;
        let tactical = self.tactical.analyze(tactical_candles, tactical_tf)?;
        Ok(self.combine(strategic, tactical))
    }

    /// Reconciles two analyses produced elsewhere (e.g. on separate tasks).
    pub fn combine(
        &self,
        strategic: WaveAnalysis,
        tactical: WaveAnalysis,
    ) -> MultiTimeframeAnalysis {
        let composite = self.aggregator.aggregate(
            &strategic.signal,
            strategic.timeframe,
            &tactical.signal,
            tactical.timeframe,
        );
        MultiTimeframeAnalysis {
            strategic,
            tactical,
            composite,
        }
    }
}
