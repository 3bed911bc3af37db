use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::core::fibonacci::{in_golden_ratio, FibonacciLevels};
use crate::core::indicators::TechnicalIndicators;
use crate::models::{
    Direction, Momentum, SignalAction, VolumeTrend, WavePattern, WavePosition, WaveType,
};

const PATTERN_WEIGHT: f64 = 0.7;
const CONFIRMATION_POINTS: f64 = 30.0;
const MAX_CONFIRMATIONS: f64 = 4.0;

/// Where a BUY/SELL puts its stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPreference {
    /// The pattern's invalidation level when usable, else the nearest Fibonacci level
    Invalidation,
    /// Whichever of the two sits closer to entry
    Tightest,
}

impl StopPreference {
    pub fn from_str_loose(s: &str) -> Option<StopPreference> {
        match s.trim().to_lowercase().as_str() {
            "invalidation" | "structural" => Some(StopPreference::Invalidation),
            "tightest" | "tight" | "fib" => Some(StopPreference::Tightest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub action: SignalAction,
    pub reason: String,
    pub confidence: f64,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit_1: Option<f64>,
    pub take_profit_2: Option<f64>,
    pub take_profit_3: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub confirmations: Vec<String>,
}

impl TradingSignal {
    pub fn hold(reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            action: SignalAction::Hold,
            reason: reason.into(),
            confidence,
            entry_price: None,
            stop_loss: None,
            take_profit_1: None,
            take_profit_2: None,
            take_profit_3: None,
            risk_reward_ratio: None,
            confirmations: Vec::new(),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == SignalAction::Hold
    }

    /// BUY: stop < entry < tp1 < tp2 < tp3, SELL mirrored. HOLD carries no levels.
    pub fn levels_ordered(&self) -> bool {
        let Some(dir) = self.action.to_direction() else {
            return self.entry_price.is_none() && self.stop_loss.is_none();
        };
        match (
            self.stop_loss,
            self.entry_price,
            self.take_profit_1,
            self.take_profit_2,
            self.take_profit_3,
        ) {
            (Some(sl), Some(entry), Some(tp1), Some(tp2), Some(tp3)) => {
                let s = dir.sign();
                s * (entry - sl) > 0.0
                    && s * (tp1 - entry) > 0.0
                    && s * (tp2 - tp1) > 0.0
                    && s * (tp3 - tp2) > 0.0
            }
            _ => false,
        }
    }
}

pub trait SignalGenerator: Send + Sync {
    fn name(&self) -> &'static str;
    fn generate(
        &self,
        pattern: &WavePattern,
        indicators: &TechnicalIndicators,
        levels: &FibonacciLevels,
        current_price: f64,
    ) -> TradingSignal;
}

/// A setup the decision table accepted, before levels and filters.
struct Setup {
    direction: Direction,
    reversal: bool,
    reason: String,
}

pub struct WaveSignalGenerator {
    pub min_confidence: f64,
    pub min_risk_reward: f64,
    pub stop_preference: StopPreference,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl WaveSignalGenerator {
    pub fn new() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self {
            min_confidence: cfg.min_confidence,
            min_risk_reward: cfg.min_risk_reward,
            stop_preference: cfg.stop_preference,
            rsi_overbought: cfg.rsi_overbought,
            rsi_oversold: cfg.rsi_oversold,
        }
    }

    /// RSI stretched against `trade`: oversold for a long, overbought for a short.
    fn rsi_exhausted(&self, rsi: f64, trade: Direction) -> bool {
        match trade {
            Direction::Up => rsi <= self.rsi_oversold,
            Direction::Down => rsi >= self.rsi_overbought,
        }
    }

    /// Only falling C waves, rising fifth waves and rising 1/3 waves trade.
    /// Mirror images of those structures hold.
    fn decide(
        &self,
        pattern: &WavePattern,
        ind: &TechnicalIndicators,
    ) -> std::result::Result<Setup, String> {
        if pattern.is_unknown() {
            return Err("no wave structure identified".into());
        }
        // Projection and invalidation straddle price; their order gives the
        // direction the structure is still moving in.
        let Some(structure) =
            Direction::of_move(pattern.invalidation_level, pattern.projection_target)
        else {
            return Err("degenerate pattern levels".into());
        };
        let wave = pattern.current_wave;

        match (pattern.wave_type, wave) {
            (WaveType::Corrective, WavePosition::WaveC) => {
                if structure != Direction::Down {
                    return Err("rising wave C: no short setup".into());
                }
                if self.rsi_exhausted(ind.rsi, Direction::Up) && ind.momentum == Momentum::Bullish
                {
                    Ok(Setup {
                        direction: Direction::Up,
                        reversal: true,
                        reason: format!(
                            "wave C exhaustion: RSI {:.1}, bullish momentum turn",
                            ind.rsi
                        ),
                    })
                } else {
                    Err("wave C without exhaustion confirmation".into())
                }
            }
            (WaveType::Corrective, WavePosition::WaveA | WavePosition::WaveB) => {
                Err(format!("{}: awaiting correction completion", wave))
            }
            (WaveType::Impulsive, WavePosition::Wave5) => {
                if structure != Direction::Up {
                    return Err("falling wave 5: no long setup".into());
                }
                if self.rsi_exhausted(ind.rsi, Direction::Down)
                    && ind.volume_trend == VolumeTrend::Decreasing
                {
                    Ok(Setup {
                        direction: Direction::Down,
                        reversal: true,
                        reason: format!(
                            "wave 5 exhaustion: RSI {:.1} on declining volume",
                            ind.rsi
                        ),
                    })
                } else {
                    Err("wave 5 without exhaustion confirmation".into())
                }
            }
            (WaveType::Impulsive, WavePosition::Wave1 | WavePosition::Wave3) => {
                if structure != Direction::Up {
                    return Err(format!("falling {}: no short setup", wave));
                }
                if ind.momentum == Momentum::Bullish && ind.rsi >= 50.0 {
                    Ok(Setup {
                        direction: Direction::Up,
                        reversal: false,
                        reason: format!(
                            "{} continuation: bullish momentum, RSI {:.1}",
                            wave, ind.rsi
                        ),
                    })
                } else {
                    Err(format!("{} without momentum confirmation", wave))
                }
            }
            (WaveType::Impulsive, WavePosition::Wave2 | WavePosition::Wave4) => {
                Err(format!("{}: awaiting correction completion", wave))
            }
            _ => Err("no actionable wave position".into()),
        }
    }

    fn confirmations(
        &self,
        setup: &Setup,
        pattern: &WavePattern,
        ind: &TechnicalIndicators,
    ) -> Vec<String> {
        let t = setup.direction;
        let mut tags = Vec::new();

        if setup.reversal && self.rsi_exhausted(ind.rsi, t) {
            tags.push(match t {
                Direction::Up => "rsi_oversold",
                Direction::Down => "rsi_overbought",
            });
        } else if !setup.reversal && ind.rsi >= 50.0 {
            tags.push("rsi_above_50");
        }
        if ind.momentum == Momentum::supporting(t) {
            tags.push(match t {
                Direction::Up => "momentum_bullish",
                Direction::Down => "momentum_bearish",
            });
        }
        match (setup.reversal, ind.volume_trend) {
            (true, VolumeTrend::Decreasing) => tags.push("volume_exhaustion"),
            (false, VolumeTrend::Increasing) => tags.push("volume_expansion"),
            _ => {}
        }
        if pattern.last_retracement.is_some_and(in_golden_ratio) {
            tags.push("golden_zone");
        }

        tags.into_iter().map(String::from).collect()
    }

    fn choose_stop(
        &self,
        trade: Direction,
        entry: f64,
        invalidation: f64,
        levels: &FibonacciLevels,
    ) -> Option<f64> {
        let structural = trade
            .opposite()
            .beyond(invalidation, entry)
            .then_some(invalidation);
        let fib = match trade {
            Direction::Up => levels.get_support_levels(entry).first().copied(),
            Direction::Down => levels.get_resistance_levels(entry).first().copied(),
        };

        match (self.stop_preference, structural, fib) {
            (_, None, fib) => fib,
            (StopPreference::Invalidation, Some(s), _) => Some(s),
            (StopPreference::Tightest, Some(s), Some(f)) => {
                if (f - entry).abs() < (s - entry).abs() {
                    Some(f)
                } else {
                    Some(s)
                }
            }
            (StopPreference::Tightest, Some(s), None) => Some(s),
        }
    }
}

impl Default for WaveSignalGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalGenerator for WaveSignalGenerator {
    fn name(&self) -> &'static str {
        "wave_signal"
    }

    fn generate(
        &self,
        pattern: &WavePattern,
        indicators: &TechnicalIndicators,
        levels: &FibonacciLevels,
        current_price: f64,
    ) -> TradingSignal {
        let setup = match self.decide(pattern, indicators) {
            Ok(setup) => setup,
            Err(reason) => {
                tracing::debug!("[SIGNAL] HOLD: {}", reason);
                return TradingSignal::hold(reason, pattern.confidence);
            }
        };
        if !current_price.is_finite() {
            return TradingSignal::hold("current price is not finite", pattern.confidence);
        }

        let action = setup.direction.to_action();
        let entry = current_price;
        let confirmations = self.confirmations(&setup, pattern, indicators);
        let confidence = (PATTERN_WEIGHT * pattern.confidence
            + CONFIRMATION_POINTS * (confirmations.len() as f64 / MAX_CONFIRMATIONS))
            .clamp(0.0, 100.0);
        let confidence = (confidence * 100.0).round() / 100.0;

        let reject = |why: String| {
            tracing::debug!("[SIGNAL] {} rejected: {}", action, why);
            TradingSignal {
                confirmations: confirmations.clone(),
                ..TradingSignal::hold(format!("{} rejected: {}", action, why), confidence)
            }
        };

        let Some(stop) =
            self.choose_stop(setup.direction, entry, pattern.invalidation_level, levels)
        else {
            return reject("no stop level beyond entry".into());
        };
        let (Some(tp1), Some(tp2), Some(tp3)) = (
            levels.retracement(0.382),
            levels.retracement(0.618),
            levels.retracement(1.618),
        ) else {
            return reject("missing take-profit levels".into());
        };

        let risk = (entry - stop).abs();
        let risk_reward = if risk > 0.0 {
            (tp1 - entry).abs() / risk
        } else {
            0.0
        };

        let signal = TradingSignal {
            action,
            reason: setup.reason,
            confidence,
            entry_price: Some(entry),
            stop_loss: Some(stop),
            take_profit_1: Some(tp1),
            take_profit_2: Some(tp2),
            take_profit_3: Some(tp3),
            risk_reward_ratio: Some(risk_reward),
            confirmations: confirmations.clone(),
        };

        if !signal.levels_ordered() {
            return reject(format!(
                "levels out of order (sl {:.4}, entry {:.4}, tp {:.4}/{:.4}/{:.4})",
                stop, entry, tp1, tp2, tp3
            ));
        }
        if confidence < self.min_confidence {
            return reject(format!(
                "confidence {:.1} below {:.1}",
                confidence, self.min_confidence
            ));
        }
        if risk_reward < self.min_risk_reward {
            return reject(format!(
                "risk/reward {:.2} below {:.2}",
                risk_reward, self.min_risk_reward
            ));
        }

        tracing::info!(
            "[SIGNAL] {} @ {:.4} | SL {:.4} | TP1 {:.4} | RR {:.2} | conf {:.1} | {}",
            action,
            entry,
            stop,
            tp1,
            risk_reward,
            confidence,
            confirmations.join(",")
        );
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fibonacci::FibonacciCalculator;
    use crate::models::{Swing, Trend};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn pattern(
        wave_type: WaveType,
        current_wave: WavePosition,
        confidence: f64,
        projection: f64,
        invalidation: f64,
        swing: (f64, f64),
        last_retracement: Option<f64>,
    ) -> WavePattern {
        WavePattern {
            wave_type,
            current_wave,
            trend: Trend::Uptrend,
            confidence,
            projection_target: projection,
            invalidation_level: invalidation,
            pivots: Vec::new(),
            governing_swing: Some(Swing {
                start_index: 0,
                start_price: swing.0,
                end_index: 10,
                end_price: swing.1,
            }),
            last_retracement,
        }
    }

    fn indicators(rsi: f64, momentum: Momentum, volume_trend: VolumeTrend) -> TechnicalIndicators {
        TechnicalIndicators {
            rsi,
            volume_trend,
            momentum,
            ..TechnicalIndicators::neutral()
        }
    }

    fn levels_of(p: &WavePattern) -> FibonacciLevels {
        FibonacciCalculator::new().levels_for_swing(&p.governing_swing.unwrap())
    }

    fn wave_c() -> WavePattern {
        // C fell from 155 to 138, price has bounced to 140
        pattern(
            WaveType::Corrective,
            WavePosition::WaveC,
            80.0,
            130.73,
            155.0,
            (155.0, 138.0),
            Some(0.667),
        )
    }

    #[test]
    fn unknown_pattern_holds() {
        let p = WavePattern::unknown(Trend::Lateral);
        let levels = FibonacciCalculator::new().calculate_levels(100.0, 110.0);
        let ind = TechnicalIndicators::neutral();
        let sig = WaveSignalGenerator::new().generate(&p, &ind, &levels, 105.0);
        assert_eq!(sig.action, SignalAction::Hold);
        assert_eq!(sig.entry_price, None);
        assert_eq!(sig.risk_reward_ratio, None);
        assert!(sig.levels_ordered());
    }

    #[test]
    fn wave_c_exhaustion_buys() {
        let p = wave_c();
        let ind = indicators(25.0, Momentum::Bullish, VolumeTrend::Decreasing);
        let sig = WaveSignalGenerator::new().generate(&p, &ind, &levels_of(&p), 140.0);

        assert_eq!(sig.action, SignalAction::Buy);
        // B high is on the wrong side for a long, so the stop falls back to the C low
        assert!(close(sig.stop_loss.unwrap(), 138.0));
        assert!(close(sig.take_profit_1.unwrap(), 138.0 + 17.0 * 0.382));
        assert!(close(sig.take_profit_2.unwrap(), 138.0 + 17.0 * 0.618));
        assert!(close(sig.take_profit_3.unwrap(), 138.0 + 17.0 * 1.618));
        assert!(sig.levels_ordered());
        assert!(sig.risk_reward_ratio.unwrap() >= 1.5);
        assert!(close(sig.confidence, 0.7 * 80.0 + 22.5));
        assert_eq!(
            sig.confirmations,
            vec!["rsi_oversold", "momentum_bullish", "volume_exhaustion"]
        );
    }

    #[test]
    fn wave_c_without_oversold_rsi_holds() {
        let p = wave_c();
        let ind = indicators(45.0, Momentum::Bullish, VolumeTrend::Decreasing);
        let sig = WaveSignalGenerator::new().generate(&p, &ind, &levels_of(&p), 140.0);
        assert_eq!(sig.action, SignalAction::Hold);
        assert!(close(sig.confidence, 80.0));
    }

    #[test]
    fn wave_five_exhaustion_sells() {
        let p = pattern(
            WaveType::Impulsive,
            WavePosition::Wave5,
            90.0,
            188.54,
            140.0,
            (140.0, 172.0),
            Some(0.444),
        );
        let ind = indicators(75.0, Momentum::Bearish, VolumeTrend::Decreasing);
        let sig = WaveSignalGenerator::new().generate(&p, &ind, &levels_of(&p), 169.0);

        assert_eq!(sig.action, SignalAction::Sell);
        assert!(close(sig.stop_loss.unwrap(), 172.0));
        assert!(close(sig.take_profit_1.unwrap(), 172.0 - 32.0 * 0.382));
        assert!(sig.levels_ordered());
        assert!(sig.stop_loss.unwrap() > sig.entry_price.unwrap());
        assert!(sig.take_profit_3.unwrap() < sig.take_profit_2.unwrap());
        assert!(close(sig.confidence, 63.0 + 22.5));
    }

    #[test]
    fn wave_five_needs_declining_volume() {
        let p = pattern(
            WaveType::Impulsive,
            WavePosition::Wave5,
            90.0,
            188.54,
            140.0,
            (140.0, 172.0),
            None,
        );
        let ind = indicators(75.0, Momentum::Bearish, VolumeTrend::Increasing);
        let sig = WaveSignalGenerator::new().generate(&p, &ind, &levels_of(&p), 169.0);
        assert!(sig.is_hold());
    }

    fn early_wave_three() -> WavePattern {
        pattern(
            WaveType::Impulsive,
            WavePosition::Wave3,
            78.8,
            144.03,
            105.0,
            (118.0, 110.0),
            Some(0.615),
        )
    }

    #[test]
    fn stop_preference_changes_risk_reward() {
        let p = early_wave_three();
        let ind = indicators(60.0, Momentum::Bullish, VolumeTrend::Increasing);
        let levels = levels_of(&p);

        // wave-1 origin as stop: too far for the first target
        let structural = WaveSignalGenerator::new().generate(&p, &ind, &levels, 112.0);
        assert!(structural.is_hold());
        assert!(structural.reason.contains("risk/reward"));
        assert_eq!(structural.stop_loss, None);

        let tight = WaveSignalGenerator {
            stop_preference: StopPreference::Tightest,
            ..WaveSignalGenerator::new()
        }
        .generate(&p, &ind, &levels, 112.0);
        assert_eq!(tight.action, SignalAction::Buy);
        assert!(close(tight.stop_loss.unwrap(), 110.0 + 8.0 * 0.236));
        assert!(tight.confirmations.contains(&"golden_zone".to_string()));
        assert_eq!(tight.confirmations.len(), 4);
        assert!(close(tight.confidence, 0.7 * 78.8 + 30.0));
    }

    #[test]
    fn low_confidence_is_rejected_not_adjusted() {
        let mut p = wave_c();
        p.confidence = 20.0;
        let ind = indicators(25.0, Momentum::Bullish, VolumeTrend::Decreasing);
        let sig = WaveSignalGenerator::new().generate(&p, &ind, &levels_of(&p), 140.0);
        assert!(sig.is_hold());
        assert!(sig.reason.contains("confidence"));
        assert_eq!(sig.entry_price, None);
    }

    #[test]
    fn waiting_positions_hold() {
        let ind = indicators(25.0, Momentum::Bullish, VolumeTrend::Decreasing);
        for (wt, pos) in [
            (WaveType::Corrective, WavePosition::WaveA),
            (WaveType::Corrective, WavePosition::WaveB),
            (WaveType::Impulsive, WavePosition::Wave2),
            (WaveType::Impulsive, WavePosition::Wave4),
        ] {
            let p = pattern(wt, pos, 90.0, 130.0, 150.0, (150.0, 140.0), None);
            let sig = WaveSignalGenerator::new().generate(&p, &ind, &levels_of(&p), 140.0);
            assert!(sig.is_hold(), "{} {}", wt, pos);
        }
    }

    #[test]
    fn never_trades_below_min_risk_reward() {
        let gen = WaveSignalGenerator::new();
        let patterns = [wave_c(), early_wave_three()];
        let states = [
            indicators(25.0, Momentum::Bullish, VolumeTrend::Decreasing),
            indicators(60.0, Momentum::Bullish, VolumeTrend::Increasing),
            indicators(80.0, Momentum::Bearish, VolumeTrend::Decreasing),
            indicators(50.0, Momentum::Neutral, VolumeTrend::Neutral),
        ];
        for p in &patterns {
            let levels = levels_of(p);
            for ind in &states {
                for step in 0..40 {
                    let price = 100.0 + step as f64 * 1.5;
                    let sig = gen.generate(p, ind, &levels, price);
                    assert!(sig.levels_ordered());
                    if sig.action.is_directional() {
                        assert!(sig.risk_reward_ratio.unwrap() >= gen.min_risk_reward);
                        assert!(sig.confidence >= gen.min_confidence);
                    }
                }
            }
        }
    }

    #[test]
    fn mirrored_structures_hold() {
        let gen = WaveSignalGenerator::new();
        let cases = [
            // falling fifth wave, oversold on drying volume
            (
                pattern(
                    WaveType::Impulsive,
                    WavePosition::Wave5,
                    90.0,
                    111.46,
                    160.0,
                    (160.0, 128.0),
                    Some(0.444),
                ),
                indicators(25.0, Momentum::Bullish, VolumeTrend::Decreasing),
                131.0,
            ),
            // rising C wave, overbought with a bearish turn
            (
                pattern(
                    WaveType::Corrective,
                    WavePosition::WaveC,
                    80.0,
                    169.27,
                    145.0,
                    (145.0, 162.0),
                    Some(0.667),
                ),
                indicators(75.0, Momentum::Bearish, VolumeTrend::Decreasing),
                160.0,
            ),
            // falling third wave with bearish momentum
            (
                pattern(
                    WaveType::Impulsive,
                    WavePosition::Wave3,
                    78.8,
                    155.97,
                    195.0,
                    (182.0, 190.0),
                    Some(0.615),
                ),
                indicators(40.0, Momentum::Bearish, VolumeTrend::Increasing),
                188.0,
            ),
        ];
        for (p, ind, price) in &cases {
            let sig = gen.generate(p, ind, &levels_of(p), *price);
            assert!(sig.is_hold(), "{} {:?}", p.current_wave, sig);
            assert_eq!(sig.entry_price, None);
            assert!(sig.reason.contains("falling") || sig.reason.contains("rising"));
        }
    }

    #[test]
    fn stop_preference_parsing() {
        assert_eq!(
            StopPreference::from_str_loose(" Tightest "),
            Some(StopPreference::Tightest)
        );
        assert_eq!(
            StopPreference::from_str_loose("structural"),
            Some(StopPreference::Invalidation)
        );
        assert_eq!(StopPreference::from_str_loose("wide"), None);
    }
}
