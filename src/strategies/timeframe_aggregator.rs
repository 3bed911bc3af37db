use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::models::{SignalAction, Timeframe};
use crate::strategies::signals::TradingSignal;

/// Composite of a strategic (higher) and tactical (lower) timeframe signal.
/// Both components are kept so disagreement stays visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTimeframeSignal {
    pub signal: TradingSignal,
    pub aligned: bool,
    pub strategic: TradingSignal,
    pub tactical: TradingSignal,
    pub strategic_timeframe: Timeframe,
    pub tactical_timeframe: Timeframe,
}

pub struct MultiTimeframeAggregator {
    /// Share of the composite confidence owned by the strategic signal, in [0.5, 1.0]
    pub strategic_weight: f64,
    /// Own confidence a lone directional signal needs to be followed
    pub follow_threshold: f64,
}

impl MultiTimeframeAggregator {
    pub fn new(strategic_weight: f64, follow_threshold: f64) -> Self {
        Self {
            strategic_weight: strategic_weight.clamp(0.5, 1.0),
            follow_threshold,
        }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self::new(cfg.strategic_weight, cfg.follow_threshold)
    }

    fn blend(&self, strategic: f64, tactical: f64) -> f64 {
        let w = self.strategic_weight;
        w * strategic + (1.0 - w) * tactical
    }

    /// Tactical confidence scaled down by (1 - w) / w.
    fn tactical_effective(&self, confidence: f64) -> f64 {
        let w = self.strategic_weight;
        confidence * (1.0 - w) / w
    }

    pub fn aggregate(
        &self,
        strategic: &TradingSignal,
        strategic_timeframe: Timeframe,
        tactical: &TradingSignal,
        tactical_timeframe: Timeframe,
    ) -> MultiTimeframeSignal {
        let (signal, aligned) = match (strategic.action, tactical.action) {
            (SignalAction::Hold, SignalAction::Hold) => (
                TradingSignal::hold(
                    format!(
                        "no setup on {} or {}",
                        strategic_timeframe, tactical_timeframe
                    ),
                    self.blend(strategic.confidence, tactical.confidence),
                ),
                true,
            ),
            (s, t) if s.conflicts_with(t) => {
                tracing::debug!(
                    "[MTF] conflict {} {} vs {} {} -> HOLD",
                    strategic_timeframe,
                    s,
                    tactical_timeframe,
                    t
                );
                (
                    TradingSignal::hold(
                        format!(
                            "timeframe conflict: {} {} vs {} {}",
                            strategic_timeframe, s, tactical_timeframe, t
                        ),
                        0.0,
                    ),
                    false,
                )
            }
            (s, t) if s == t => {
                let mut confirmations = tactical.confirmations.clone();
                for tag in &strategic.confirmations {
                    if !confirmations.contains(tag) {
                        confirmations.push(tag.clone());
                    }
                }
                (
                    TradingSignal {
                        reason: format!(
                            "{} and {} agree: {}",
                            strategic_timeframe, tactical_timeframe, tactical.reason
                        ),
                        confidence: self.blend(strategic.confidence, tactical.confidence),
                        confirmations,
                        ..tactical.clone()
                    },
                    true,
                )
            }
            (SignalAction::Hold, t) => {
                let effective = self.tactical_effective(tactical.confidence);
                (self.follow_lone(tactical, tactical_timeframe, effective, t), false)
            }
            (s, _) => (
                self.follow_lone(strategic, strategic_timeframe, strategic.confidence, s),
                false,
            ),
        };

        tracing::debug!(
            "[MTF] {} {} + {} {} -> {} (aligned={}, conf={:.1})",
            strategic_timeframe,
            strategic.action,
            tactical_timeframe,
            tactical.action,
            signal.action,
            aligned,
            signal.confidence
        );

        MultiTimeframeSignal {
            signal,
            aligned,
            strategic: strategic.clone(),
            tactical: tactical.clone(),
            strategic_timeframe,
            tactical_timeframe,
        }
    }

    /// The threshold applies to the component's own confidence; the composite
    /// carries the weighted `effective` value.
    fn follow_lone(
        &self,
        component: &TradingSignal,
        timeframe: Timeframe,
        effective: f64,
        action: SignalAction,
    ) -> TradingSignal {
        if component.confidence >= self.follow_threshold {
            TradingSignal {
                reason: format!("following {} {}: {}", timeframe, action, component.reason),
                confidence: effective.min(100.0),
                ..component.clone()
            }
        } else {
            TradingSignal::hold(
                format!(
                    "{} {} confidence {:.1} below {:.1}",
                    timeframe, action, component.confidence, self.follow_threshold
                ),
                effective,
            )
        }
    }
}

impl Default for MultiTimeframeAggregator {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
