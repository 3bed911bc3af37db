use serde::{Deserialize, Serialize};

use crate::models::{PivotPoint, Swing, Trend, WavePosition, WaveType};

/// Market-structure estimate produced by a pattern analyzer.
///
/// `projection_target` is the next trend-direction target of the counted
/// structure and `invalidation_level` the price beyond which the count is
/// impossible. Both are `0.0` for an unknown structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavePattern {
    pub wave_type: WaveType,
    pub current_wave: WavePosition,
    pub trend: Trend,
    pub confidence: f64,
    pub projection_target: f64,
    pub invalidation_level: f64,
    pub pivots: Vec<PivotPoint>,
    pub governing_swing: Option<Swing>,
    /// Ratio of the most recent completed corrective leg (wave 2, wave 4 or B)
    pub last_retracement: Option<f64>,
}

impl WavePattern {
    pub fn unknown(trend: Trend) -> Self {
        Self {
            wave_type: WaveType::Unknown,
            current_wave: WavePosition::Unknown,
            trend,
            confidence: 0.0,
            projection_target: 0.0,
            invalidation_level: 0.0,
            pivots: Vec::new(),
            governing_swing: None,
            last_retracement: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.wave_type == WaveType::Unknown
    }
}
