use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PivotKind {
    High,
    Low,
}

impl fmt::Display for PivotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotKind::High => write!(f, "HIGH"),
            PivotKind::Low => write!(f, "LOW"),
        }
    }
}

/// Direction of a single price leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// `None` for a flat move.
    pub fn of_move(from: f64, to: f64) -> Option<Direction> {
        if to > from {
            Some(Direction::Up)
        } else if to < from {
            Some(Direction::Down)
        } else {
            None
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// True when `price` lies strictly further along this direction than `reference`.
    pub fn beyond(self, price: f64, reference: f64) -> bool {
        match self {
            Direction::Up => price > reference,
            Direction::Down => price < reference,
        }
    }

    pub fn to_action(self) -> SignalAction {
        match self {
            Direction::Up => SignalAction::Buy,
            Direction::Down => SignalAction::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WaveType {
    Impulsive,
    Corrective,
    Unknown,
}

impl fmt::Display for WaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveType::Impulsive => write!(f, "IMPULSIVE"),
            WaveType::Corrective => write!(f, "CORRECTIVE"),
            WaveType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavePosition {
    #[serde(rename = "WAVE_1")]
    Wave1,
    #[serde(rename = "WAVE_2")]
    Wave2,
    #[serde(rename = "WAVE_3")]
    Wave3,
    #[serde(rename = "WAVE_4")]
    Wave4,
    #[serde(rename = "WAVE_5")]
    Wave5,
    #[serde(rename = "WAVE_A")]
    WaveA,
    #[serde(rename = "WAVE_B")]
    WaveB,
    #[serde(rename = "WAVE_C")]
    WaveC,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl WavePosition {
    /// Label of the `legs`-th leg (1-based) of an impulse.
    pub fn impulse_leg(legs: usize) -> WavePosition {
        match legs {
            1 => WavePosition::Wave1,
            2 => WavePosition::Wave2,
            3 => WavePosition::Wave3,
            4 => WavePosition::Wave4,
            5 => WavePosition::Wave5,
            _ => WavePosition::Unknown,
        }
    }

    /// Label of the `legs`-th leg (1-based) of a correction.
    pub fn corrective_leg(legs: usize) -> WavePosition {
        match legs {
            1 => WavePosition::WaveA,
            2 => WavePosition::WaveB,
            3 => WavePosition::WaveC,
            _ => WavePosition::Unknown,
        }
    }
}

impl fmt::Display for WavePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WavePosition::Wave1 => write!(f, "WAVE_1"),
            WavePosition::Wave2 => write!(f, "WAVE_2"),
            WavePosition::Wave3 => write!(f, "WAVE_3"),
            WavePosition::Wave4 => write!(f, "WAVE_4"),
            WavePosition::Wave5 => write!(f, "WAVE_5"),
            WavePosition::WaveA => write!(f, "WAVE_A"),
            WavePosition::WaveB => write!(f, "WAVE_B"),
            WavePosition::WaveC => write!(f, "WAVE_C"),
            WavePosition::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Lateral,
    Unknown,
}

impl Trend {
    pub fn to_direction(self) -> Option<Direction> {
        match self {
            Trend::Uptrend => Some(Direction::Up),
            Trend::Downtrend => Some(Direction::Down),
            Trend::Lateral | Trend::Unknown => None,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "UPTREND"),
            Trend::Downtrend => write!(f, "DOWNTREND"),
            Trend::Lateral => write!(f, "LATERAL"),
            Trend::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Neutral,
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeTrend::Increasing => write!(f, "INCREASING"),
            VolumeTrend::Decreasing => write!(f, "DECREASING"),
            VolumeTrend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Momentum {
    Bullish,
    Bearish,
    Neutral,
}

impl Momentum {
    /// Momentum that supports a move in `dir`.
    pub fn supporting(dir: Direction) -> Momentum {
        match dir {
            Direction::Up => Momentum::Bullish,
            Direction::Down => Momentum::Bearish,
        }
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Momentum::Bullish => write!(f, "BULLISH"),
            Momentum::Bearish => write!(f, "BEARISH"),
            Momentum::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub fn is_directional(self) -> bool {
        !matches!(self, SignalAction::Hold)
    }

    pub fn to_direction(self) -> Option<Direction> {
        match self {
            SignalAction::Buy => Some(Direction::Up),
            SignalAction::Sell => Some(Direction::Down),
            SignalAction::Hold => None,
        }
    }

    /// BUY against SELL, in either order.
    pub fn conflicts_with(self, other: SignalAction) -> bool {
        matches!(
            (self, other),
            (SignalAction::Buy, SignalAction::Sell) | (SignalAction::Sell, SignalAction::Buy)
        )
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
            SignalAction::Hold => write!(f, "HOLD"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_position_serializes_with_underscore() {
        let json = serde_json::to_string(&WavePosition::Wave3).unwrap();
        assert_eq!(json, "\"WAVE_3\"");
        let back: WavePosition = serde_json::from_str("\"WAVE_C\"").unwrap();
        assert_eq!(back, WavePosition::WaveC);
    }

    #[test]
    fn leg_labels() {
        assert_eq!(WavePosition::impulse_leg(5), WavePosition::Wave5);
        assert_eq!(WavePosition::impulse_leg(6), WavePosition::Unknown);
        assert_eq!(WavePosition::corrective_leg(2), WavePosition::WaveB);
        assert_eq!(WavePosition::corrective_leg(0), WavePosition::Unknown);
    }

    #[test]
    fn direction_helpers() {
        assert_eq!(Direction::of_move(1.0, 2.0), Some(Direction::Up));
        assert_eq!(Direction::of_move(2.0, 1.0), Some(Direction::Down));
        assert_eq!(Direction::of_move(2.0, 2.0), None);
        assert!(Direction::Down.beyond(9.0, 10.0));
        assert!(!Direction::Up.beyond(10.0, 10.0));
        assert_eq!(Direction::Up.opposite().to_action(), SignalAction::Sell);
    }

    #[test]
    fn action_conflicts() {
        assert!(SignalAction::Buy.conflicts_with(SignalAction::Sell));
        assert!(SignalAction::Sell.conflicts_with(SignalAction::Buy));
        assert!(!SignalAction::Buy.conflicts_with(SignalAction::Hold));
        assert!(!SignalAction::Hold.is_directional());
        assert_eq!(Trend::Lateral.to_direction(), None);
    }
}
