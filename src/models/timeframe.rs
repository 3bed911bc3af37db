use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::from_secs(60),
            Timeframe::M5 => Duration::from_secs(300),
            Timeframe::M15 => Duration::from_secs(900),
            Timeframe::M30 => Duration::from_secs(1800),
            Timeframe::H1 => Duration::from_secs(3600),
            Timeframe::H4 => Duration::from_secs(14400),
            Timeframe::D1 => Duration::from_secs(86400),
            Timeframe::W1 => Duration::from_secs(604800),
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Timeframe> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Some(Timeframe::M1),
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "30m" => Some(Timeframe::M30),
            "1h" | "60m" => Some(Timeframe::H1),
            "4h" => Some(Timeframe::H4),
            "1d" | "d" => Some(Timeframe::D1),
            "1w" | "w" => Some(Timeframe::W1),
            _ => None,
        }
    }

    pub fn as_seconds(&self) -> u64 {
        self.as_duration().as_secs()
    }

    /// Next coarser timeframe, used as the default strategic view.
    pub fn higher(&self) -> Timeframe {
        match self {
            Timeframe::M1 => Timeframe::M5,
            Timeframe::M5 => Timeframe::M15,
            Timeframe::M15 => Timeframe::H1,
            Timeframe::M30 => Timeframe::H4,
            Timeframe::H1 => Timeframe::H4,
            Timeframe::H4 => Timeframe::D1,
            Timeframe::D1 => Timeframe::W1,
            Timeframe::W1 => Timeframe::W1,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        for tf in [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
            Timeframe::W1,
        ] {
            assert_eq!(Timeframe::from_str_loose(tf.as_str()), Some(tf));
        }
        assert_eq!(Timeframe::from_str_loose(" 4H "), Some(Timeframe::H4));
        assert_eq!(Timeframe::from_str_loose("2h"), None);
    }

    #[test]
    fn higher_is_coarser() {
        assert!(Timeframe::H1.higher().as_seconds() > Timeframe::H1.as_seconds());
        assert_eq!(Timeframe::W1.higher(), Timeframe::W1);
    }
}
