use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CandleSeries, Direction, PivotKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub kind: PivotKind,
}

impl PivotPoint {
    pub fn high(candles: &CandleSeries, index: usize) -> Self {
        Self {
            index,
            timestamp: candles[index].timestamp,
            price: candles[index].high,
            kind: PivotKind::High,
        }
    }

    pub fn low(candles: &CandleSeries, index: usize) -> Self {
        Self {
            index,
            timestamp: candles[index].timestamp,
            price: candles[index].low,
            kind: PivotKind::Low,
        }
    }
}

/// Detector output: highs and lows, each in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotSet {
    pub highs: Vec<PivotPoint>,
    pub lows: Vec<PivotPoint>,
}

impl PivotSet {
    pub fn new(highs: Vec<PivotPoint>, lows: Vec<PivotPoint>) -> Self {
        Self { highs, lows }
    }

    /// Builds a set from an already time-ordered mixed sequence.
    pub fn from_sequence(points: &[PivotPoint]) -> Self {
        let mut set = PivotSet::default();
        for p in points {
            match p.kind {
                PivotKind::High => set.highs.push(*p),
                PivotKind::Low => set.lows.push(*p),
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.highs.len() + self.lows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }

    /// All pivots sorted by bar index; a high sorts before a low on the same bar.
    pub fn merged(&self) -> Vec<PivotPoint> {
        let mut all: Vec<PivotPoint> = self.highs.iter().chain(self.lows.iter()).copied().collect();
        all.sort_by_key(|p| {
            (
                p.index,
                match p.kind {
                    PivotKind::High => 0u8,
                    PivotKind::Low => 1u8,
                },
            )
        });
        all
    }
}

/// A single price leg between two points of the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    pub start_index: usize,
    pub start_price: f64,
    pub end_index: usize,
    pub end_price: f64,
}

impl Swing {
    pub fn direction(&self) -> Option<Direction> {
        Direction::of_move(self.start_price, self.end_price)
    }

    pub fn length(&self) -> f64 {
        (self.end_price - self.start_price).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::series_from_closes;

    #[test]
    fn merged_orders_by_index_then_kind() {
        let candles = series_from_closes(&[10.0, 12.0, 11.0, 13.0, 9.0]);
        let set = PivotSet::new(
            vec![PivotPoint::high(&candles, 3), PivotPoint::high(&candles, 1)],
            vec![PivotPoint::low(&candles, 3), PivotPoint::low(&candles, 0)],
        );
        let merged = set.merged();
        let order: Vec<(usize, PivotKind)> = merged.iter().map(|p| (p.index, p.kind)).collect();
        assert_eq!(
            order,
            vec![
                (0, PivotKind::Low),
                (1, PivotKind::High),
                (3, PivotKind::High),
                (3, PivotKind::Low),
            ]
        );
        assert_eq!(set.len(), 4);
        assert_eq!(PivotSet::from_sequence(&merged).highs.len(), 2);
    }

    #[test]
    fn swing_direction_and_length() {
        let s = Swing {
            start_index: 0,
            start_price: 120.0,
            end_index: 5,
            end_price: 100.0,
        };
        assert_eq!(s.direction(), Some(Direction::Down));
        assert!((s.length() - 20.0).abs() < 1e-9);
    }
}
