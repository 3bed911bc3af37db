use serde::{Deserialize, Serialize};

use crate::models::{Direction, Swing};

pub const FIB_RATIOS: [f64; 10] = [
    0.236, 0.382, 0.5, 0.618, 0.786, 1.0, 1.618, 2.618, 3.618, 4.236,
];

/// Retracement ratios seen in real corrective legs.
pub const CANONICAL_RETRACEMENTS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

pub const GOLDEN_ZONE: (f64, f64) = (0.5, 0.618);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Levels of one anchor swing.
///
/// `retracements[r] = end - (end - start) * r` for every ratio in the set;
/// `extensions[r] = start + (end - start) * r` for ratios >= 1. Both run
/// monotonically away from `end` as the ratio grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevels {
    pub start: f64,
    pub end: f64,
    pub retracements: Vec<FibLevel>,
    pub extensions: Vec<FibLevel>,
}

impl FibonacciLevels {
    pub fn direction(&self) -> Option<Direction> {
        Direction::of_move(self.start, self.end)
    }

    pub fn range(&self) -> f64 {
        self.end - self.start
    }

    pub fn retracement(&self, ratio: f64) -> Option<f64> {
        lookup(&self.retracements, ratio)
    }

    pub fn extension(&self, ratio: f64) -> Option<f64> {
        lookup(&self.extensions, ratio)
    }

    fn all_levels(&self) -> impl Iterator<Item = f64> + '_ {
        self.retracements
            .iter()
            .chain(self.extensions.iter())
            .map(|l| l.price)
    }

    /// Level closest to `price`; the first one in ratio order wins ties.
    pub fn find_nearest_level(&self, price: f64) -> Option<f64> {
        let mut best: Option<(f64, f64)> = None;
        for level in self.all_levels() {
            let dist = (level - price).abs();
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((level, dist));
            }
        }
        best.map(|(level, _)| level)
    }

    /// Distinct levels strictly below `price`, nearest first.
    pub fn get_support_levels(&self, price: f64) -> Vec<f64> {
        let mut levels: Vec<f64> = self.all_levels().filter(|&l| l < price).collect();
        levels.sort_by(|a, b| b.total_cmp(a));
        levels.dedup();
        levels
    }

    /// Distinct levels strictly above `price`, nearest first.
    pub fn get_resistance_levels(&self, price: f64) -> Vec<f64> {
        let mut levels: Vec<f64> = self.all_levels().filter(|&l| l > price).collect();
        levels.sort_by(|a, b| a.total_cmp(b));
        levels.dedup();
        levels
    }

    /// Price band between the 50% and 61.8% retracements, low bound first.
    pub fn golden_zone(&self) -> (f64, f64) {
        let a = self.end - self.range() * GOLDEN_ZONE.0;
        let b = self.end - self.range() * GOLDEN_ZONE.1;
        (a.min(b), a.max(b))
    }

    pub fn in_golden_zone(&self, price: f64) -> bool {
        retracement_ratio(self.start, self.end, price).is_some_and(in_golden_ratio)
    }
}

fn lookup(levels: &[FibLevel], ratio: f64) -> Option<f64> {
    levels
        .iter()
        .find(|l| (l.ratio - ratio).abs() < 1e-9)
        .map(|l| l.price)
}

/// Wave-3 targets measured from the end of wave 2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveProjection {
    pub standard: f64,
    pub extended: f64,
    pub super_extended: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FibonacciCalculator;

impl FibonacciCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_levels(&self, start: f64, end: f64) -> FibonacciLevels {
        let range = end - start;
        let retracements = FIB_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: end - range * ratio,
            })
            .collect();
        let extensions = FIB_RATIOS
            .iter()
            .filter(|&&r| r >= 1.0)
            .map(|&ratio| FibLevel {
                ratio,
                price: start + range * ratio,
            })
            .collect();

        FibonacciLevels {
            start,
            end,
            retracements,
            extensions,
        }
    }

    pub fn levels_for_swing(&self, swing: &Swing) -> FibonacciLevels {
        self.calculate_levels(swing.start_price, swing.end_price)
    }

    pub fn calculate_wave_projection(
        &self,
        wave1_start: f64,
        wave1_end: f64,
        wave2_end: f64,
    ) -> WaveProjection {
        let wave1 = wave1_end - wave1_start;
        WaveProjection {
            standard: wave2_end + wave1,
            extended: wave2_end + wave1 * 1.618,
            super_extended: wave2_end + wave1 * 2.618,
        }
    }

    /// False when wave 2 gives back more than all of wave 1 (or wave 1 is flat).
    pub fn validate_wave2_retracement(
        &self,
        wave1_start: f64,
        wave1_end: f64,
        wave2_end: f64,
    ) -> bool {
        match retracement_ratio(wave1_start, wave1_end, wave2_end) {
            Some(ratio) => ratio <= 1.0,
            None => false,
        }
    }
}

/// Fraction of the `leg_start -> leg_end` move given back at `retrace_end`.
pub fn retracement_ratio(leg_start: f64, leg_end: f64, retrace_end: f64) -> Option<f64> {
    let leg = leg_end - leg_start;
    if leg == 0.0 {
        return None;
    }
    Some((leg_end - retrace_end) / leg)
}

/// Retracement ratio inside the 50% to 61.8% band.
pub fn in_golden_ratio(ratio: f64) -> bool {
    (GOLDEN_ZONE.0..=GOLDEN_ZONE.1).contains(&ratio)
}

/// 1.0 for an exact canonical retracement, falling to 0.0 at 0.1 away.
pub fn ratio_closeness(ratio: f64) -> f64 {
    let nearest = CANONICAL_RETRACEMENTS
        .iter()
        .map(|c| (ratio - c).abs())
        .fold(f64::INFINITY, f64::min);
    (1.0 - nearest / 0.1).max(0.0)
}
