use serde::{Deserialize, Serialize};

use crate::core::fibonacci::{ratio_closeness, retracement_ratio, FibonacciCalculator};
use crate::models::{
    CandleSeries, Direction, PivotKind, PivotPoint, PivotSet, Swing, Trend, WavePattern,
    WavePosition, WaveType,
};

const MIN_PIVOTS: usize = 5;
const STRUCTURE_WINDOW: usize = 8;
const LATERAL_BAND_PCT: f64 = 2.0;

const STRUCTURE_WEIGHT: f64 = 0.5;
const FIB_WEIGHT: f64 = 0.35;
const TREND_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveFamily {
    Any,
    Impulsive,
    Corrective,
}

impl WaveFamily {
    pub fn from_str_loose(s: &str) -> Option<WaveFamily> {
        match s.trim().to_lowercase().as_str() {
            "any" | "all" => Some(WaveFamily::Any),
            "impulsive" | "impulse" => Some(WaveFamily::Impulsive),
            "corrective" | "correction" => Some(WaveFamily::Corrective),
            _ => None,
        }
    }

    fn allows(self, wave_type: WaveType) -> bool {
        match self {
            WaveFamily::Any => true,
            WaveFamily::Impulsive => wave_type == WaveType::Impulsive,
            WaveFamily::Corrective => wave_type == WaveType::Corrective,
        }
    }
}

pub trait PatternAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;
    fn analyze(&self, candles: &CandleSeries, pivots: &PivotSet) -> WavePattern;
}

/// A structure point: a confirmed pivot, or the live close at the end.
#[derive(Debug, Clone, Copy)]
struct Point {
    index: usize,
    price: f64,
    pivot: Option<PivotPoint>,
}

impl Point {
    fn from_pivot(p: &PivotPoint) -> Self {
        Self {
            index: p.index,
            price: p.price,
            pivot: Some(*p),
        }
    }
}

type Fits = fn(&[Point], &[Point], Trend) -> bool;

/// One candidate count: the last `legs + 1` points form the structure, the
/// points before it are context.
struct CountRule {
    wave_type: WaveType,
    legs: usize,
    fits: Fits,
}

impl CountRule {
    const fn impulse(legs: usize) -> Self {
        Self {
            wave_type: WaveType::Impulsive,
            legs,
            fits: impulse_fits,
        }
    }

    const fn correction(legs: usize) -> Self {
        Self {
            wave_type: WaveType::Corrective,
            legs,
            fits: corrective_fits,
        }
    }
}

/// Longest counts first. The 3-leg impulse and correction are disjoint: one
/// needs leg 1 with the macro trend, the other against it.
const COUNT_RULES: [CountRule; 8] = [
    CountRule::impulse(5),
    CountRule::impulse(4),
    CountRule::impulse(3),
    CountRule::correction(3),
    CountRule::impulse(2),
    CountRule::correction(2),
    CountRule::impulse(1),
    CountRule::correction(1),
];

/// Elliott wave counter over the most recent pivots.
pub struct WaveCounter {
    pub family: WaveFamily,
    pub min_pivots: usize,
    pub structure_window: usize,
    pub lateral_band_pct: f64,
}

impl WaveCounter {
    pub fn new() -> Self {
        Self::with_family(WaveFamily::Any)
    }

    /// Only reports impulses; everything else is `Unknown`.
    pub fn impulsive_only() -> Self {
        Self::with_family(WaveFamily::Impulsive)
    }

    /// Only reports corrections; everything else is `Unknown`.
    pub fn corrective_only() -> Self {
        Self::with_family(WaveFamily::Corrective)
    }

    pub fn with_family(family: WaveFamily) -> Self {
        Self {
            family,
            min_pivots: MIN_PIVOTS,
            structure_window: STRUCTURE_WINDOW,
            lateral_band_pct: LATERAL_BAND_PCT,
        }
    }

    fn count(&self, points: &[Point], trend: Trend) -> Option<(WaveType, usize)> {
        for rule in COUNT_RULES.iter().filter(|r| self.family.allows(r.wave_type)) {
            if points.len() < rule.legs + 1 {
                continue;
            }
            let split = points.len() - (rule.legs + 1);
            let (before, structure) = points.split_at(split);
            if (rule.fits)(structure, before, trend) {
                return Some((rule.wave_type, rule.legs));
            }
        }
        None
    }
}

impl Default for WaveCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternAnalyzer for WaveCounter {
    fn name(&self) -> &'static str {
        match self.family {
            WaveFamily::Any => "wave_counter",
            WaveFamily::Impulsive => "impulse_counter",
            WaveFamily::Corrective => "correction_counter",
        }
    }

    fn analyze(&self, candles: &CandleSeries, pivots: &PivotSet) -> WavePattern {
        let merged = alternate(pivots.merged());
        let trend = macro_trend(&merged, self.lateral_band_pct);

        let Some(last) = candles.last() else {
            return WavePattern::unknown(trend);
        };
        if merged.len() < self.min_pivots {
            tracing::debug!(
                "[WAVES] {} pivots, need {} -> unknown",
                merged.len(),
                self.min_pivots
            );
            return WavePattern::unknown(trend);
        }

        let active = &merged[merged.len().saturating_sub(self.structure_window)..];
        let points = with_live_point(active, candles.len() - 1, last.close);

        match self.count(&points, trend) {
            Some((wave_type, legs)) => {
                let split = points.len() - (legs + 1);
                let live_end = leg_extreme(candles, &points);
                let pattern = build_pattern(
                    wave_type,
                    &points[split..],
                    &points[..split],
                    live_end,
                    trend,
                );
                tracing::debug!(
                    "[WAVES] {} {} {} conf={:.1} target={:.2} invalid={:.2}",
                    pattern.trend,
                    pattern.wave_type,
                    pattern.current_wave,
                    pattern.confidence,
                    pattern.projection_target,
                    pattern.invalidation_level
                );
                pattern
            }
            None => {
                tracing::debug!("[WAVES] no count fits the last {} points", points.len());
                WavePattern::unknown(trend)
            }
        }
    }
}

/// Collapses runs of same-kind pivots to their most extreme member so highs
/// and lows alternate. Earlier pivots win ties.
fn alternate(merged: Vec<PivotPoint>) -> Vec<PivotPoint> {
    let mut out: Vec<PivotPoint> = Vec::with_capacity(merged.len());
    for p in merged {
        match out.last_mut() {
            Some(prev) if prev.kind == p.kind => {
                let more_extreme = match p.kind {
                    PivotKind::High => p.price > prev.price,
                    PivotKind::Low => p.price < prev.price,
                };
                if more_extreme {
                    *prev = p;
                }
            }
            _ => out.push(p),
        }
    }
    out
}

/// Least-squares slope of pivot price over bar index, as a percent move
/// across the pivot span relative to the mean price.
fn macro_trend(pivots: &[PivotPoint], band_pct: f64) -> Trend {
    if pivots.len() < 2 {
        return Trend::Unknown;
    }
    let n = pivots.len() as f64;
    let mean_x = pivots.iter().map(|p| p.index as f64).sum::<f64>() / n;
    let mean_y = pivots.iter().map(|p| p.price).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for p in pivots {
        let dx = p.index as f64 - mean_x;
        sxy += dx * (p.price - mean_y);
        sxx += dx * dx;
    }
    if sxx == 0.0 || mean_y == 0.0 {
        return Trend::Lateral;
    }

    let span = (pivots[pivots.len() - 1].index - pivots[0].index) as f64;
    let move_pct = sxy / sxx * span / mean_y.abs() * 100.0;
    if move_pct > band_pct {
        Trend::Uptrend
    } else if move_pct < -band_pct {
        Trend::Downtrend
    } else {
        Trend::Lateral
    }
}

/// Appends the live close as the end of the leg in progress. A close beyond
/// the last pivot in that pivot's own direction extends the previous leg instead.
fn with_live_point(active: &[PivotPoint], last_index: usize, close: f64) -> Vec<Point> {
    let mut points: Vec<Point> = active.iter().map(Point::from_pivot).collect();
    let Some(last) = active.last() else {
        return points;
    };
    if last.index >= last_index && last.price == close {
        return points;
    }

    let live = Point {
        index: last_index,
        price: close,
        pivot: None,
    };
    let extends = match last.kind {
        PivotKind::High => close > last.price,
        PivotKind::Low => close < last.price,
    };
    if extends {
        if let Some(end) = points.last_mut() {
            *end = live;
        }
    } else if close != last.price {
        points.push(live);
    }
    points
}

/// Furthest price the live leg has reached since its starting pivot. Ends the
/// governing swing there rather than at the close.
fn leg_extreme(candles: &CandleSeries, points: &[Point]) -> Point {
    let n = points.len();
    let end = points[n - 1];
    if n < 2 {
        return end;
    }
    let start = points[n - 2];
    let Some(dir) = Direction::of_move(start.price, end.price) else {
        return end;
    };

    let mut best = end;
    for i in start.index + 1..candles.len() {
        let c = &candles[i];
        let price = match dir {
            Direction::Up => c.high,
            Direction::Down => c.low,
        };
        if dir.beyond(price, best.price) || (price == best.price && i < best.index) {
            best = Point {
                index: i,
                price,
                pivot: None,
            };
        }
    }
    best
}

fn leg(points: &[Point], k: usize) -> f64 {
    (points[k].price - points[k - 1].price).abs()
}

/// Every leg is non-flat and alternates starting with `dir`.
fn alternates(points: &[Point], dir: Direction) -> bool {
    points.windows(2).enumerate().all(|(k, w)| {
        let expected = if k % 2 == 0 { dir } else { dir.opposite() };
        Direction::of_move(w[0].price, w[1].price) == Some(expected)
    })
}

/// Hard impulse rules for however many legs are present.
fn impulse_shape(s: &[Point]) -> bool {
    let n = s.len() - 1;
    let Some(dir) = Direction::of_move(s[0].price, s[1].price) else {
        return false;
    };
    if !alternates(s, dir) {
        return false;
    }
    // wave 2 gives back at most all of wave 1
    if n >= 2
        && !FibonacciCalculator::new().validate_wave2_retracement(
            s[0].price,
            s[1].price,
            s[2].price,
        )
    {
        return false;
    }
    if n >= 4 {
        // wave 3 clears wave 1, wave 4 stays out of wave-1 territory
        if !dir.beyond(s[3].price, s[1].price) || !dir.beyond(s[4].price, s[1].price) {
            return false;
        }
    }
    if n == 5 {
        let (w1, w3, w5) = (leg(s, 1), leg(s, 3), leg(s, 5));
        if w3 < w1 && w3 < w5 {
            return false;
        }
    }
    true
}

/// Hard A-B-C rules for however many legs are present.
fn corrective_shape(s: &[Point]) -> bool {
    let Some(dir) = Direction::of_move(s[0].price, s[1].price) else {
        return false;
    };
    if !alternates(s, dir) {
        return false;
    }
    // B retraces inside A, at most back to its origin
    s.len() < 3
        || retracement_ratio(s[0].price, s[1].price, s[2].price).is_some_and(|r| r <= 1.0)
}

fn impulse_fits(s: &[Point], before: &[Point], trend: Trend) -> bool {
    let n = s.len() - 1;
    if !impulse_shape(s) {
        return false;
    }
    let Some(dir) = Direction::of_move(s[0].price, s[1].price) else {
        return false;
    };
    if n <= 3 && trend.to_direction() != Some(dir) {
        return false;
    }
    if n <= 2 {
        // wave 1 has to out-range the leg it reversed
        let Some(prev) = before.last() else {
            return false;
        };
        if leg(s, 1) <= (s[0].price - prev.price).abs() {
            return false;
        }
    }
    if n == 1 {
        // a fresh wave 1 follows a finished A-B-C
        if before.len() < 3 {
            return false;
        }
        let mut abc: Vec<Point> = before[before.len() - 3..].to_vec();
        abc.push(s[0]);
        if !corrective_shape(&abc) {
            return false;
        }
    }
    true
}

fn corrective_fits(s: &[Point], before: &[Point], trend: Trend) -> bool {
    let n = s.len() - 1;
    if !corrective_shape(s) {
        return false;
    }
    let Some(dir) = Direction::of_move(s[0].price, s[1].price) else {
        return false;
    };
    if trend.to_direction() == Some(dir) {
        return false;
    }
    if n == 1 {
        // wave A follows a finished five-wave impulse
        if before.len() < 5 {
            return false;
        }
        let mut impulse: Vec<Point> = before[before.len() - 5..].to_vec();
        impulse.push(s[0]);
        if impulse.len() != 6 || !impulse_shape(&impulse) {
            return false;
        }
    }
    true
}

/// First `origin + dir * length * r` strictly beyond `current`; falls back to a
/// 23.6% step past the current price.
fn project(dir: Direction, current: f64, origin: f64, length: f64, ratios: &[f64]) -> f64 {
    ratios
        .iter()
        .map(|r| origin + dir.sign() * length * r)
        .find(|&target| dir.beyond(target, current))
        .unwrap_or(current + dir.sign() * length * 0.236)
}

fn swing(a: &Point, b: &Point) -> Swing {
    Swing {
        start_index: a.index,
        start_price: a.price,
        end_index: b.index,
        end_price: b.price,
    }
}

fn trend_score(trend: Trend, dir: Direction) -> f64 {
    match trend.to_direction() {
        Some(t) if t == dir => 1.0,
        Some(_) => 0.0,
        None => 0.5,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Projection, invalidation, governing swing and completed retracement ratios.
type Targets = (f64, f64, Swing, Vec<f64>);

/// Derives position, targets and confidence for a structure that passed its rules.
fn build_pattern(
    wave_type: WaveType,
    s: &[Point],
    before: &[Point],
    live_end: Point,
    trend: Trend,
) -> WavePattern {
    let fib = FibonacciCalculator::new();
    let n = s.len() - 1;
    let p: Vec<f64> = s.iter().map(|pt| pt.price).collect();
    let current = p[n];
    // Leg 1 direction exists, the rule already checked it
    let leg1_dir = Direction::of_move(p[0], p[1]).unwrap_or(Direction::Up);
    let live = swing(&s[n - 1], &live_end);

    let (current_wave, family_len, trend_dir) = match wave_type {
        WaveType::Impulsive => (WavePosition::impulse_leg(n), 5.0, leg1_dir),
        _ => (WavePosition::corrective_leg(n), 3.0, leg1_dir.opposite()),
    };

    let (projection, invalidation, governing, ratios): Targets = match wave_type {
        WaveType::Impulsive => {
            let d = leg1_dir;
            let w1 = leg(s, 1);
            match n {
                1 => {
                    let c_leg = before
                        .last()
                        .map(|b| (p[0] - b.price).abs())
                        .unwrap_or(w1);
                    let governing = before.last().map(|b| swing(b, &s[0])).unwrap_or(live);
                    let target = project(d, current, p[0], c_leg, &[1.0, 1.618, 2.618]);
                    (target, p[0], governing, vec![])
                }
                2 => {
                    let target = fib.calculate_wave_projection(p[0], p[1], current).extended;
                    (target, p[0], live, vec![])
                }
                3 => {
                    let proj = fib.calculate_wave_projection(p[0], p[1], p[2]);
                    let target = [
                        proj.extended,
                        proj.super_extended,
                        p[2] + d.sign() * w1 * 3.618,
                        p[2] + d.sign() * w1 * 4.236,
                    ]
                    .into_iter()
                    .find(|&t| d.beyond(t, current))
                    .unwrap_or(current + d.sign() * w1 * 0.236);
                    let r2 = retracement_ratio(p[0], p[1], p[2]);
                    (target, p[0], swing(&s[1], &s[2]), r2.into_iter().collect())
                }
                4 => {
                    let target = project(d, current, current, w1, &[1.0, 1.618]);
                    let r2 = retracement_ratio(p[0], p[1], p[2]);
                    (target, p[1], live, r2.into_iter().collect())
                }
                _ => {
                    let target = project(d, current, p[4], w1, &[1.0, 1.618, 2.618, 3.618]);
                    let ratios: Vec<f64> = [
                        retracement_ratio(p[0], p[1], p[2]),
                        retracement_ratio(p[2], p[3], p[4]),
                    ]
                    .into_iter()
                    .flatten()
                    .collect();
                    (target, p[4], live, ratios)
                }
            }
        }
        _ => {
            let c = leg1_dir;
            let wa = leg(s, 1);
            match n {
                1 => {
                    // before[len-5] is the origin of the impulse being corrected
                    let impulse_len = before
                        .len()
                        .checked_sub(5)
                        .map(|i| (p[0] - before[i].price).abs())
                        .unwrap_or(wa);
                    let target = project(
                        c,
                        current,
                        p[0],
                        impulse_len,
                        &[0.382, 0.5, 0.618, 0.786, 1.0],
                    );
                    (target, p[0], live, vec![])
                }
                2 => (current + c.sign() * wa, p[0], live, vec![]),
                _ => {
                    let target = project(c, current, p[2], wa, &[1.0, 1.618, 2.618]);
                    let rb = retracement_ratio(p[0], p[1], p[2]);
                    (target, p[2], live, rb.into_iter().collect())
                }
            }
        }
    };

    let structure = n as f64 / family_len;
    let fib_score = if ratios.is_empty() {
        0.5
    } else {
        ratios.iter().map(|&r| ratio_closeness(r)).sum::<f64>() / ratios.len() as f64
    };
    let confidence = (100.0
        * (STRUCTURE_WEIGHT * structure
            + FIB_WEIGHT * fib_score
            + TREND_WEIGHT * trend_score(trend, trend_dir)))
    .clamp(0.0, 100.0);

    let mut supporting: Vec<PivotPoint> = Vec::new();
    if n == 1 {
        let context = if wave_type == WaveType::Impulsive { 3 } else { 5 };
        supporting.extend(
            before[before.len().saturating_sub(context)..]
                .iter()
                .filter_map(|pt| pt.pivot),
        );
    }
    supporting.extend(s.iter().filter_map(|pt| pt.pivot));

    WavePattern {
        wave_type,
        current_wave,
        trend,
        confidence: round2(confidence),
        projection_target: projection,
        invalidation_level: invalidation,
        pivots: supporting,
        governing_swing: Some(governing),
        last_retracement: ratios.last().copied(),
    }
}
