use chrono::{DateTime, Duration, Utc};

use crate::models::{Candle, CandleSeries, PivotPoint, PivotSet};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    CandleSeries::new(candles)
}

/// Candles whose open is the previous close; high/low are the body extremes.
pub fn series_from_closes(closes: &[f64]) -> CandleSeries {
    series_with_volumes(closes, 100.0)
}

pub fn series_with_volumes(closes: &[f64], volume: f64) -> CandleSeries {
    series_with_volume_profile(closes, &vec![volume; closes.len()])
}

/// Like `series_from_closes` with a per-bar volume; missing entries default to 100.
pub fn series_with_volume_profile(closes: &[f64], volumes: &[f64]) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: volumes.get(i).copied().unwrap_or(100.0),
            }
        })
        .collect();

    CandleSeries::new(candles)
}

/// Closes walking linearly between `(price, bars)` waypoints. The first entry
/// is the starting price; each later one is reached exactly after `bars` bars.
pub fn waypoint_closes(path: &[(f64, usize)]) -> Vec<f64> {
    let mut closes = Vec::new();
    let Some(&(start, _)) = path.first() else {
        return closes;
    };
    closes.push(start);
    let mut prev = start;
    for &(target, bars) in &path[1..] {
        for k in 1..=bars {
            closes.push(prev + (target - prev) * k as f64 / bars as f64);
        }
        prev = target;
    }
    closes
}

pub fn waypoint_series(path: &[(f64, usize)]) -> CandleSeries {
    series_from_closes(&waypoint_closes(path))
}

/// Bar index of every waypoint in a `waypoint_series` path.
pub fn waypoint_indices(path: &[(f64, usize)]) -> Vec<usize> {
    let mut idx = 0;
    path.iter()
        .map(|&(_, bars)| {
            idx += bars;
            idx
        })
        .collect()
}

/// Pivots at every waypoint except the last, which stays the live close.
pub fn waypoint_pivots(candles: &CandleSeries, path: &[(f64, usize)]) -> PivotSet {
    let indices = waypoint_indices(path);
    let mut points = Vec::new();
    for k in 0..path.len().saturating_sub(1) {
        let is_high = if k == 0 {
            path[1].0 < path[0].0
        } else {
            path[k].0 > path[k - 1].0
        };
        let p = if is_high {
            PivotPoint::high(candles, indices[k])
        } else {
            PivotPoint::low(candles, indices[k])
        };
        points.push(p);
    }
    PivotSet::from_sequence(&points)
}

/// Create n rising (bullish) candles starting from `start` price.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let open = start + i as f64 * 10.0;
            let close = open + 8.0;
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                open,
                high: close + 2.0,
                low: open - 1.0,
                close,
                volume: 100.0,
            }
        })
        .collect();

    CandleSeries::new(candles)
}

/// Create n falling (bearish) candles starting from `start` price.
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let open = start - i as f64 * 10.0;
            let close = open - 8.0;
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                open,
                high: open + 1.0,
                low: close - 2.0,
                close,
                volume: 100.0,
            }
        })
        .collect();

    CandleSeries::new(candles)
}
