#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use wave_analyzer::models::{Candle, CandleSeries};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Hourly candles from closes; each open is the previous close.
pub fn hourly_from_closes(closes: &[f64], volume: impl Fn(usize) -> f64) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: base + Duration::hours(i as i64),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: volume(i),
            }
        })
        .collect();

    CandleSeries::new(candles)
}

/// Linear walk between `(price, bars)` waypoints, hourly, flat volume.
pub fn waypoint_hourly(path: &[(f64, usize)]) -> CandleSeries {
    let mut closes = vec![path[0].0];
    let mut prev = path[0].0;
    for &(target, bars) in &path[1..] {
        for k in 1..=bars {
            closes.push(prev + (target - prev) * k as f64 / bars as f64);
        }
        prev = target;
    }
    hourly_from_closes(&closes, |_| 100.0)
}

/// Deterministic oscillating uptrend with enough swings for every detector.
pub fn swinging_market(n: usize) -> CandleSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            1000.0 + t * 0.8 + (t / 6.0).sin() * 40.0 + (t / 17.0).cos() * 25.0
        })
        .collect();
    hourly_from_closes(&closes, |i| 100.0 + ((i * 7) % 13) as f64 * 10.0)
}

pub fn rising_closes(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
}
