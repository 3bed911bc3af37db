use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn total_range(&self) -> f64 {
        self.high - self.low
    }

    /// Wilder true range; the first bar of a series has no previous close.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .total_range()
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.total_range(),
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Chronological OHLCV bars. Analysis code only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn tail(&self, n: usize) -> CandleSeries {
        let start = self.candles.len().saturating_sub(n);
        CandleSeries::new(self.candles[start..].to_vec())
    }

    pub fn slice(&self, start: usize, end: usize) -> CandleSeries {
        let s = start.min(self.candles.len());
        let e = end.min(self.candles.len());
        CandleSeries::new(self.candles[s..e].to_vec())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn highs_max(&self) -> f64 {
        self.candles
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn lows_min(&self) -> f64 {
        self.candles
            .iter()
            .map(|c| c.low)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Index of the first candle holding the series high (earliest wins ties)
    pub fn high_idx_max(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in self.candles.iter().enumerate() {
            if best.map_or(true, |(_, h)| c.high > h) {
                best = Some((i, c.high));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Index of the first candle holding the series low (earliest wins ties)
    pub fn low_idx_min(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in self.candles.iter().enumerate() {
            if best.map_or(true, |(_, l)| c.low < l) {
                best = Some((i, c.low));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Stable content hash used as the memoization key for indicator results.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.candles.len().hash(&mut hasher);
        for c in &self.candles {
            c.timestamp.timestamp_millis().hash(&mut hasher);
            c.open.to_bits().hash(&mut hasher);
            c.high.to_bits().hash(&mut hasher);
            c.low.to_bits().hash(&mut hasher);
            c.close.to_bits().hash(&mut hasher);
            c.volume.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Resample to a larger timeframe bucket
    pub fn resample(&self, bucket: Duration) -> CandleSeries {
        if self.candles.is_empty() {
            return CandleSeries::default();
        }
        let bucket_secs = (bucket.as_secs() as i64).max(1);
        let mut result: Vec<Candle> = Vec::new();

        for candle in &self.candles {
            let ts = candle.timestamp.timestamp();
            let bucket_start = ts - ts.rem_euclid(bucket_secs);
            let bucket_ts =
                DateTime::from_timestamp(bucket_start, 0).unwrap_or(candle.timestamp);

            if let Some(last) = result.last_mut() {
                if last.timestamp == bucket_ts {
                    last.high = last.high.max(candle.high);
                    last.low = last.low.min(candle.low);
                    last.close = candle.close;
                    last.volume += candle.volume;
                    continue;
                }
            }

            result.push(Candle {
                timestamp: bucket_ts,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                volume: candle.volume,
            });
        }

        CandleSeries::new(result)
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
