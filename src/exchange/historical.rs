use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;

use crate::exchange::CandleSource;
use crate::models::{Candle, CandleSeries, Timeframe};

/// A CandleSource that replays pre-loaded candles.
/// A cursor (`now`) controls which candles are visible: only candles
/// with timestamp <= now are returned, simulating a forward walk.
/// Without a cursor every loaded candle is visible.
pub struct HistoricalSource {
    data: HashMap<Timeframe, Vec<Candle>>,
    now: Option<DateTime<Utc>>,
}

impl HistoricalSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            now: None,
        }
    }

    /// Load candles for a specific timeframe.
    /// Candles must be sorted oldest-first.
    pub fn load(&mut self, tf: Timeframe, candles: Vec<Candle>) {
        self.data.insert(tf, candles);
    }

    /// Load a JSON array of candles, as written by `serde_json`.
    pub fn load_json_file(&mut self, tf: Timeframe, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading candle file {}", path.display()))?;
        let candles: Vec<Candle> = serde_json::from_str(&content)
            .with_context(|| format!("parsing candle file {}", path.display()))?;
        if candles.is_empty() {
            bail!("candle file {} is empty", path.display());
        }
        let count = candles.len();
        tracing::info!("Loaded {} {} candles from {}", count, tf, path.display());
        self.load(tf, candles);
        Ok(count)
    }

    /// Advance the simulation clock.
    pub fn set_time(&mut self, t: DateTime<Utc>) {
        self.now = Some(t);
    }

    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.now
    }

    /// Get the earliest timestamp across all loaded timeframes.
    pub fn earliest_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .values()
            .filter_map(|v| v.first().map(|c| c.timestamp))
            .min()
    }

    /// Get the latest timestamp across all loaded timeframes.
    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .values()
            .filter_map(|v| v.last().map(|c| c.timestamp))
            .max()
    }

    /// Candles of `tf` up to the cursor, oldest first.
    fn visible(&self, tf: Timeframe) -> &[Candle] {
        let Some(all) = self.data.get(&tf) else {
            return &[];
        };
        let end = match self.now {
            Some(now) => all.partition_point(|c| c.timestamp <= now),
            None => all.len(),
        };
        &all[..end]
    }

    /// Largest loaded timeframe that evenly divides `tf`.
    fn resample_base(&self, tf: Timeframe) -> Option<Timeframe> {
        self.data
            .keys()
            .copied()
            .filter(|base| *base < tf && tf.as_seconds() % base.as_seconds() == 0)
            .max()
    }

    /// Return candles up to the cursor, capped at `limit`. Timeframes that were
    /// never loaded are resampled from a finer one when possible.
    fn visible_candles(&self, tf: Timeframe, limit: usize) -> CandleSeries {
        if self.data.contains_key(&tf) {
            let all = self.visible(tf);
            let start = all.len().saturating_sub(limit);
            return CandleSeries::new(all[start..].to_vec());
        }

        let Some(base) = self.resample_base(tf) else {
            return CandleSeries::default();
        };
        tracing::debug!("[SOURCE] resampling {} from {}", tf, base);
        let resampled = CandleSeries::new(self.visible(base).to_vec()).resample(tf.as_duration());
        resampled.tail(limit)
    }
}

impl Default for HistoricalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for HistoricalSource {
    async fn fetch_ohlcv(&mut self, tf: Timeframe, limit: usize) -> Result<CandleSeries> {
        Ok(self.visible_candles(tf, limit))
    }
}
