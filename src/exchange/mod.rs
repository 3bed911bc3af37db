pub mod historical;

pub use historical::HistoricalSource;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CandleSeries, Timeframe};

/// Supplies OHLCV history to the analysis pipeline.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_ohlcv(&mut self, tf: Timeframe, limit: usize) -> Result<CandleSeries>;
}
