pub mod signals;
pub mod timeframe_aggregator;
pub mod wave_analyzer;
