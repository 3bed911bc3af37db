pub mod candle;
pub mod classification;
pub mod pattern;
pub mod pivot;
pub mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use classification::*;
pub use pattern::WavePattern;
pub use pivot::{PivotPoint, PivotSet, Swing};
pub use timeframe::Timeframe;
