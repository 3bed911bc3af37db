use thiserror::Error;

/// Failures the pipeline reports outright. Everything else degrades to a
/// neutral value or an `Unknown`/`Hold` outcome.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("insufficient data: need at least {required} bars, got {provided}")]
    InsufficientData { required: usize, provided: usize },

    #[error("missing value in column '{column}' at bar {index}")]
    MissingValue { column: &'static str, index: usize },

    #[error("invalid candle at bar {index}: {reason}")]
    InvalidCandle { index: usize, reason: String },

    #[error("timestamps not strictly increasing at bar {index}")]
    NonMonotonicIndex { index: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
