//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for crosstrader.
#[derive(Debug, thiserror::Error)]
pub enum CrossoverError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("row {row}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: cannot parse close price '{value}'")]
    InvalidPrice { row: usize, value: String },

    #[error("row {row}: timestamp {timestamp} is not after the previous row")]
    NonIncreasingTimestamp { row: usize, timestamp: NaiveDateTime },

    #[error("no price rows found")]
    EmptyData,

    #[error("series length mismatch: {prices} prices, {signals} signals")]
    LengthMismatch { prices: usize, signals: usize },

    #[error("series length mismatch: {prices} prices, {points} portfolio values")]
    ValueLengthMismatch { prices: usize, points: usize },

    #[error("initial cash must be finite and non-negative, got {value}")]
    InvalidInitialCash { value: f64 },

    #[error("degenerate close price {close} at index {index} ({timestamp})")]
    DegeneratePrice {
        index: usize,
        timestamp: NaiveDateTime,
        close: f64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CrossoverError> for std::process::ExitCode {
    fn from(err: &CrossoverError) -> Self {
        let code: u8 = match err {
            CrossoverError::Io(_) => 1,
            CrossoverError::ConfigParse { .. }
            | CrossoverError::ConfigMissing { .. }
            | CrossoverError::ConfigInvalid { .. } => 2,
            CrossoverError::Data { .. }
            | CrossoverError::MissingColumn { .. }
            | CrossoverError::InvalidTimestamp { .. }
            | CrossoverError::InvalidPrice { .. }
            | CrossoverError::NonIncreasingTimestamp { .. }
            | CrossoverError::EmptyData => 3,
            CrossoverError::LengthMismatch { .. }
            | CrossoverError::ValueLengthMismatch { .. }
            | CrossoverError::InvalidInitialCash { .. } => 4,
            CrossoverError::DegeneratePrice { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
