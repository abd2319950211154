//! Error types for RFM Segment

use thiserror::Error;

/// Errors that can occur during an analysis run
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Cannot compute without data: no transactions supplied")]
    EmptyInput,

    #[error("Missing required field '{field}' in record {index}")]
    MissingField { index: usize, field: &'static str },

    #[error("Insufficient data: quantile scoring needs at least 2 customers, got {customers}")]
    InsufficientData { customers: usize },

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Date parse error in record {index}: {value}")]
    DateParseError { index: usize, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
