//! RFM Segment - Deterministic customer segmentation from sales transactions
//!
//! The engine turns raw order-line transactions into one RFM (Recency,
//! Frequency, Monetary) score per customer through a deterministic pipeline:
//! schema adaptation → aggregation → quantile scoring → segment
//! classification → report encoding.
//!
//! ## Modules
//!
//! - **Schema**: Parse and validate transaction records from CSV, JSON and NDJSON
//! - **Pipeline**: Aggregator, Scorer and Classifier stages behind [`RfmAnalyzer`]
//! - **Encoder**: Serializable tables and reports for downstream consumers

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod quantile;
pub mod schema;
pub mod scorer;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::RfmConfig;
pub use error::ComputeError;
pub use pipeline::{analyze, rfm_from_csv, rfm_from_json, RfmAnalyzer};
pub use types::{CustomerMetrics, CustomerScore, RfmRecord, RfmTable, Segment, Transaction};

// Schema exports
pub use schema::{RawTransaction, TransactionAdapter, SCHEMA_VERSION};

/// Engine version embedded in all reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "rfm-segment";
