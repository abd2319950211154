//! Report encoding
//!
//! This module encodes segmentation tables for downstream consumers:
//! plain record lists (JSON, NDJSON, CSV) and a report envelope carrying
//! producer metadata, bin edges and per-segment summaries.

use crate::error::ComputeError;
use crate::types::{RfmRecord, RfmTable, ScoreBins, SegmentSummary};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "rfm.report.v1";

/// Supported output text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON array of records
    Json,
    /// Pretty-printed JSON array of records
    JsonPretty,
    /// One JSON record per line
    Ndjson,
    /// CSV with a header row
    Csv,
    /// Full report envelope (pretty JSON)
    Report,
}

impl FromStr for OutputFormat {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" => Ok(OutputFormat::JsonPretty),
            "ndjson" | "jsonl" => Ok(OutputFormat::Ndjson),
            "csv" => Ok(OutputFormat::Csv),
            "report" => Ok(OutputFormat::Report),
            other => Err(ComputeError::EncodingError(format!(
                "Unknown output format: {other}"
            ))),
        }
    }
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete segmentation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfmReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub snapshot_date: NaiveDate,
    pub computed_at_utc: String,
    pub customer_count: usize,
    pub bins: ScoreBins,
    pub segments: Vec<SegmentSummary>,
    pub records: Vec<RfmRecord>,
}

/// Encoder for producing reports and record tables
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap a table in a report envelope
    pub fn encode(&self, table: &RfmTable) -> RfmReport {
        RfmReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            snapshot_date: table.snapshot_date,
            computed_at_utc: Utc::now().to_rfc3339(),
            customer_count: table.len(),
            bins: table.bins.clone(),
            segments: table.segment_summary(),
            records: table.records().to_vec(),
        }
    }

    /// Encode the report envelope to pretty JSON
    pub fn encode_to_json(&self, table: &RfmTable) -> Result<String, ComputeError> {
        let report = self.encode(table);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }

    /// Render a table in the requested format
    pub fn render(&self, table: &RfmTable, format: OutputFormat) -> Result<String, ComputeError> {
        match format {
            OutputFormat::Json => Self::encode_records_json(table.records()),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(table.records())
                .map_err(ComputeError::JsonError),
            OutputFormat::Ndjson => Self::encode_records_ndjson(table.records()),
            OutputFormat::Csv => Self::encode_records_csv(table.records()),
            OutputFormat::Report => self.encode_to_json(table),
        }
    }

    /// Records as a compact JSON array
    pub fn encode_records_json(records: &[RfmRecord]) -> Result<String, ComputeError> {
        serde_json::to_string(records).map_err(ComputeError::JsonError)
    }

    /// Records as newline-delimited JSON
    pub fn encode_records_ndjson(records: &[RfmRecord]) -> Result<String, ComputeError> {
        let mut out = String::new();
        for record in records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Records as CSV with a header row
    pub fn encode_records_csv(records: &[RfmRecord]) -> Result<String, ComputeError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            writer.serialize(record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
