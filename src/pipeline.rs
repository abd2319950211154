//! Pipeline orchestration
//!
//! This module provides the public API for RFM Segment.
//! It orchestrates the full pipeline from raw transaction text to a
//! segmentation table.

use crate::aggregator::Aggregator;
use crate::config::RfmConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::schema::{InputFormat, RawTransaction, TransactionAdapter};
use crate::scorer::Scorer;
use crate::types::{RfmRecord, RfmTable, Transaction};

/// Run the full analysis with the default configuration.
///
/// # Example
/// ```ignore
/// let table = analyze(&transactions)?;
/// let vip = table.get("11000").map(|r| r.segment);
/// ```
pub fn analyze(transactions: &[Transaction]) -> Result<RfmTable, ComputeError> {
    RfmAnalyzer::new().analyze(transactions)
}

/// Convert a raw JSON array of transactions into a JSON array of RFM records.
///
/// # Arguments
/// * `raw_json` - JSON array of rfm.transaction.v1 records
///
/// # Returns
/// JSON array with one record per customer
pub fn rfm_from_json(raw_json: String) -> Result<String, ComputeError> {
    process_text(&RfmAnalyzer::new(), &raw_json, InputFormat::Json)
}

/// Convert CSV transactions (with header row) into a JSON array of RFM records.
pub fn rfm_from_csv(raw_csv: String) -> Result<String, ComputeError> {
    process_text(&RfmAnalyzer::new(), &raw_csv, InputFormat::Csv)
}

/// Process raw text through the full pipeline.
///
/// Pipeline stages:
/// 1. TransactionAdapter - Parse and validate records
/// 2. Aggregator - Reduce to per-customer metrics
/// 3. Scorer - Quantile-score the population
/// 4. Classifier - Map totals to segments (inside the scorer)
/// 5. ReportEncoder - Encode records to JSON
fn process_text(
    analyzer: &RfmAnalyzer,
    input: &str,
    format: InputFormat,
) -> Result<String, ComputeError> {
    let table = analyzer.analyze_text(input, format)?;
    ReportEncoder::encode_records_json(table.records())
}

/// Analyzer carrying the configuration of a run.
///
/// Holds no state between runs; every call recomputes from its input.
#[derive(Debug, Clone, Default)]
pub struct RfmAnalyzer {
    config: RfmConfig,
}

impl RfmAnalyzer {
    /// Create an analyzer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a validated configuration
    pub fn with_config(config: RfmConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RfmConfig {
        &self.config
    }

    /// Aggregate, score and classify a transaction set
    pub fn analyze(&self, transactions: &[Transaction]) -> Result<RfmTable, ComputeError> {
        if transactions.is_empty() {
            return Err(ComputeError::EmptyInput);
        }

        // Stage 1: Reduce to one metrics row per customer
        let aggregated = Aggregator::aggregate(transactions, &self.config)?;

        // Stage 2: Score the whole population and classify each total
        let scored = Scorer::score(&aggregated.metrics, &self.config)?;

        // Stage 3: Join metrics and scores into output records
        let records: Vec<RfmRecord> = aggregated
            .metrics
            .iter()
            .zip(&scored.scores)
            .map(|(metrics, score)| RfmRecord::from_parts(metrics, score))
            .collect();

        let table = RfmTable::new(aggregated.snapshot_date, scored.bins, records);

        log::info!(
            "rfm: scored {} customers from {} transactions (snapshot {})",
            table.len(),
            transactions.len(),
            table.snapshot_date
        );

        Ok(table)
    }

    /// Validate raw records, then analyze them
    pub fn analyze_raw(&self, records: &[RawTransaction]) -> Result<RfmTable, ComputeError> {
        if records.is_empty() {
            return Err(ComputeError::EmptyInput);
        }
        let transactions = TransactionAdapter::to_transactions(records)?;
        self.analyze(&transactions)
    }

    /// Parse text in the given format, then analyze it
    pub fn analyze_text(&self, input: &str, format: InputFormat) -> Result<RfmTable, ComputeError> {
        let records = TransactionAdapter::parse(input, format)?;
        self.analyze_raw(&records)
    }

    /// Analyze and return a single customer's record
    pub fn lookup(
        &self,
        transactions: &[Transaction],
        customer_id: &str,
    ) -> Result<Option<RfmRecord>, ComputeError> {
        let table = self.analyze(transactions)?;
        Ok(table.get(customer_id).cloned())
    }
}
