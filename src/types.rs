//! Core types for the RFM pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: validated transactions, per-customer metrics, per-customer scores,
//! and the output table handed to consumers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single sold order line (validated, immutable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque customer identifier
    pub customer_id: String,
    /// Calendar date of the order
    pub order_date: NaiveDate,
    /// Unique order line identifier (counted, never summed)
    pub line_id: String,
    /// Signed line amount in currency units
    pub amount: Decimal,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<String>,
        order_date: NaiveDate,
        line_id: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            order_date,
            line_id: line_id.into(),
            amount,
        }
    }
}

/// Raw RFM metrics for one customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Most recent order date for this customer
    pub last_order_date: NaiveDate,
    /// Days between the run's snapshot date and `last_order_date` (non-negative)
    pub recency_days: i64,
    /// Number of distinct order lines
    pub frequency: usize,
    /// Sum of all line amounts (may be negative when returns are present)
    pub monetary: Decimal,
}

/// Business segment derived from the composite RFM score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "VIP")]
    Vip,
    #[serde(rename = "Loyal")]
    Loyal,
    #[serde(rename = "Potential")]
    Potential,
    #[serde(rename = "At-risk / churned")]
    AtRisk,
}

impl Segment {
    /// All segments, best first
    pub const ALL: [Segment; 4] = [
        Segment::Vip,
        Segment::Loyal,
        Segment::Potential,
        Segment::AtRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Vip => "VIP",
            Segment::Loyal => "Loyal",
            Segment::Potential => "Potential",
            Segment::AtRisk => "At-risk / churned",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal scores for one customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerScore {
    pub customer_id: String,
    /// Recency score (1-5, higher = more recent)
    pub r_score: u8,
    /// Frequency score (1-5, higher = more order lines)
    pub f_score: u8,
    /// Monetary score (1-5, higher = more spend)
    pub m_score: u8,
    /// r + f + m (3-15)
    pub rfm_total: u8,
    pub segment: Segment,
}

/// Bin edges used by the scorer for each metric.
///
/// Edges are the de-duplicated quantile boundaries; `n` edges describe
/// `n - 1` bins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBins {
    /// Edges over `recency_days`
    pub recency: Vec<f64>,
    /// Edges over the first-appearance frequency rank
    pub frequency_rank: Vec<f64>,
    /// Edges over `monetary`
    pub monetary: Vec<f64>,
}

/// One output row: metrics and scores for a single customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmRecord {
    pub customer_id: String,
    pub recency_days: i64,
    pub frequency: usize,
    pub monetary: Decimal,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub rfm_total: u8,
    pub segment: Segment,
}

impl RfmRecord {
    /// Join a customer's metrics with its scores
    pub fn from_parts(metrics: &CustomerMetrics, score: &CustomerScore) -> Self {
        Self {
            customer_id: metrics.customer_id.clone(),
            recency_days: metrics.recency_days,
            frequency: metrics.frequency,
            monetary: metrics.monetary,
            r_score: score.r_score,
            f_score: score.f_score,
            m_score: score.m_score,
            rfm_total: score.rfm_total,
            segment: score.segment,
        }
    }
}

/// Aggregate figures for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    /// Fraction of all customers in this segment (0-1)
    pub share: f64,
    pub mean_recency_days: f64,
    pub mean_frequency: f64,
    pub total_monetary: Decimal,
}

/// Complete segmentation result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmTable {
    /// Reference date recency was measured against
    pub snapshot_date: NaiveDate,
    /// Bin edges used for scoring
    pub bins: ScoreBins,
    records: Vec<RfmRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl RfmTable {
    pub fn new(snapshot_date: NaiveDate, bins: ScoreBins, records: Vec<RfmRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.customer_id.clone(), i))
            .collect();

        Self {
            snapshot_date,
            bins,
            records,
            index,
        }
    }

    /// All records, in customer order
    pub fn records(&self) -> &[RfmRecord] {
        &self.records
    }

    /// Look up a single customer's record
    pub fn get(&self, customer_id: &str) -> Option<&RfmRecord> {
        self.index.get(customer_id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records belonging to one segment
    pub fn in_segment(&self, segment: Segment) -> impl Iterator<Item = &RfmRecord> {
        self.records.iter().filter(move |r| r.segment == segment)
    }

    /// Per-segment totals, best segment first (empty segments included)
    pub fn segment_summary(&self) -> Vec<SegmentSummary> {
        let population = self.records.len();

        Segment::ALL
            .iter()
            .map(|&segment| {
                let members: Vec<&RfmRecord> = self.in_segment(segment).collect();
                let customers = members.len();

                let (share, mean_recency_days, mean_frequency) = if customers == 0 {
                    (0.0, 0.0, 0.0)
                } else {
                    let n = customers as f64;
                    let recency: i64 = members.iter().map(|r| r.recency_days).sum();
                    let frequency: usize = members.iter().map(|r| r.frequency).sum();
                    (
                        n / population as f64,
                        recency as f64 / n,
                        frequency as f64 / n,
                    )
                };

                SegmentSummary {
                    segment,
                    customers,
                    share,
                    mean_recency_days,
                    mean_frequency,
                    total_monetary: members.iter().map(|r| r.monetary).sum(),
                }
            })
            .collect()
    }
}
