//! Transaction aggregation
//!
//! This module reduces order-line transactions into one set of raw RFM
//! metrics per customer, measured against a single snapshot date derived
//! from the data itself (latest order date plus a fixed offset).

use crate::config::RfmConfig;
use crate::error::ComputeError;
use crate::types::{CustomerMetrics, Transaction};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Per-customer metrics of one run, with the snapshot they were measured at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedMetrics {
    pub snapshot_date: NaiveDate,
    /// One entry per distinct customer, in customer order
    pub metrics: Vec<CustomerMetrics>,
}

/// Aggregator for reducing transactions to customer metrics
pub struct Aggregator;

impl Aggregator {
    /// Aggregate a full transaction set
    pub fn aggregate(
        transactions: &[Transaction],
        config: &RfmConfig,
    ) -> Result<AggregatedMetrics, ComputeError> {
        config.validate()?;
        let snapshot_date = snapshot_date(transactions, config.snapshot_offset_days)?;

        let mut by_customer: BTreeMap<CustomerOrder<'_>, Accumulator<'_>> = BTreeMap::new();
        for txn in transactions {
            by_customer
                .entry(CustomerOrder::new(&txn.customer_id))
                .or_insert_with(|| Accumulator::new(txn.order_date))
                .add(txn);
        }

        let metrics = by_customer
            .into_iter()
            .map(|(customer, acc)| acc.finish(customer.id, snapshot_date))
            .collect::<Vec<_>>();

        log::debug!(
            "aggregator: {} transactions -> {} customers, snapshot {}",
            transactions.len(),
            metrics.len(),
            snapshot_date
        );

        Ok(AggregatedMetrics {
            snapshot_date,
            metrics,
        })
    }
}

/// Latest order date across all transactions plus `offset_days`
pub fn snapshot_date(
    transactions: &[Transaction],
    offset_days: i64,
) -> Result<NaiveDate, ComputeError> {
    let latest = transactions
        .iter()
        .map(|t| t.order_date)
        .max()
        .ok_or(ComputeError::EmptyInput)?;

    let offset = u64::try_from(offset_days).map_err(|_| {
        ComputeError::InvalidConfig(format!(
            "snapshot_offset_days must not be negative, got {offset_days}"
        ))
    })?;

    latest.checked_add_days(Days::new(offset)).ok_or_else(|| {
        ComputeError::InvalidConfig(format!(
            "snapshot date out of range: {latest} + {offset_days} days"
        ))
    })
}

/// Ordering key for customer identifiers.
///
/// Integer-like identifiers sort numerically ahead of all others; the rest
/// sort lexicographically. The raw identifier breaks ties so that distinct
/// spellings of the same number ("7", "007") stay distinct customers.
#[derive(Debug, PartialEq, Eq)]
struct CustomerOrder<'a> {
    numeric: Option<i64>,
    id: &'a str,
}

impl<'a> CustomerOrder<'a> {
    fn new(id: &'a str) -> Self {
        Self {
            numeric: id.trim().parse().ok(),
            id,
        }
    }
}

impl Ord for CustomerOrder<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric, other.numeric) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.id.cmp(other.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.id.cmp(other.id),
        }
    }
}

impl PartialOrd for CustomerOrder<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Running totals for one customer
struct Accumulator<'a> {
    last_order_date: NaiveDate,
    lines: HashSet<&'a str>,
    monetary: Decimal,
}

impl<'a> Accumulator<'a> {
    fn new(first_order_date: NaiveDate) -> Self {
        Self {
            last_order_date: first_order_date,
            lines: HashSet::new(),
            monetary: Decimal::ZERO,
        }
    }

    fn add(&mut self, txn: &'a Transaction) {
        self.last_order_date = self.last_order_date.max(txn.order_date);
        self.lines.insert(txn.line_id.as_str());
        self.monetary += txn.amount;
    }

    fn finish(self, customer_id: &str, snapshot_date: NaiveDate) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: customer_id.to_string(),
            last_order_date: self.last_order_date,
            recency_days: (snapshot_date - self.last_order_date).num_days(),
            frequency: self.lines.len(),
            monetary: self.monetary,
        }
    }
}
