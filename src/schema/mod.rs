//! Unified rfm.transaction.v1 schema
//!
//! This module defines the input record schema for sales transactions and
//! the adapter that parses CSV, JSON and NDJSON exports into validated
//! transactions.

mod adapter;
mod raw_transaction;

pub use adapter::*;
pub use raw_transaction::*;
