//! Adapter for converting rfm.transaction.v1 records into transactions
//!
//! This module parses raw records from CSV, JSON array and NDJSON text and
//! turns them into validated [`Transaction`]s for the pipeline. Malformed
//! records abort the run: skipping them would shift the population-wide
//! quantile boundaries.

use crate::error::ComputeError;
use crate::schema::raw_transaction::*;
use crate::types::Transaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;

/// Supported input text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

impl FromStr for InputFormat {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            "ndjson" | "jsonl" => Ok(InputFormat::Ndjson),
            other => Err(ComputeError::ParseError(format!(
                "Unknown input format: {other}"
            ))),
        }
    }
}

/// Adapter for converting raw records to transactions
pub struct TransactionAdapter;

impl TransactionAdapter {
    /// Parse text in the given format
    pub fn parse(input: &str, format: InputFormat) -> Result<Vec<RawTransaction>, ComputeError> {
        match format {
            InputFormat::Csv => Self::parse_csv(input.as_bytes()),
            InputFormat::Json => Self::parse_array(input),
            InputFormat::Ndjson => Self::parse_ndjson(input),
        }
    }

    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<RawTransaction>, ComputeError> {
        let records: Vec<RawTransaction> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawTransaction>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawTransaction>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse CSV with a header row from any reader
    pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawTransaction>, ComputeError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (row_num, row) in csv_reader.deserialize().enumerate() {
            let row: CsvRow = row?;
            records.push(row.into_raw(row_num + 1)?);
        }
        Ok(records)
    }

    /// Convert raw records to validated transactions.
    ///
    /// Fails on the first malformed record; the index in the error is the
    /// record's zero-based position.
    pub fn to_transactions(records: &[RawTransaction]) -> Result<Vec<Transaction>, ComputeError> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .to_transaction()
                    .map_err(|e| validation_to_compute(index, e))
            })
            .collect()
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[RawTransaction]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| ValidationResult {
                index: idx,
                customer_id: record.customer_id.clone(),
                result: record.validate().err(),
            })
            .filter(|r| r.result.is_some())
            .collect()
    }
}

/// CSV row with every column kept as text.
///
/// The csv deserializer infers numbers from text, which would turn a key
/// like `009` into `9` and route amounts through `f64`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default, alias = "CustomerKey", alias = "customer_key")]
    customer_id: Option<String>,
    #[serde(default, alias = "OrderDate", alias = "Full Date")]
    order_date: Option<String>,
    #[serde(default, alias = "SalesOrderLineKey", alias = "line_key")]
    line_id: Option<String>,
    #[serde(default, alias = "Sales Amount", alias = "SalesAmount")]
    amount: Option<String>,
}

impl CsvRow {
    fn into_raw(self, row_num: usize) -> Result<RawTransaction, ComputeError> {
        let amount = match self.amount.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(parse_amount(text).ok_or_else(|| {
                ComputeError::ParseError(format!("Invalid amount on row {row_num}: {text}"))
            })?),
        };

        Ok(RawTransaction {
            customer_id: self.customer_id,
            order_date: self.order_date,
            line_id: self.line_id,
            amount,
        })
    }
}

fn parse_amount(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Attach the record position to a validation failure
fn validation_to_compute(index: usize, error: ValidationError) -> ComputeError {
    match error {
        ValidationError::MissingField { field } => ComputeError::MissingField { index, field },
        ValidationError::InvalidDate { value } => ComputeError::DateParseError { index, value },
    }
}

/// Result of record validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub customer_id: Option<String>,
    pub result: Option<ValidationError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    const SAMPLE_CSV: &str = "\
CustomerKey,OrderDate,SalesOrderLineKey,Sales Amount
11000,2024-01-01,1001,100
11000,2024-01-10,1002,50.5
11001,2024-01-05 00:00:00,1003,-20
";

    #[test]
    fn test_parse_csv_export_columns() {
        let records = TransactionAdapter::parse_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        let transactions = TransactionAdapter::to_transactions(&records).unwrap();
        assert_eq!(transactions[1].customer_id, "11000");
        assert_eq!(transactions[1].amount, Decimal::new(505, 1));
        assert_eq!(
            transactions[2].order_date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(transactions[2].amount, Decimal::from(-20));
    }

    #[test]
    fn test_parse_csv_snake_case_with_blank_field() {
        let csv = "customer_id,order_date,line_id,amount\nC1,2024-01-01,L1,\n";
        let records = TransactionAdapter::parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(records[0].amount, None);
        let result = TransactionAdapter::to_transactions(&records);
        assert!(matches!(
            result,
            Err(ComputeError::MissingField {
                index: 0,
                field: "amount"
            })
        ));
    }

    #[test]
    fn test_parse_csv_keeps_key_text() {
        let csv = "customer_id,order_date,line_id,amount\n009,2024-01-01,0001,19.999999999999999\n";
        let records = TransactionAdapter::parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(records[0].customer_id.as_deref(), Some("009"));
        assert_eq!(records[0].line_id.as_deref(), Some("0001"));
        assert_eq!(
            records[0].amount,
            Some(Decimal::from_str("19.999999999999999").unwrap())
        );
    }

    #[test]
    fn test_parse_csv_bad_amount() {
        let csv = "customer_id,order_date,line_id,amount\nC1,2024-01-01,L1,12,5\n";
        assert!(TransactionAdapter::parse_csv(csv.as_bytes()).is_err());

        let csv = "customer_id,order_date,line_id,amount\nC1,2024-01-01,L1,twelve\n";
        let err = TransactionAdapter::parse_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"
{"customer_id": "C1", "order_date": "2024-01-01", "line_id": "L1", "amount": 100}

{"customer_id": "C2", "order_date": "2024-01-05", "line_id": "L3", "amount": 500}
"#;
        let records = TransactionAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].customer_id.as_deref(), Some("C2"));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"customer_id\": \"C1\"}\nnot json\n";
        let err = TransactionAdapter::parse_ndjson(ndjson).unwrap_err();

        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"customer_id": 1, "order_date": "2024-01-01", "line_id": 10, "amount": 1.5},
            {"customer_id": 2, "order_date": "2024-01-02", "line_id": 11, "amount": 2}
        ]"#;
        let records = TransactionAdapter::parse(json, InputFormat::Json).unwrap();
        let transactions = TransactionAdapter::to_transactions(&records).unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].line_id, "10");
    }

    #[test]
    fn test_invalid_date_carries_index() {
        let records = vec![
            RawTransaction::new("C1", "2024-01-01", "L1", Decimal::ONE),
            RawTransaction::new("C1", "yesterday", "L2", Decimal::ONE),
        ];

        let result = TransactionAdapter::to_transactions(&records);
        assert!(matches!(
            result,
            Err(ComputeError::DateParseError { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_records() {
        let records = vec![
            RawTransaction::new("C1", "2024-01-01", "L1", Decimal::ONE),
            RawTransaction {
                customer_id: Some("C2".to_string()),
                ..Default::default()
            },
        ];

        let failures = TransactionAdapter::validate_records(&records);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].customer_id.as_deref(), Some("C2"));
        assert_eq!(
            failures[0].result,
            Some(ValidationError::MissingField {
                field: "order_date"
            })
        );
    }

    #[test]
    fn test_input_format_from_str() {
        assert_eq!("CSV".parse::<InputFormat>().unwrap(), InputFormat::Csv);
        assert_eq!("jsonl".parse::<InputFormat>().unwrap(), InputFormat::Ndjson);
        assert!("xml".parse::<InputFormat>().is_err());
    }
}
