//! rfm.transaction.v1 record definition
//!
//! A loosely-typed transaction record as it arrives from an export: every
//! field optional, identifiers accepted as strings or integers, dates as
//! text. Validation turns it into a strict [`Transaction`] or reports which
//! field is missing.

use crate::types::Transaction;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current schema version
pub const SCHEMA_VERSION: &str = "rfm.transaction.v1";

/// Date-time layouts accepted for `order_date` besides a plain date
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Raw transaction record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Customer identifier
    #[serde(
        default,
        alias = "CustomerKey",
        alias = "customer_key",
        deserialize_with = "deserialize_opt_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_id: Option<String>,
    /// Order date (YYYY-MM-DD, optionally with a time component)
    #[serde(
        default,
        alias = "OrderDate",
        alias = "Full Date",
        skip_serializing_if = "Option::is_none"
    )]
    pub order_date: Option<String>,
    /// Order line identifier
    #[serde(
        default,
        alias = "SalesOrderLineKey",
        alias = "line_key",
        deserialize_with = "deserialize_opt_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_id: Option<String>,
    /// Line amount (signed)
    #[serde(
        default,
        alias = "Sales Amount",
        alias = "SalesAmount",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
}

impl RawTransaction {
    pub fn new(
        customer_id: impl Into<String>,
        order_date: impl Into<String>,
        line_id: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        RawTransaction {
            customer_id: Some(customer_id.into()),
            order_date: Some(order_date.into()),
            line_id: Some(line_id.into()),
            amount: Some(amount),
        }
    }

    /// Validate the record
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.to_transaction().map(|_| ())
    }

    /// Convert into a strict transaction
    pub fn to_transaction(&self) -> Result<Transaction, ValidationError> {
        let customer_id = required_text(&self.customer_id, "customer_id")?;
        let raw_date = required_text(&self.order_date, "order_date")?;
        let line_id = required_text(&self.line_id, "line_id")?;
        let amount = self
            .amount
            .ok_or(ValidationError::MissingField { field: "amount" })?;

        let order_date = parse_order_date(raw_date).ok_or_else(|| ValidationError::InvalidDate {
            value: raw_date.to_string(),
        })?;

        Ok(Transaction::new(customer_id, order_date, line_id, amount))
    }
}

/// Blank strings count as missing
fn required_text<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ValidationError::MissingField { field }),
    }
}

/// Parse a calendar date, dropping any time component
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Validation errors for raw records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid order date: {value}")]
    InvalidDate { value: String },
}

/// Identifier that may arrive as text or as a number
struct Key(String);

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = Key;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer identifier")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Key, E> {
                Ok(Key(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Key, E> {
                Ok(Key(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Key, E> {
                Ok(Key(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Key, E> {
                Ok(Key(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Key, E> {
                // spreadsheet exports store integer keys as floats
                if v.fract() == 0.0 && v.abs() < 9.0e15 {
                    Ok(Key((v as i64).to_string()))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

fn deserialize_opt_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Key>::deserialize(deserializer)?.map(|k| k.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deserialize_snake_case() {
        let json = r#"{
            "customer_id": "C1",
            "order_date": "2024-01-10",
            "line_id": "L2",
            "amount": "50.25"
        }"#;

        let raw: RawTransaction = serde_json::from_str(json).unwrap();
        let txn = raw.to_transaction().unwrap();

        assert_eq!(txn.customer_id, "C1");
        assert_eq!(txn.order_date, date(2024, 1, 10));
        assert_eq!(txn.line_id, "L2");
        assert_eq!(txn.amount, Decimal::new(5025, 2));
    }

    #[test]
    fn test_deserialize_export_columns() {
        let json = r#"{
            "CustomerKey": 11000,
            "OrderDate": "2019-07-22 00:00:00",
            "SalesOrderLineKey": 43697001,
            "Sales Amount": 3578.27
        }"#;

        let raw: RawTransaction = serde_json::from_str(json).unwrap();
        let txn = raw.to_transaction().unwrap();

        assert_eq!(txn.customer_id, "11000");
        assert_eq!(txn.order_date, date(2019, 7, 22));
        assert_eq!(txn.line_id, "43697001");
        assert_eq!(txn.amount, Decimal::new(357827, 2));
    }

    #[test]
    fn test_missing_field() {
        let json = r#"{"customer_id": "C1", "order_date": "2024-01-10", "amount": 5}"#;
        let raw: RawTransaction = serde_json::from_str(json).unwrap();

        assert_eq!(
            raw.validate(),
            Err(ValidationError::MissingField { field: "line_id" })
        );
    }

    #[test]
    fn test_blank_identifier_is_missing() {
        let raw = RawTransaction::new("  ", "2024-01-10", "L1", Decimal::ONE);

        assert_eq!(
            raw.validate(),
            Err(ValidationError::MissingField {
                field: "customer_id"
            })
        );
    }

    #[test]
    fn test_invalid_date() {
        let raw = RawTransaction::new("C1", "10/01/2024", "L1", Decimal::ONE);

        assert!(matches!(
            raw.validate(),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_parse_order_date_formats() {
        let expected = Some(date(2024, 1, 10));

        assert_eq!(parse_order_date("2024-01-10"), expected);
        assert_eq!(parse_order_date("2024-01-10 13:45:00"), expected);
        assert_eq!(parse_order_date("2024-01-10T13:45:00.250"), expected);
        assert_eq!(parse_order_date("2024-01-10T13:45:00+09:00"), expected);
        assert_eq!(parse_order_date("not a date"), None);
    }

    #[test]
    fn test_fractional_key_rejected() {
        let json = r#"{"customer_id": 1.5}"#;
        assert!(serde_json::from_str::<RawTransaction>(json).is_err());
    }
}
