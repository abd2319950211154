//! Analysis configuration
//!
//! Every tunable of an analysis run lives here. Defaults reproduce the
//! classic quintile RFM model; tests and callers may override any of them.

use crate::classifier::SegmentRules;
use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of quantile bins (and the top of the score scale)
pub const DEFAULT_BIN_COUNT: usize = 5;

/// Largest bin count that keeps scores inside the 1-5 scale
pub const MAX_BIN_COUNT: usize = 5;

/// Minimum composite score for the VIP segment
pub const VIP_THRESHOLD: u8 = 12;

/// Minimum composite score for the Loyal segment
pub const LOYAL_THRESHOLD: u8 = 9;

/// Minimum composite score for the Potential segment
pub const POTENTIAL_THRESHOLD: u8 = 5;

/// Days added to the latest order date to obtain the snapshot date
pub const DEFAULT_SNAPSHOT_OFFSET_DAYS: i64 = 1;

/// Configuration for an analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfmConfig {
    /// Quantile bins per metric
    pub bin_count: usize,
    /// Snapshot offset past the latest order date (days)
    pub snapshot_offset_days: i64,
    /// Ordered segment thresholds
    pub segments: SegmentRules,
}

impl Default for RfmConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            snapshot_offset_days: DEFAULT_SNAPSHOT_OFFSET_DAYS,
            segments: SegmentRules::default(),
        }
    }
}

impl RfmConfig {
    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: RfmConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Save configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.bin_count == 0 || self.bin_count > MAX_BIN_COUNT {
            return Err(ComputeError::InvalidConfig(format!(
                "bin_count must be between 1 and {}, got {}",
                MAX_BIN_COUNT, self.bin_count
            )));
        }

        if self.snapshot_offset_days < 0 {
            return Err(ComputeError::InvalidConfig(format!(
                "snapshot_offset_days must not be negative, got {}",
                self.snapshot_offset_days
            )));
        }

        self.segments.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = RfmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bin_count, 5);
        assert_eq!(config.snapshot_offset_days, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RfmConfig::from_json(r#"{"snapshot_offset_days": 0}"#).unwrap();

        assert_eq!(config.snapshot_offset_days, 0);
        assert_eq!(config.bin_count, DEFAULT_BIN_COUNT);
        assert_eq!(config.segments, SegmentRules::default());
    }

    #[test]
    fn test_config_round_trip() {
        let config = RfmConfig::default();
        let json = config.to_json().unwrap();
        let loaded = RfmConfig::from_json(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_out_of_range_bin_count() {
        let result = RfmConfig::from_json(r#"{"bin_count": 10}"#);
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));

        let result = RfmConfig::from_json(r#"{"bin_count": 0}"#);
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_negative_offset() {
        let result = RfmConfig::from_json(r#"{"snapshot_offset_days": -1}"#);
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_custom_thresholds() {
        let json = r#"{
            "segments": {
                "rules": [
                    {"min_total": 14, "segment": "VIP"},
                    {"min_total": 10, "segment": "Loyal"},
                    {"min_total": 6, "segment": "Potential"}
                ],
                "fallback": "At-risk / churned"
            }
        }"#;
        let config = RfmConfig::from_json(json).unwrap();

        assert_eq!(config.segments.classify(13), Segment::Loyal);
        assert_eq!(config.segments.classify(5), Segment::AtRisk);
    }
}
