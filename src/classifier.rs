//! Segment classification
//!
//! Maps a composite RFM score to a business segment through an ordered
//! threshold table. Rules are evaluated from the highest threshold down and
//! the first match wins; totals below every rule fall through to the
//! fallback segment.

use crate::config::{LOYAL_THRESHOLD, POTENTIAL_THRESHOLD, VIP_THRESHOLD};
use crate::error::ComputeError;
use crate::types::Segment;
use serde::{Deserialize, Serialize};

/// A single threshold rule: totals `>= min_total` map to `segment`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRule {
    pub min_total: u8,
    pub segment: Segment,
}

/// Ordered rule table (highest threshold first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRules {
    pub rules: Vec<SegmentRule>,
    /// Segment for totals below every threshold
    pub fallback: Segment,
}

impl Default for SegmentRules {
    fn default() -> Self {
        Self {
            rules: vec![
                SegmentRule {
                    min_total: VIP_THRESHOLD,
                    segment: Segment::Vip,
                },
                SegmentRule {
                    min_total: LOYAL_THRESHOLD,
                    segment: Segment::Loyal,
                },
                SegmentRule {
                    min_total: POTENTIAL_THRESHOLD,
                    segment: Segment::Potential,
                },
            ],
            fallback: Segment::AtRisk,
        }
    }
}

impl SegmentRules {
    /// Classify a composite score
    pub fn classify(&self, rfm_total: u8) -> Segment {
        self.rules
            .iter()
            .find(|rule| rfm_total >= rule.min_total)
            .map(|rule| rule.segment)
            .unwrap_or(self.fallback)
    }

    /// Thresholds must be strictly descending so that first-match is
    /// unambiguous.
    pub fn validate(&self) -> Result<(), ComputeError> {
        for pair in self.rules.windows(2) {
            if pair[0].min_total <= pair[1].min_total {
                return Err(ComputeError::InvalidConfig(format!(
                    "segment thresholds must be strictly descending: {} ({}) precedes {} ({})",
                    pair[0].min_total, pair[0].segment, pair[1].min_total, pair[1].segment
                )));
            }
        }
        Ok(())
    }
}

/// Classify with the default threshold table
pub fn classify(rfm_total: u8) -> Segment {
    SegmentRules::default().classify(rfm_total)
}
