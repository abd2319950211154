//! Quantile scoring
//!
//! This module converts raw per-customer metrics into 1-5 ordinal scores.
//! Boundaries are computed across the whole population, so the scorer takes
//! every customer of a run at once and returns a parallel collection.
//! - Recency: lower is better, scores descend across bins
//! - Frequency: ranked first (ties broken by customer order), then binned
//! - Monetary: higher is better, scores ascend across bins

use crate::classifier::SegmentRules;
use crate::config::RfmConfig;
use crate::error::ComputeError;
use crate::quantile::{rank_first, QuantileBins};
use crate::types::{CustomerMetrics, CustomerScore, ScoreBins};
use rust_decimal::prelude::ToPrimitive;

/// Direction in which bin order maps to scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// First bin scores 1
    Ascending,
    /// First bin scores highest
    Descending,
}

/// Scores for a whole population plus the bins that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPopulation {
    /// One score per input metric, same order
    pub scores: Vec<CustomerScore>,
    pub bins: ScoreBins,
}

/// Scorer for turning population metrics into ordinal scores
pub struct Scorer;

impl Scorer {
    /// Score every customer of a run.
    ///
    /// `metrics` must hold the entire population in customer order; the
    /// frequency tie-break depends on that order. The configuration is
    /// validated first, so scores never leave the 1-5 scale.
    pub fn score(
        metrics: &[CustomerMetrics],
        config: &RfmConfig,
    ) -> Result<ScoredPopulation, ComputeError> {
        config.validate()?;

        if metrics.len() < 2 {
            return Err(ComputeError::InsufficientData {
                customers: metrics.len(),
            });
        }

        let recency: Vec<f64> = metrics.iter().map(|m| m.recency_days as f64).collect();
        let frequency_rank: Vec<f64> = rank_first(
            &metrics.iter().map(|m| m.frequency).collect::<Vec<_>>(),
        )
        .into_iter()
        .map(|rank| rank as f64)
        .collect();
        let monetary: Vec<f64> = metrics
            .iter()
            .map(|m| m.monetary.to_f64().unwrap_or(0.0))
            .collect();

        let (r_scores, r_bins) =
            score_metric("recency", &recency, config.bin_count, ScoreOrder::Descending)?;
        let (f_scores, f_bins) = score_metric(
            "frequency",
            &frequency_rank,
            config.bin_count,
            ScoreOrder::Ascending,
        )?;
        let (m_scores, m_bins) =
            score_metric("monetary", &monetary, config.bin_count, ScoreOrder::Ascending)?;

        let scores = metrics
            .iter()
            .enumerate()
            .map(|(i, m)| {
                build_score(
                    &m.customer_id,
                    r_scores[i],
                    f_scores[i],
                    m_scores[i],
                    &config.segments,
                )
            })
            .collect();

        Ok(ScoredPopulation {
            scores,
            bins: ScoreBins {
                recency: r_bins.edges().to_vec(),
                frequency_rank: f_bins.edges().to_vec(),
                monetary: m_bins.edges().to_vec(),
            },
        })
    }
}

/// Bin one metric and map bins to scores
fn score_metric(
    name: &str,
    values: &[f64],
    bin_count: usize,
    order: ScoreOrder,
) -> Result<(Vec<u8>, QuantileBins), ComputeError> {
    let bins = QuantileBins::fit(values, bin_count).ok_or_else(|| {
        ComputeError::InvalidConfig(format!("cannot fit {bin_count} bins for {name}"))
    })?;

    if bins.bin_count() < bin_count {
        log::debug!(
            "scorer: {name} collapsed to {} of {bin_count} bins (edges {:?})",
            bins.bin_count(),
            bins.edges()
        );
    }

    let levels = bins.bin_count();
    let scores = values
        .iter()
        .map(|&v| bin_to_score(bins.bin_index(v), levels, order))
        .collect();

    Ok((scores, bins))
}

/// Map a zero-based bin to a 1-based score over `levels` bins
fn bin_to_score(bin: usize, levels: usize, order: ScoreOrder) -> u8 {
    let score = match order {
        ScoreOrder::Ascending => bin + 1,
        ScoreOrder::Descending => levels - bin,
    };
    score as u8
}

fn build_score(
    customer_id: &str,
    r_score: u8,
    f_score: u8,
    m_score: u8,
    rules: &SegmentRules,
) -> CustomerScore {
    let rfm_total = r_score + f_score + m_score;
    CustomerScore {
        customer_id: customer_id.to_string(),
        r_score,
        f_score,
        m_score,
        rfm_total,
        segment: rules.classify(rfm_total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn metrics(id: &str, recency: i64, frequency: usize, monetary: i64) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.to_string(),
            last_order_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            recency_days: recency,
            frequency,
            monetary: Decimal::from(monetary),
        }
    }

    fn population() -> Vec<CustomerMetrics> {
        (1..=10)
            .map(|i| metrics(&i.to_string(), i * 10, i as usize, i * 100))
            .collect()
    }

    #[test]
    fn test_scores_in_range() {
        let scored = Scorer::score(&population(), &RfmConfig::default()).unwrap();

        assert_eq!(scored.scores.len(), 10);
        for s in &scored.scores {
            for v in [s.r_score, s.f_score, s.m_score] {
                assert!((1..=5).contains(&v));
            }
            assert_eq!(s.rfm_total, s.r_score + s.f_score + s.m_score);
            assert!((3..=15).contains(&s.rfm_total));
        }
    }

    #[test]
    fn test_recency_is_inverted() {
        let scored = Scorer::score(&population(), &RfmConfig::default()).unwrap();

        let r: Vec<u8> = scored.scores.iter().map(|s| s.r_score).collect();
        assert_eq!(r, vec![5, 5, 4, 4, 3, 3, 2, 2, 1, 1]);

        let m: Vec<u8> = scored.scores.iter().map(|s| s.m_score).collect();
        assert_eq!(m, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
    }

    #[test]
    fn test_monotonicity() {
        let pop = population();
        let scored = Scorer::score(&pop, &RfmConfig::default()).unwrap();

        for i in 0..pop.len() {
            for j in 0..pop.len() {
                let (a, b) = (&scored.scores[i], &scored.scores[j]);
                if pop[i].recency_days < pop[j].recency_days {
                    assert!(a.r_score >= b.r_score);
                }
                if pop[i].frequency > pop[j].frequency {
                    assert!(a.f_score >= b.f_score);
                }
                if pop[i].monetary > pop[j].monetary {
                    assert!(a.m_score >= b.m_score);
                }
            }
        }
    }

    #[test]
    fn test_all_frequency_one_does_not_error() {
        let pop: Vec<CustomerMetrics> = (1..=7)
            .map(|i| metrics(&i.to_string(), 5, 1, 100))
            .collect();

        let scored = Scorer::score(&pop, &RfmConfig::default()).unwrap();

        // ranks are unique, so frequency still spreads over the full scale
        let f: Vec<u8> = scored.scores.iter().map(|s| s.f_score).collect();
        assert_eq!(f, vec![1, 1, 2, 3, 4, 5, 5]);

        // identical recency and monetary collapse to a single level
        assert_eq!(scored.bins.recency.len(), 1);
        for s in &scored.scores {
            assert_eq!(s.r_score, 1);
            assert_eq!(s.m_score, 1);
        }
    }

    #[test]
    fn test_collapsed_bins_stay_in_range() {
        let mut pop: Vec<CustomerMetrics> = (1..=8)
            .map(|i| metrics(&i.to_string(), 3, 1, 10))
            .collect();
        pop.push(metrics("9", 40, 2, 20));
        pop.push(metrics("10", 90, 5, 500));

        let scored = Scorer::score(&pop, &RfmConfig::default()).unwrap();

        assert!(scored.bins.recency.len() < 6);
        let last = &scored.scores[9];
        assert_eq!(last.r_score, 1);
        assert_eq!(last.m_score, 2);
        assert_eq!(scored.scores[0].r_score, 2);
    }

    #[test]
    fn test_insufficient_data() {
        let result = Scorer::score(&[metrics("1", 1, 1, 1)], &RfmConfig::default());
        assert!(matches!(
            result,
            Err(ComputeError::InsufficientData { customers: 1 })
        ));

        let result = Scorer::score(&[], &RfmConfig::default());
        assert!(matches!(
            result,
            Err(ComputeError::InsufficientData { customers: 0 })
        ));
    }

    #[test]
    fn test_segments_follow_totals() {
        let scored = Scorer::score(&population(), &RfmConfig::default()).unwrap();

        // customer 1: most recent, least frequent, lowest spend -> 5 + 1 + 1
        assert_eq!(scored.scores[0].rfm_total, 7);
        assert_eq!(scored.scores[0].segment, Segment::Potential);
    }

    #[test]
    fn test_unvalidated_bin_count_rejected() {
        let pop: Vec<CustomerMetrics> = (1..=20)
            .map(|i| metrics(&i.to_string(), i, i as usize, i * 10))
            .collect();

        for bin_count in [0, 10, 200] {
            let config = RfmConfig {
                bin_count,
                ..Default::default()
            };
            assert!(matches!(
                Scorer::score(&pop, &config),
                Err(ComputeError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_bin_to_score() {
        assert_eq!(bin_to_score(0, 5, ScoreOrder::Ascending), 1);
        assert_eq!(bin_to_score(4, 5, ScoreOrder::Ascending), 5);
        assert_eq!(bin_to_score(0, 5, ScoreOrder::Descending), 5);
        assert_eq!(bin_to_score(1, 2, ScoreOrder::Descending), 1);
    }
}
