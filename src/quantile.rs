//! Quantile binning
//!
//! Equal-population binning over a whole population. Boundaries are the
//! `0, 1/n, ..., 1` quantiles computed with linear interpolation between
//! sorted values. When the distribution has too few distinct values,
//! neighbouring boundaries coincide; duplicates are dropped and values are
//! binned over however many bins remain.

/// Fitted quantile bins
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBins {
    edges: Vec<f64>,
}

impl QuantileBins {
    /// Fit `bins` equal-population bins to `values`.
    ///
    /// Returns `None` for an empty population or a zero bin count.
    pub fn fit(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() || bins == 0 {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut edges: Vec<f64> = (0..=bins)
            .map(|i| quantile_sorted(&sorted, i as f64 / bins as f64))
            .collect();
        edges.dedup();

        Some(Self { edges })
    }

    /// De-duplicated bin edges
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins remaining after duplicate edges were dropped (at least 1)
    pub fn bin_count(&self) -> usize {
        self.edges.len().saturating_sub(1).max(1)
    }

    /// Zero-based bin of `value`.
    ///
    /// Bins are right-closed `(e[i], e[i+1]]`; the first bin also includes
    /// its lower edge. Values outside the fitted range are clamped to the
    /// first or last bin.
    pub fn bin_index(&self, value: f64) -> usize {
        let upper = &self.edges[1.min(self.edges.len() - 1)..];
        let idx = upper.partition_point(|&edge| edge < value);
        idx.min(self.bin_count() - 1)
    }
}

/// Linear-interpolated quantile of already sorted values (`q` in `[0, 1]`)
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let pos = q * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;

    if lo == hi {
        return sorted[lo.min(last)];
    }

    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// First-method ranking: ascending by value, ties broken by position.
///
/// Every element receives a distinct 1-based rank.
pub fn rank_first<T: PartialOrd>(values: &[T]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // stable sort keeps equal values in input order
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0; values.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = rank + 1;
    }
    ranks
}
