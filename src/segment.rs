//! Bucketing continuous values into labelled segments.
//!
//! Intervals are right-inclusive: label `i` covers `(edges[i], edges[i + 1]]`.
//! Values at or below the first edge, or above the last, are unbucketed.

use crate::error::{AnalyticsError, Result};
use once_cell::sync::Lazy;

/// Discount bands used by the discount rollups. A discount of exactly 0 is
/// not bucketed.
pub static DISCOUNT_BANDS: Lazy<BinDefinition> = Lazy::new(|| {
    BinDefinition::from_sorted(
        vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 1.0],
        &["0-10%", "10-20%", "20-30%", "30-40%", "40-50%", "50%+"],
    )
});

/// Customer tiers by total sales.
pub static CUSTOMER_TIERS: Lazy<BinDefinition> = Lazy::new(|| {
    BinDefinition::from_sorted(
        vec![0.0, 1000.0, 5000.0, 10000.0, f64::INFINITY],
        &["Bronze", "Silver", "Gold", "Platinum"],
    )
});

#[derive(Debug, Clone, PartialEq)]
pub struct BinDefinition {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl BinDefinition {
    /// Build a definition from `n + 1` strictly increasing edges and `n` labels.
    pub fn new<S: Into<String>>(edges: Vec<f64>, labels: Vec<S>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(AnalyticsError::InvalidBins(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if labels.len() != edges.len() - 1 {
            return Err(AnalyticsError::InvalidBins(format!(
                "{} edges need {} labels, got {}",
                edges.len(),
                edges.len() - 1,
                labels.len()
            )));
        }
        if edges.iter().any(|e| e.is_nan()) {
            return Err(AnalyticsError::InvalidBins("edges contain NaN".to_string()));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalyticsError::InvalidBins(
                "edges must be strictly increasing".to_string(),
            ));
        }
        Ok(BinDefinition {
            edges,
            labels: labels.into_iter().map(Into::into).collect(),
        })
    }

    fn from_sorted(edges: Vec<f64>, labels: &[&str]) -> Self {
        debug_assert!(edges.windows(2).all(|w| w[0] < w[1]));
        debug_assert_eq!(labels.len() + 1, edges.len());
        BinDefinition {
            edges,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of the interval containing `value`.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        let first = self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        // The negated comparison also rejects NaN.
        if !(value > first) || value > last {
            return None;
        }
        Some(self.edges[1..].partition_point(|e| *e < value))
    }

    /// Label of the interval containing `value`, if any.
    pub fn assign(&self, value: f64) -> Option<&str> {
        self.index_of(value).map(|i| self.labels[i].as_str())
    }

    /// Count values per label, in label order. An `undefined` entry is
    /// appended only when some value fell outside every interval.
    pub fn distribution<I>(&self, values: I) -> Vec<(Option<String>, usize)>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0usize; self.labels.len()];
        let mut unbucketed = 0usize;
        for v in values {
            match self.index_of(v) {
                Some(i) => counts[i] += 1,
                None => unbucketed += 1,
            }
        }
        let mut out: Vec<(Option<String>, usize)> = self
            .labels
            .iter()
            .cloned()
            .map(Some)
            .zip(counts)
            .collect();
        if unbucketed > 0 {
            out.push((None, unbucketed));
        }
        out
    }
}
