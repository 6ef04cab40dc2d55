//! Top-N / bottom-N selection over aggregation results.
//!
//! A [`Selection`] borrows an [`AggregationResult`] and narrows it without
//! copying or mutating anything. Groups whose metric is undefined never
//! take part in a ranking or pass a filter.

use crate::aggregate::{AggregationResult, GroupKey, GroupRow};
use crate::error::{AnalyticsError, Result};
use std::cmp::Ordering;

/// A group picked by a ranking, with the value it was ranked on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedGroup<'a> {
    pub key: &'a GroupKey,
    pub row: &'a GroupRow,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct Selection<'a> {
    result: &'a AggregationResult,
    groups: Vec<(&'a GroupKey, &'a GroupRow)>,
}

/// Start a selection covering every group of `result`.
pub fn select(result: &AggregationResult) -> Selection<'_> {
    Selection {
        result,
        groups: result.iter().collect(),
    }
}

/// The `n` groups with the greatest `column` value.
pub fn top<'a>(
    result: &'a AggregationResult,
    column: &str,
    n: usize,
) -> Result<Vec<RankedGroup<'a>>> {
    select(result).top(column, n)
}

/// The `n` groups with the smallest `column` value.
pub fn bottom<'a>(
    result: &'a AggregationResult,
    column: &str,
    n: usize,
) -> Result<Vec<RankedGroup<'a>>> {
    select(result).bottom(column, n)
}

/// Groups whose defined `column` value satisfies `predicate`.
pub fn filter<'a, F>(
    result: &'a AggregationResult,
    column: &str,
    predicate: F,
) -> Result<Selection<'a>>
where
    F: Fn(f64) -> bool,
{
    select(result).filter(column, predicate)
}

impl<'a> Selection<'a> {
    fn column(&self, column: &str) -> Result<usize> {
        self.result
            .column_index(column)
            .ok_or_else(|| AnalyticsError::UnknownColumn(column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Selected keys in ascending order.
    pub fn keys(&self) -> Vec<&'a GroupKey> {
        self.groups.iter().map(|(k, _)| *k).collect()
    }

    pub fn filter<F>(self, column: &str, predicate: F) -> Result<Self>
    where
        F: Fn(f64) -> bool,
    {
        let idx = self.column(column)?;
        let groups = self
            .groups
            .into_iter()
            .filter(|(_, row)| row.values[idx].value().is_some_and(&predicate))
            .collect();
        Ok(Selection {
            result: self.result,
            groups,
        })
    }

    /// Greatest values first; ties go to the smaller group key.
    pub fn top(&self, column: &str, n: usize) -> Result<Vec<RankedGroup<'a>>> {
        self.ranked(column, n, |a, b| b.total_cmp(&a))
    }

    /// Smallest values first; ties go to the smaller group key.
    pub fn bottom(&self, column: &str, n: usize) -> Result<Vec<RankedGroup<'a>>> {
        self.ranked(column, n, |a, b| a.total_cmp(&b))
    }

    fn ranked(
        &self,
        column: &str,
        n: usize,
        order: impl Fn(f64, f64) -> Ordering,
    ) -> Result<Vec<RankedGroup<'a>>> {
        let idx = self.column(column)?;
        let mut ranked: Vec<RankedGroup<'a>> = self
            .groups
            .iter()
            .filter_map(|(key, row)| {
                row.values[idx].value().map(|value| RankedGroup {
                    key: *key,
                    row: *row,
                    value,
                })
            })
            .collect();
        ranked.sort_by(|a, b| order(a.value, b.value).then_with(|| a.key.cmp(b.key)));
        ranked.truncate(n);
        Ok(ranked)
    }

    /// Copy the selected groups into a standalone result.
    pub fn to_result(&self) -> AggregationResult {
        AggregationResult::from_rows(
            self.result.dimensions().to_vec(),
            self.result.columns().to_vec(),
            self.groups
                .iter()
                .map(|(k, row)| ((*k).clone(), (*row).clone()))
                .collect(),
        )
    }
}
