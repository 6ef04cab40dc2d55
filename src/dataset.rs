//! Immutable handle over one analysis run's enriched records.

use crate::error::{AnalyticsError, Result};
use crate::features::enrich_all;
use crate::loader::{self, NormalizationReport, NormalizeOptions};
use crate::types::{EnrichedRecord, Filter, SalesRecord};
use chrono::NaiveDate;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Enriched records plus the report of the pass that produced them.
///
/// Cloning is cheap and never copies records; every engine call takes the
/// dataset by reference and leaves it untouched.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[EnrichedRecord]>,
    report: NormalizationReport,
}

impl Dataset {
    pub fn load<P: AsRef<Path>>(path: P, opts: NormalizeOptions) -> Result<Self> {
        let (records, report) = loader::load_and_clean(path, opts)?;
        Ok(Self::from_records(records, report))
    }

    pub fn from_reader<R: Read>(reader: R, opts: NormalizeOptions) -> Result<Self> {
        let (records, report) = loader::load_from_reader(reader, opts)?;
        Ok(Self::from_records(records, report))
    }

    pub fn from_records(records: Vec<SalesRecord>, report: NormalizationReport) -> Self {
        Dataset {
            records: enrich_all(records).into(),
            report,
        }
    }

    /// Build from records that are already valid, e.g. in tests or when the
    /// caller did its own parsing.
    pub fn from_sales(records: Vec<SalesRecord>) -> Self {
        let report = NormalizationReport {
            total_rows: records.len(),
            kept_rows: records.len(),
            ..NormalizationReport::default()
        };
        Self::from_records(records, report)
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn report(&self) -> &NormalizationReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A new dataset holding only the records that pass `filter`.
    pub fn filter(&self, filter: &Filter) -> Result<Dataset> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(AnalyticsError::InvalidFilter(format!(
                    "start {start} is after end {end}"
                )));
            }
        }
        if filter.is_empty() {
            return Ok(self.clone());
        }
        let kept: Vec<EnrichedRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        info!(before = self.len(), after = kept.len(), "applied filter");
        Ok(Dataset {
            records: kept.into(),
            report: self.report.clone(),
        })
    }

    /// Earliest and latest order dates present.
    pub fn order_date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.record.order_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}
