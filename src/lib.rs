//! Sales analytics over a flat transactional dataset.
//!
//! Raw rows are normalized into [`SalesRecord`]s, enriched with derived
//! fields, then grouped, segmented and summarized. Every stage is a pure
//! computation over an immutable [`Dataset`]; zero-denominator ratios are
//! carried as [`Metric::Undefined`] rather than NaN or zero.

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod kpi;
pub mod loader;
pub mod metric;
pub mod output;
pub mod rank;
pub mod reports;
pub mod segment;
pub mod stats;
pub mod types;
pub mod util;

pub use aggregate::{
    aggregate, aggregate_records, AggregationResult, AggregationSpec, Dimension, GroupKey, GroupRow,
    KeyValue, Measure, Reducer,
};
pub use dataset::Dataset;
pub use error::{AnalyticsError, Result};
pub use kpi::KpiSummary;
pub use loader::{NormalizationReport, NormalizeOptions};
pub use metric::Metric;
pub use rank::{bottom, filter, select, top, RankedGroup, Selection};
pub use segment::{BinDefinition, CUSTOMER_TIERS, DISCOUNT_BANDS};
pub use types::{EnrichedRecord, Filter, SalesRecord};
