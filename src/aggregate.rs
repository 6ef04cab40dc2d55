//! Grouped aggregation driven by declarative specs.
//!
//! An [`AggregationSpec`] names the grouping dimensions, the primary
//! reductions and any secondary ratios computed from the reduced values.
//! [`aggregate`] partitions the records by key, reduces each group over its
//! well-defined values only, then evaluates the ratios.

use crate::dataset::Dataset;
use crate::error::{AnalyticsError, Result};
use crate::metric::Metric;
use crate::segment::DISCOUNT_BANDS;
use crate::types::EnrichedRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

/// Categorical fields records can be grouped or distinct-counted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Dimension {
    OrderId,
    CustomerName,
    ProductName,
    Category,
    SubCategory,
    Region,
    State,
    ShipMode,
    OrderDate,
    OrderYear,
    OrderMonth,
    OrderQuarter,
    Weekday,
    DiscountBand,
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::OrderId => "Order ID",
            Dimension::CustomerName => "Customer Name",
            Dimension::ProductName => "Product Name",
            Dimension::Category => "Category",
            Dimension::SubCategory => "Sub-Category",
            Dimension::Region => "Region",
            Dimension::State => "State",
            Dimension::ShipMode => "Ship Mode",
            Dimension::OrderDate => "Order Date",
            Dimension::OrderYear => "Order Year",
            Dimension::OrderMonth => "Order Month",
            Dimension::OrderQuarter => "Order Quarter",
            Dimension::Weekday => "Order Day of Week",
            Dimension::DiscountBand => "Discount_Bin",
        }
    }

    /// This dimension's value for one record.
    pub fn key_of(&self, r: &EnrichedRecord) -> KeyValue {
        let rec = &r.record;
        match self {
            Dimension::OrderId => KeyValue::Text(rec.order_id.clone()),
            Dimension::CustomerName => KeyValue::Text(rec.customer_name.clone()),
            Dimension::ProductName => KeyValue::Text(rec.product_name.clone()),
            Dimension::Category => KeyValue::Text(rec.category.clone()),
            Dimension::SubCategory => KeyValue::Text(rec.sub_category.clone()),
            Dimension::Region => KeyValue::Text(rec.region.clone()),
            Dimension::State => KeyValue::Text(rec.state.clone()),
            Dimension::ShipMode => KeyValue::Text(rec.ship_mode.clone()),
            Dimension::OrderDate => rec
                .order_date
                .map_or(KeyValue::Undefined, |d| KeyValue::Text(d.to_string())),
            Dimension::OrderYear => r
                .calendar
                .map_or(KeyValue::Undefined, |c| KeyValue::Int(i64::from(c.year))),
            Dimension::OrderMonth => r
                .calendar
                .map_or(KeyValue::Undefined, |c| KeyValue::Int(i64::from(c.month))),
            Dimension::OrderQuarter => r
                .calendar
                .map_or(KeyValue::Undefined, |c| KeyValue::Int(i64::from(c.quarter))),
            Dimension::Weekday => r
                .calendar
                .map_or(KeyValue::Undefined, |c| KeyValue::Text(c.weekday_name().to_string())),
            Dimension::DiscountBand => DISCOUNT_BANDS
                .assign(rec.discount)
                .map_or(KeyValue::Undefined, |l| KeyValue::Text(l.to_string())),
        }
    }
}

/// One component of a group key. Undefined values group together and sort
/// after every defined value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
    Undefined,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Text(s) => f.write_str(s),
            KeyValue::Undefined => f.write_str("undefined"),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

/// Tuple of dimension values identifying a group. Empty for an ungrouped
/// aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey(pub Vec<KeyValue>);

impl GroupKey {
    pub fn of(dimensions: &[Dimension], r: &EnrichedRecord) -> Self {
        GroupKey(dimensions.iter().map(|d| d.key_of(r)).collect())
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(all)");
        }
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// Numeric fields, raw or derived, that reducers operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Measure {
    Sales,
    Quantity,
    Discount,
    Profit,
    ShippingCost,
    ProfitMargin,
    ShippingDays,
    RevenuePerUnit,
    ProfitPerUnit,
}

impl Measure {
    pub fn name(&self) -> &'static str {
        match self {
            Measure::Sales => "Sales",
            Measure::Quantity => "Quantity",
            Measure::Discount => "Discount",
            Measure::Profit => "Profit",
            Measure::ShippingCost => "Shipping Cost",
            Measure::ProfitMargin => "Profit Margin",
            Measure::ShippingDays => "Shipping Days",
            Measure::RevenuePerUnit => "Revenue per Unit",
            Measure::ProfitPerUnit => "Profit per Unit",
        }
    }

    pub fn value(&self, r: &EnrichedRecord) -> Metric {
        let rec = &r.record;
        match self {
            Measure::Sales => Metric::Value(rec.sales),
            Measure::Quantity => Metric::Value(f64::from(rec.quantity)),
            Measure::Discount => Metric::Value(rec.discount),
            Measure::Profit => Metric::Value(rec.profit),
            Measure::ShippingCost => Metric::Value(rec.shipping_cost),
            Measure::ProfitMargin => r.profit_margin,
            Measure::ShippingDays => r
                .shipping_days
                .map_or(Metric::Undefined, |d| Metric::Value(d as f64)),
            Measure::RevenuePerUnit => r.revenue_per_unit,
            Measure::ProfitPerUnit => r.profit_per_unit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reducer {
    Sum(Measure),
    Mean(Measure),
    /// Number of well-defined values.
    Count(Measure),
    /// Number of distinct defined values of a categorical field.
    CountDistinct(Dimension),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reduction {
    pub name: String,
    pub reducer: Reducer,
}

/// `numerator / denominator * scale`, evaluated on a group's reduced values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ratio {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AggregationSpec {
    pub group_by: Vec<Dimension>,
    pub reductions: Vec<Reduction>,
    pub ratios: Vec<Ratio>,
}

impl AggregationSpec {
    pub fn by<I: IntoIterator<Item = Dimension>>(group_by: I) -> Self {
        AggregationSpec {
            group_by: group_by.into_iter().collect(),
            ..AggregationSpec::default()
        }
    }

    /// A spec with no key: every record lands in one group.
    pub fn ungrouped() -> Self {
        AggregationSpec::default()
    }

    fn reduce(mut self, name: &str, reducer: Reducer) -> Self {
        self.reductions.push(Reduction {
            name: name.to_string(),
            reducer,
        });
        self
    }

    pub fn sum(self, name: &str, measure: Measure) -> Self {
        self.reduce(name, Reducer::Sum(measure))
    }

    pub fn mean(self, name: &str, measure: Measure) -> Self {
        self.reduce(name, Reducer::Mean(measure))
    }

    pub fn count(self, name: &str, measure: Measure) -> Self {
        self.reduce(name, Reducer::Count(measure))
    }

    pub fn count_distinct(self, name: &str, dimension: Dimension) -> Self {
        self.reduce(name, Reducer::CountDistinct(dimension))
    }

    pub fn ratio(mut self, name: &str, numerator: &str, denominator: &str, scale: f64) -> Self {
        self.ratios.push(Ratio {
            name: name.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
            scale,
        });
        self
    }

    /// Output column names: reductions first, then ratios.
    pub fn columns(&self) -> Vec<String> {
        self.reductions
            .iter()
            .map(|r| r.name.clone())
            .chain(self.ratios.iter().map(|r| r.name.clone()))
            .collect()
    }

    /// Resolve each ratio to `(numerator, denominator)` reduction indices.
    fn resolve_ratios(&self) -> Result<Vec<(usize, usize)>> {
        let mut seen = HashSet::new();
        for name in self.columns() {
            if !seen.insert(name.clone()) {
                return Err(AnalyticsError::DuplicateColumn(name));
            }
        }
        let index = |name: &str| {
            self.reductions
                .iter()
                .position(|r| r.name == name)
                .ok_or_else(|| AnalyticsError::UnknownReduction(name.to_string()))
        };
        self.ratios
            .iter()
            .map(|r| Ok((index(&r.numerator)?, index(&r.denominator)?)))
            .collect()
    }
}

/// Computed metrics for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    /// Records that fell into this group, defined or not.
    pub record_count: usize,
    /// One value per output column, in [`AggregationResult::columns`] order.
    pub values: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    dimensions: Vec<Dimension>,
    columns: Vec<String>,
    rows: BTreeMap<GroupKey, GroupRow>,
}

impl AggregationResult {
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Groups in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &GroupRow)> {
        self.rows.iter()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&GroupRow> {
        self.rows.get(key)
    }

    /// Value of `column` for the group `key`.
    pub fn metric(&self, key: &GroupKey, column: &str) -> Option<Metric> {
        let idx = self.column_index(column)?;
        self.rows.get(key).map(|row| row.values[idx])
    }

    /// Every group's value for `column`, in key order.
    pub fn column_values(&self, column: &str) -> Option<Vec<Metric>> {
        let idx = self.column_index(column)?;
        Some(self.rows.values().map(|row| row.values[idx]).collect())
    }

    /// Mean of a column over the groups where it is defined.
    pub fn column_mean(&self, column: &str) -> Option<Metric> {
        let defined: Vec<f64> = self
            .column_values(column)?
            .into_iter()
            .filter_map(Metric::value)
            .collect();
        if defined.is_empty() {
            return Some(Metric::Undefined);
        }
        Some(Metric::ratio(defined.iter().sum(), defined.len() as f64))
    }

    /// Sum of `record_count` over all groups.
    pub fn total_records(&self) -> usize {
        self.rows.values().map(|r| r.record_count).sum()
    }

    pub(crate) fn from_rows(
        dimensions: Vec<Dimension>,
        columns: Vec<String>,
        rows: BTreeMap<GroupKey, GroupRow>,
    ) -> Self {
        AggregationResult {
            dimensions,
            columns,
            rows,
        }
    }
}

enum Acc {
    Sum { total: f64, n: usize },
    Mean { total: f64, n: usize },
    Count(usize),
    Distinct(HashSet<KeyValue>),
}

impl Acc {
    fn new(reducer: &Reducer) -> Self {
        match reducer {
            Reducer::Sum(_) => Acc::Sum { total: 0.0, n: 0 },
            Reducer::Mean(_) => Acc::Mean { total: 0.0, n: 0 },
            Reducer::Count(_) => Acc::Count(0),
            Reducer::CountDistinct(_) => Acc::Distinct(HashSet::new()),
        }
    }

    fn push(&mut self, reducer: &Reducer, r: &EnrichedRecord) {
        match (self, reducer) {
            (Acc::Sum { total, n }, Reducer::Sum(m))
            | (Acc::Mean { total, n }, Reducer::Mean(m)) => {
                if let Some(v) = m.value(r).value() {
                    *total += v;
                    *n += 1;
                }
            }
            (Acc::Count(n), Reducer::Count(m)) => {
                if !m.value(r).is_undefined() {
                    *n += 1;
                }
            }
            (Acc::Distinct(set), Reducer::CountDistinct(d)) => {
                let key = d.key_of(r);
                if key != KeyValue::Undefined {
                    set.insert(key);
                }
            }
            _ => unreachable!("accumulator built from a different reducer"),
        }
    }

    fn finish(self) -> Metric {
        match self {
            // A group with no defined values has no sum, not a zero sum.
            Acc::Sum { total, n } => {
                if n == 0 {
                    Metric::Undefined
                } else {
                    Metric::Value(total)
                }
            }
            Acc::Mean { total, n } => Metric::ratio(total, n as f64),
            Acc::Count(n) => Metric::Value(n as f64),
            Acc::Distinct(set) => Metric::Value(set.len() as f64),
        }
    }
}

/// Aggregate a dataset according to `spec`.
pub fn aggregate(dataset: &Dataset, spec: &AggregationSpec) -> Result<AggregationResult> {
    aggregate_records(dataset.records(), spec)
}

/// Aggregate any slice of enriched records according to `spec`.
///
/// Every distinct key present in `records` yields exactly one group; records
/// with undefined key values form their own groups.
pub fn aggregate_records(
    records: &[EnrichedRecord],
    spec: &AggregationSpec,
) -> Result<AggregationResult> {
    let ratio_refs = spec.resolve_ratios()?;

    let mut groups: BTreeMap<GroupKey, (usize, Vec<Acc>)> = BTreeMap::new();
    for r in records {
        let key = GroupKey::of(&spec.group_by, r);
        let (count, accs) = groups
            .entry(key)
            .or_insert_with(|| {
                let accs = spec.reductions.iter().map(|red| Acc::new(&red.reducer)).collect();
                (0, accs)
            });
        *count += 1;
        for (acc, red) in accs.iter_mut().zip(&spec.reductions) {
            acc.push(&red.reducer, r);
        }
    }

    let rows: BTreeMap<GroupKey, GroupRow> = groups
        .into_iter()
        .map(|(key, (record_count, accs))| {
            let mut values: Vec<Metric> = accs.into_iter().map(Acc::finish).collect();
            for (ratio, (num, den)) in spec.ratios.iter().zip(&ratio_refs) {
                values.push(Metric::ratio_of(values[*num], values[*den]).scale(ratio.scale));
            }
            (key, GroupRow { record_count, values })
        })
        .collect();

    debug!(
        group_by = ?spec.group_by,
        records = records.len(),
        groups = rows.len(),
        "aggregated"
    );
    Ok(AggregationResult::from_rows(spec.group_by.clone(), spec.columns(), rows))
}
