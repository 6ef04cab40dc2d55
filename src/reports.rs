//! The standard rollups, each expressed as an [`AggregationSpec`].

use crate::aggregate::{aggregate, AggregationResult, AggregationSpec, Dimension, GroupKey, Measure};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::kpi::KpiSummary;
use crate::loader::NormalizationReport;
use crate::metric::Metric;
use crate::rank::{self, RankedGroup};
use crate::segment::{BinDefinition, CUSTOMER_TIERS};
use crate::stats::{correlation_matrix, CorrelationMatrix, CORRELATED_MEASURES};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub const TOTAL_SALES: &str = "Total_Sales";
pub const TOTAL_PROFIT: &str = "Total_Profit";
pub const TOTAL_QUANTITY: &str = "Total_Quantity";
pub const TOTAL_ORDERS: &str = "Total_Orders";
pub const PROFIT_MARGIN: &str = "Profit_Margin";
pub const AVG_ORDER_VALUE: &str = "Avg_Order_Value";

/// Sales and profit per (year, month).
pub fn monthly_trend_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::OrderYear, Dimension::OrderMonth])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
}

pub fn customer_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::CustomerName])
        .sum(TOTAL_SALES, Measure::Sales)
        .count("Order_Count", Measure::Sales)
        .mean(AVG_ORDER_VALUE, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .mean("Avg_Profit", Measure::Profit)
        .count_distinct("Unique_Days", Dimension::OrderDate)
        .count_distinct(TOTAL_ORDERS, Dimension::OrderId)
}

pub fn product_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::ProductName])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .sum(TOTAL_QUANTITY, Measure::Quantity)
        .ratio(PROFIT_MARGIN, TOTAL_PROFIT, TOTAL_SALES, 100.0)
}

pub fn region_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::Region])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .count_distinct("Unique_Customers", Dimension::CustomerName)
        .count_distinct(TOTAL_ORDERS, Dimension::OrderId)
        .ratio(PROFIT_MARGIN, TOTAL_PROFIT, TOTAL_SALES, 100.0)
        .ratio(AVG_ORDER_VALUE, TOTAL_SALES, TOTAL_ORDERS, 1.0)
}

pub fn state_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::State])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .ratio(PROFIT_MARGIN, TOTAL_PROFIT, TOTAL_SALES, 100.0)
}

pub fn category_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::Category])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .sum(TOTAL_QUANTITY, Measure::Quantity)
        .count_distinct(TOTAL_ORDERS, Dimension::OrderId)
        .ratio(PROFIT_MARGIN, TOTAL_PROFIT, TOTAL_SALES, 100.0)
        .ratio(AVG_ORDER_VALUE, TOTAL_SALES, TOTAL_ORDERS, 1.0)
}

pub fn sub_category_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::SubCategory])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .sum(TOTAL_QUANTITY, Measure::Quantity)
        .ratio(PROFIT_MARGIN, TOTAL_PROFIT, TOTAL_SALES, 100.0)
}

pub fn shipping_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::ShipMode])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .count_distinct(TOTAL_ORDERS, Dimension::OrderId)
        .mean("Avg_Shipping_Days", Measure::ShippingDays)
        .ratio(PROFIT_MARGIN, TOTAL_PROFIT, TOTAL_SALES, 100.0)
}

pub fn discount_spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::DiscountBand])
        .sum(TOTAL_SALES, Measure::Sales)
        .sum(TOTAL_PROFIT, Measure::Profit)
        .sum(TOTAL_QUANTITY, Measure::Quantity)
        .count_distinct(TOTAL_ORDERS, Dimension::OrderId)
        .ratio(PROFIT_MARGIN, TOTAL_PROFIT, TOTAL_SALES, 100.0)
        .ratio(AVG_ORDER_VALUE, TOTAL_SALES, TOTAL_ORDERS, 1.0)
}

/// Every rollup for one dataset snapshot.
#[derive(Debug, Clone)]
pub struct SalesReport {
    pub kpis: KpiSummary,
    pub monthly: AggregationResult,
    pub customers: AggregationResult,
    pub products: AggregationResult,
    pub regions: AggregationResult,
    pub states: AggregationResult,
    pub categories: AggregationResult,
    pub sub_categories: AggregationResult,
    pub shipping: AggregationResult,
    pub discounts: AggregationResult,
    pub correlation: CorrelationMatrix,
}

impl SalesReport {
    pub fn build(dataset: &Dataset) -> Result<Self> {
        let report = SalesReport {
            kpis: KpiSummary::compute(dataset),
            monthly: aggregate(dataset, &monthly_trend_spec())?,
            customers: aggregate(dataset, &customer_spec())?,
            products: aggregate(dataset, &product_spec())?,
            regions: aggregate(dataset, &region_spec())?,
            states: aggregate(dataset, &state_spec())?,
            categories: aggregate(dataset, &category_spec())?,
            sub_categories: aggregate(dataset, &sub_category_spec())?,
            shipping: aggregate(dataset, &shipping_spec())?,
            discounts: aggregate(dataset, &discount_spec())?,
            correlation: correlation_matrix(dataset.records(), &CORRELATED_MEASURES),
        };
        info!(
            records = dataset.len(),
            customers = report.customers.len(),
            products = report.products.len(),
            "built sales report"
        );
        Ok(report)
    }

    /// Rollups paired with the file stem they are exported under.
    pub fn rollups(&self) -> Vec<(&'static str, &AggregationResult)> {
        vec![
            ("monthly_trend", &self.monthly),
            ("customer_analysis", &self.customers),
            ("product_performance", &self.products),
            ("regional_analysis", &self.regions),
            ("state_analysis", &self.states),
            ("category_analysis", &self.categories),
            ("subcategory_analysis", &self.sub_categories),
            ("shipping_analysis", &self.shipping),
            ("discount_analysis", &self.discounts),
        ]
    }

    pub fn top_products(&self, n: usize) -> Result<Vec<RankedGroup<'_>>> {
        rank::top(&self.products, TOTAL_SALES, n)
    }

    /// Products that lost money overall, biggest sellers first.
    pub fn loss_making_products(&self, n: usize) -> Result<Vec<RankedGroup<'_>>> {
        rank::filter(&self.products, TOTAL_PROFIT, |p| p < 0.0)?.top(TOTAL_SALES, n)
    }

    pub fn top_customers(&self, n: usize) -> Result<Vec<RankedGroup<'_>>> {
        rank::top(&self.customers, TOTAL_SALES, n)
    }

    pub fn top_states(&self, n: usize) -> Result<Vec<RankedGroup<'_>>> {
        rank::top(&self.states, TOTAL_SALES, n)
    }

    /// States by profit margin; states without sales have no margin and are left out.
    pub fn top_states_by_margin(&self, n: usize) -> Result<Vec<RankedGroup<'_>>> {
        rank::top(&self.states, PROFIT_MARGIN, n)
    }

    pub fn best_category(&self) -> Result<Option<RankedGroup<'_>>> {
        Ok(rank::top(&self.categories, TOTAL_SALES, 1)?.into_iter().next())
    }

    pub fn best_region(&self) -> Result<Option<RankedGroup<'_>>> {
        Ok(rank::top(&self.regions, TOTAL_SALES, 1)?.into_iter().next())
    }

    pub fn best_product(&self) -> Result<Option<RankedGroup<'_>>> {
        Ok(self.top_products(1)?.into_iter().next())
    }

    /// Unweighted mean of the per-product margins that are defined.
    pub fn avg_product_margin(&self) -> Metric {
        self.products
            .column_mean(PROFIT_MARGIN)
            .unwrap_or(Metric::Undefined)
    }

    /// Each customer's tier by total sales.
    pub fn customer_tiers(&self) -> Vec<(&GroupKey, Option<&'static str>)> {
        classify(&self.customers, TOTAL_SALES, &CUSTOMER_TIERS)
    }

    /// Customers per tier, in tier order.
    pub fn tier_distribution(&self) -> Vec<(Option<String>, usize)> {
        let totals = self
            .customers
            .column_values(TOTAL_SALES)
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.value().unwrap_or(f64::NAN));
        CUSTOMER_TIERS.distribution(totals)
    }
}

/// Scalar summary exported alongside the rollup tables.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub kpis: KpiSummary,
    pub data_quality: NormalizationReport,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
    pub avg_product_margin: Metric,
    pub best_category: Option<String>,
    pub best_region: Option<String>,
    pub best_product: Option<String>,
    pub customer_tiers: BTreeMap<String, usize>,
}

impl SalesReport {
    pub fn summary(&self, dataset: &Dataset) -> Result<ReportSummary> {
        let span = dataset.order_date_span();
        let name = |g: Option<RankedGroup<'_>>| g.map(|g| g.key.to_string());
        Ok(ReportSummary {
            kpis: self.kpis.clone(),
            data_quality: dataset.report().clone(),
            first_order_date: span.map(|s| s.0),
            last_order_date: span.map(|s| s.1),
            avg_product_margin: self.avg_product_margin(),
            best_category: name(self.best_category()?),
            best_region: name(self.best_region()?),
            best_product: name(self.best_product()?),
            customer_tiers: self
                .tier_distribution()
                .into_iter()
                .map(|(label, n)| (label.unwrap_or_else(|| "undefined".to_string()), n))
                .collect(),
        })
    }
}

/// Label every group of `result` by the bin its `column` value falls in.
pub fn classify<'a, 'b>(
    result: &'a AggregationResult,
    column: &str,
    bins: &'b BinDefinition,
) -> Vec<(&'a GroupKey, Option<&'b str>)> {
    let Some(idx) = result.column_index(column) else {
        return Vec::new();
    };
    result
        .iter()
        .map(|(key, row)| (key, row.values[idx].value().and_then(|v| bins.assign(v))))
        .collect()
}
