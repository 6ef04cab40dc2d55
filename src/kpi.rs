//! Dataset-wide scalar indicators.

use crate::dataset::Dataset;
use crate::metric::Metric;
use crate::types::EnrichedRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Whole-dataset totals and the ratios derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_sales: f64,
    pub total_profit: f64,
    pub total_quantity: u64,
    pub record_count: usize,
    pub distinct_orders: usize,
    pub distinct_customers: usize,
    pub distinct_products: usize,
    pub avg_order_value: Metric,
    pub avg_profit_margin: Metric,
    pub customer_lifetime_value: Metric,
    pub profit_per_order: Metric,
    pub avg_shipping_days: Metric,
}

impl KpiSummary {
    pub fn compute(dataset: &Dataset) -> Self {
        Self::from_records(dataset.records())
    }

    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        let mut total_sales = 0.0;
        let mut total_profit = 0.0;
        let mut total_quantity = 0u64;
        let mut orders: HashSet<&str> = HashSet::new();
        let mut customers: HashSet<&str> = HashSet::new();
        let mut products: HashSet<&str> = HashSet::new();
        let (mut ship_total, mut ship_n) = (0i64, 0usize);

        for r in records {
            let rec = &r.record;
            total_sales += rec.sales;
            total_profit += rec.profit;
            total_quantity += u64::from(rec.quantity);
            orders.insert(rec.order_id.as_str());
            customers.insert(rec.customer_name.as_str());
            products.insert(rec.product_name.as_str());
            if let Some(days) = r.shipping_days {
                ship_total += days;
                ship_n += 1;
            }
        }

        let distinct_orders = orders.len();
        let distinct_customers = customers.len();
        KpiSummary {
            total_sales,
            total_profit,
            total_quantity,
            record_count: records.len(),
            distinct_orders,
            distinct_customers,
            distinct_products: products.len(),
            avg_order_value: Metric::ratio(total_sales, distinct_orders as f64),
            avg_profit_margin: Metric::percent(total_profit, total_sales),
            customer_lifetime_value: Metric::ratio(total_sales, distinct_customers as f64),
            profit_per_order: Metric::ratio(total_profit, distinct_orders as f64),
            avg_shipping_days: Metric::ratio(ship_total as f64, ship_n as f64),
        }
    }

    /// Name → value view consumed by renderers.
    pub fn to_map(&self) -> BTreeMap<&'static str, Metric> {
        BTreeMap::from([
            ("Total Sales", Metric::Value(self.total_sales)),
            ("Total Profit", Metric::Value(self.total_profit)),
            ("Total Quantity", Metric::Value(self.total_quantity as f64)),
            ("Total Orders", Metric::Value(self.distinct_orders as f64)),
            ("Total Customers", Metric::Value(self.distinct_customers as f64)),
            ("Total Products", Metric::Value(self.distinct_products as f64)),
            ("Average Order Value", self.avg_order_value),
            ("Average Profit Margin", self.avg_profit_margin),
            ("Customer Lifetime Value", self.customer_lifetime_value),
            ("Profit per Order", self.profit_per_order),
            ("Average Shipping Days", self.avg_shipping_days),
        ])
    }
}
