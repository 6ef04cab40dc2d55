//! Property-based tests for the aggregation engine.
//!
//! Verifies:
//! 1. Profit margin is undefined exactly when sales are zero
//! 2. Binning is right-inclusive on every interval
//! 3. Aggregation partitions the input
//! 4. Aggregation is idempotent and independent of input order
//! 5. Per-group totals add up to the dataset-wide KPIs

use proptest::prelude::*;
use superstore_report::features::enrich;
use superstore_report::{
    aggregate, AggregationSpec, BinDefinition, Dataset, Dimension, GroupKey, KpiSummary, Measure,
    SalesRecord,
};

// ── Strategies ──────────────────────────────────────────────────────────

fn record_strategy() -> impl Strategy<Value = SalesRecord> {
    (
        prop::sample::select(vec!["West", "East", "Central", "South"]),
        prop::sample::select(vec!["Technology", "Furniture", "Office Supplies"]),
        0u32..6,
        0i64..2000,
        -500i64..500,
        1u32..10,
        prop::sample::select(vec![0.0, 0.05, 0.1, 0.2, 0.45, 0.8]),
        prop::option::of(0u32..300),
    )
        .prop_map(|(region, category, customer, sales, profit, quantity, discount, day)| {
            let order_date = day.and_then(|d| {
                chrono::NaiveDate::from_ymd_opt(2014, 1, 1)
                    .and_then(|base| base.checked_add_days(chrono::Days::new(u64::from(d))))
            });
            SalesRecord {
                order_id: format!("O-{customer}-{sales}"),
                customer_name: format!("Customer {customer}"),
                product_name: format!("Product {}", sales % 7),
                category: category.to_string(),
                sub_category: "Misc".to_string(),
                region: region.to_string(),
                state: "Texas".to_string(),
                ship_mode: "Standard Class".to_string(),
                postal_code: "75001".to_string(),
                order_date,
                ship_date: order_date,
                sales: sales as f64,
                quantity,
                discount,
                profit: profit as f64,
                shipping_cost: 1.0,
            }
        })
}

fn records_strategy() -> impl Strategy<Value = Vec<SalesRecord>> {
    prop::collection::vec(record_strategy(), 0..60)
}

fn spec() -> AggregationSpec {
    AggregationSpec::by([Dimension::Region, Dimension::DiscountBand])
        .sum("sales", Measure::Sales)
        .sum("profit", Measure::Profit)
        .mean("margin", Measure::ProfitMargin)
        .count_distinct("orders", Dimension::OrderId)
        .ratio("profit_margin", "profit", "sales", 100.0)
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    /// Margin is undefined iff sales are zero, otherwise profit / sales * 100
    #[test]
    fn prop_margin_definition(rec in record_strategy()) {
        let sales = rec.sales;
        let profit = rec.profit;
        let e = enrich(rec);
        if sales == 0.0 {
            prop_assert!(e.profit_margin.is_undefined());
        } else {
            let m = e.profit_margin.value().unwrap();
            prop_assert!((m - profit / sales * 100.0).abs() < 1e-9);
        }
    }

    /// Every value in (e_i, e_{i+1}] maps to label i; edges themselves close the lower bin
    #[test]
    fn prop_bins_right_inclusive(
        edge_set in prop::collection::btree_set(-1000i32..1000, 2..8),
        frac in 0.0001f64..1.0,
    ) {
        let edges: Vec<f64> = edge_set.into_iter().map(f64::from).collect();
        let labels: Vec<String> = (0..edges.len() - 1).map(|i| format!("bin{i}")).collect();
        let bins = BinDefinition::new(edges.clone(), labels).unwrap();

        prop_assert_eq!(bins.index_of(edges[0]), None);
        for i in 0..edges.len() - 1 {
            let (lo, hi) = (edges[i], edges[i + 1]);
            prop_assert_eq!(bins.index_of(hi), Some(i));
            let inside = lo + (hi - lo) * frac;
            if inside > lo && inside <= hi {
                prop_assert_eq!(bins.index_of(inside), Some(i));
            }
        }
        prop_assert_eq!(bins.index_of(edges[edges.len() - 1] + 1.0), None);
    }

    /// Groups are disjoint and their record counts add up to the input size
    #[test]
    fn prop_aggregation_is_partition(records in records_strategy()) {
        let ds = Dataset::from_sales(records);
        let res = aggregate(&ds, &spec()).unwrap();
        prop_assert_eq!(res.total_records(), ds.len());

        for r in ds.records() {
            let key = GroupKey::of(res.dimensions(), r);
            prop_assert!(res.get(&key).is_some());
        }
        for (key, row) in res.iter() {
            let members = ds
                .records()
                .iter()
                .filter(|r| &GroupKey::of(res.dimensions(), r) == key)
                .count();
            prop_assert_eq!(members, row.record_count);
        }
    }

    /// Re-running or reordering the input yields identical results
    #[test]
    fn prop_aggregation_idempotent_and_order_free(records in records_strategy()) {
        let mut reversed = records.clone();
        reversed.reverse();
        let ds = Dataset::from_sales(records);
        let first = aggregate(&ds, &spec()).unwrap();
        let second = aggregate(&ds, &spec()).unwrap();
        prop_assert_eq!(&first, &second);

        let flipped = aggregate(&Dataset::from_sales(reversed), &spec()).unwrap();
        prop_assert_eq!(first.len(), flipped.len());
        for (key, row) in first.iter() {
            let other = flipped.get(key).unwrap();
            prop_assert_eq!(row.record_count, other.record_count);
            // Integer-valued sums are exact in any order.
            prop_assert_eq!(row.values[0], other.values[0]);
            prop_assert_eq!(row.values[1], other.values[1]);
            prop_assert_eq!(row.values[3], other.values[3]);
            prop_assert_eq!(row.values[4], other.values[4]);
        }
    }

    /// Summing group totals reproduces the dataset-wide KPIs
    #[test]
    fn prop_group_totals_match_kpis(records in records_strategy()) {
        let ds = Dataset::from_sales(records);
        let kpis = KpiSummary::compute(&ds);
        let res = aggregate(&ds, &spec()).unwrap();

        let column_total = |name: &str| -> f64 {
            res.column_values(name).unwrap().iter().filter_map(|m| m.value()).sum()
        };
        let sales = column_total("sales");
        let profit = column_total("profit");
        prop_assert!((sales - kpis.total_sales).abs() < 1e-6);
        prop_assert!((profit - kpis.total_profit).abs() < 1e-6);

        let order_spec = AggregationSpec::by([Dimension::OrderId]).sum("s", Measure::Sales);
        let by_order = aggregate(&ds, &order_spec).unwrap();
        prop_assert_eq!(by_order.len(), kpis.distinct_orders);
    }
}
