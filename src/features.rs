//! Per-record derived fields.

use crate::metric::Metric;
use crate::types::{CalendarParts, EnrichedRecord, SalesRecord};
use crate::util::days_diff;

/// Derive margin, per-unit figures, shipping duration and calendar parts.
///
/// Pure: the same record always yields the same enriched record. Values are
/// kept unrounded; rounding happens only when results are rendered.
pub fn enrich(record: SalesRecord) -> EnrichedRecord {
    let profit_margin = Metric::percent(record.profit, record.sales);
    let quantity = f64::from(record.quantity);
    let revenue_per_unit = Metric::ratio(record.sales, quantity);
    let profit_per_unit = Metric::ratio(record.profit, quantity);
    let shipping_days = match (record.order_date, record.ship_date) {
        (Some(ordered), Some(shipped)) => Some(days_diff(ordered, shipped)),
        _ => None,
    };
    let calendar = record.order_date.map(CalendarParts::of);

    EnrichedRecord {
        record,
        profit_margin,
        shipping_days,
        revenue_per_unit,
        profit_per_unit,
        calendar,
    }
}

pub fn enrich_all(records: Vec<SalesRecord>) -> Vec<EnrichedRecord> {
    records.into_iter().map(enrich).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn record(sales: f64, profit: f64, quantity: u32) -> SalesRecord {
        SalesRecord {
            order_id: "CA-1".into(),
            customer_name: "Claire Gute".into(),
            product_name: "Bookcase".into(),
            category: "Furniture".into(),
            sub_category: "Bookcases".into(),
            region: "South".into(),
            state: "Kentucky".into(),
            ship_mode: "Second Class".into(),
            postal_code: "42420".into(),
            order_date: NaiveDate::from_ymd_opt(2016, 11, 8),
            ship_date: NaiveDate::from_ymd_opt(2016, 11, 11),
            sales,
            quantity,
            discount: 0.0,
            profit,
            shipping_cost: 10.0,
        }
    }

    #[test]
    fn test_margin_and_per_unit() {
        let e = enrich(record(200.0, -10.0, 4));
        assert_relative_eq!(e.profit_margin.value().unwrap(), -5.0);
        assert_relative_eq!(e.revenue_per_unit.value().unwrap(), 50.0);
        assert_relative_eq!(e.profit_per_unit.value().unwrap(), -2.5);
    }

    #[test]
    fn test_zero_sales_margin_undefined() {
        let e = enrich(record(0.0, 5.0, 1));
        assert!(e.profit_margin.is_undefined());
        assert_eq!(e.revenue_per_unit, Metric::Value(0.0));
    }

    #[test]
    fn test_zero_quantity_per_unit_undefined() {
        let e = enrich(record(10.0, 5.0, 0));
        assert!(e.revenue_per_unit.is_undefined());
        assert!(e.profit_per_unit.is_undefined());
    }

    #[test]
    fn test_shipping_days_and_calendar() {
        let e = enrich(record(10.0, 1.0, 1));
        assert_eq!(e.shipping_days, Some(3));
        let c = e.calendar.unwrap();
        assert_eq!((c.year, c.month, c.quarter), (2016, 11, 4));
        assert_eq!(c.weekday_name(), "Tuesday");
    }

    #[test]
    fn test_missing_ship_date() {
        let mut r = record(10.0, 1.0, 1);
        r.ship_date = None;
        let e = enrich(r);
        assert_eq!(e.shipping_days, None);
        assert!(e.calendar.is_some());

        let mut r = record(10.0, 1.0, 1);
        r.order_date = None;
        let e = enrich(r);
        assert_eq!(e.shipping_days, None);
        assert!(e.calendar.is_none());
    }
}
