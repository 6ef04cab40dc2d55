use crate::metric::Metric;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Column names of the source dataset. These are a compatibility contract:
/// the header must carry every one of them.
pub const REQUIRED_COLUMNS: [&str; 16] = [
    "Order ID",
    "Order Date",
    "Ship Date",
    "Ship Mode",
    "Customer Name",
    "State",
    "Postal Code",
    "Region",
    "Category",
    "Sub-Category",
    "Product Name",
    "Sales",
    "Quantity",
    "Discount",
    "Profit",
    "Shipping Cost",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Order ID")]
    pub order_id: Option<String>,
    #[serde(rename = "Order Date")]
    pub order_date: Option<String>,
    #[serde(rename = "Ship Date")]
    pub ship_date: Option<String>,
    #[serde(rename = "Ship Mode")]
    pub ship_mode: Option<String>,
    #[serde(rename = "Customer Name")]
    pub customer_name: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "Postal Code")]
    pub postal_code: Option<String>,
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Sub-Category")]
    pub sub_category: Option<String>,
    #[serde(rename = "Product Name")]
    pub product_name: Option<String>,
    #[serde(rename = "Sales")]
    pub sales: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<String>,
    #[serde(rename = "Discount")]
    pub discount: Option<String>,
    #[serde(rename = "Profit")]
    pub profit: Option<String>,
    #[serde(rename = "Shipping Cost")]
    pub shipping_cost: Option<String>,
}

impl RawRow {
    /// Every cell of the row in `REQUIRED_COLUMNS` order.
    pub fn cells(&self) -> [Option<&str>; 16] {
        [
            self.order_id.as_deref(),
            self.order_date.as_deref(),
            self.ship_date.as_deref(),
            self.ship_mode.as_deref(),
            self.customer_name.as_deref(),
            self.state.as_deref(),
            self.postal_code.as_deref(),
            self.region.as_deref(),
            self.category.as_deref(),
            self.sub_category.as_deref(),
            self.product_name.as_deref(),
            self.sales.as_deref(),
            self.quantity.as_deref(),
            self.discount.as_deref(),
            self.profit.as_deref(),
            self.shipping_cost.as_deref(),
        ]
    }
}

/// A typed, validated sales line.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub order_id: String,
    pub customer_name: String,
    pub product_name: String,
    pub category: String,
    pub sub_category: String,
    pub region: String,
    pub state: String,
    pub ship_mode: String,
    pub postal_code: String,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub sales: f64,
    pub quantity: u32,
    pub discount: f64,
    pub profit: f64,
    pub shipping_cost: f64,
}

/// Calendar parts of the order date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarParts {
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub weekday: Weekday,
}

impl CalendarParts {
    pub fn of(date: NaiveDate) -> Self {
        let month = date.month();
        CalendarParts {
            year: date.year(),
            month,
            quarter: (month - 1) / 3 + 1,
            weekday: date.weekday(),
        }
    }

    /// Full English weekday name, e.g. `Monday`.
    pub fn weekday_name(&self) -> &'static str {
        match self.weekday {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        }
    }
}

/// A sales record plus the fields derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: SalesRecord,
    pub profit_margin: Metric,
    pub shipping_days: Option<i64>,
    pub revenue_per_unit: Metric,
    pub profit_per_unit: Metric,
    pub calendar: Option<CalendarParts>,
}

/// Pre-aggregation filter. Every field is optional; an empty filter keeps
/// every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Inclusive lower bound on the order date.
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound on the order date.
    pub end: Option<NaiveDate>,
    pub category: Option<String>,
    pub region: Option<String>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.category.is_none()
            && self.region.is_none()
    }

    /// Whether a record passes. A record without an order date fails any
    /// date bound.
    pub fn matches(&self, r: &EnrichedRecord) -> bool {
        let rec = &r.record;
        if let Some(start) = self.start {
            match rec.order_date {
                Some(d) if d >= start => {}
                _ => return false,
            }
        }
        if let Some(end) = self.end {
            match rec.order_date {
                Some(d) if d <= end => {}
                _ => return false,
            }
        }
        if let Some(c) = &self.category {
            if &rec.category != c {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if &rec.region != region {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub name: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SegmentCountRow {
    #[serde(rename = "Segment")]
    #[tabled(rename = "Segment")]
    pub segment: String,
    #[serde(rename = "Customers")]
    #[tabled(rename = "Customers")]
    pub customers: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct QualityRow {
    #[serde(rename = "Check")]
    #[tabled(rename = "Check")]
    pub check: String,
    #[serde(rename = "Rows")]
    #[tabled(rename = "Rows")]
    pub rows: String,
}
