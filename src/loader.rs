use crate::error::{AnalyticsError, Result};
use crate::types::{RawRow, SalesRecord, REQUIRED_COLUMNS};
use crate::util::{non_empty, parse_date_dayfirst, parse_f64_safe, parse_u32_safe};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Data-quality counters for one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Rows dropped because a required non-date field was missing or invalid.
    pub dropped_rows: usize,
    /// Rows the CSV layer could not turn into a row at all.
    pub malformed_rows: usize,
    /// Full-row duplicates seen; only removed when de-duplication is on.
    pub duplicate_rows: usize,
    pub removed_duplicates: usize,
    /// Empty cells across the expected columns of rows not removed as duplicates.
    pub missing_values: usize,
    pub unparseable_order_dates: usize,
    pub unparseable_ship_dates: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Drop repeated full rows, keeping the first occurrence.
    pub dedupe: bool,
}

/// Why a single row was rejected. Never fatal to the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowIssue {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid value in field `{0}`")]
    InvalidValue(&'static str),
}

/// Load and normalize a dataset file.
pub fn load_and_clean<P: AsRef<Path>>(
    path: P,
    opts: NormalizeOptions,
) -> Result<(Vec<SalesRecord>, NormalizationReport)> {
    let file = File::open(path.as_ref())?;
    info!(path = %path.as_ref().display(), "loading dataset");
    load_from_reader(file, opts)
}

/// Load and normalize CSV text from any reader.
///
/// Fails only on a missing column or an unreadable stream; per-row problems
/// are counted in the returned report.
pub fn load_from_reader<R: Read>(
    reader: R,
    opts: NormalizeOptions,
) -> Result<(Vec<SalesRecord>, NormalizationReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    // Trimmed once; the schema check and field lookup must agree on names.
    let headers: StringRecord = decode_record(rdr.byte_headers()?)
        .iter()
        .map(str::trim)
        .collect();
    check_schema(&headers)?;

    let mut rows = Vec::new();
    let mut malformed_rows = 0usize;
    for (idx, result) in rdr.byte_records().enumerate() {
        let row = result
            .map_err(AnalyticsError::from)
            .and_then(|raw| Ok(decode_record(&raw).deserialize::<RawRow>(Some(&headers))?));
        match row {
            Ok(r) => rows.push(r),
            Err(e) => {
                debug!(row = idx + 1, error = %e, "skipping malformed row");
                malformed_rows += 1;
            }
        }
    }

    let (records, mut report) = normalize_rows(rows, opts);
    report.total_rows += malformed_rows;
    report.malformed_rows = malformed_rows;
    Ok((records, report))
}

/// Verify the header carries every expected column.
pub fn check_schema(headers: &StringRecord) -> Result<()> {
    let present: HashSet<&str> = headers.iter().map(str::trim).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        warn!(missing = ?missing, "input is missing expected columns");
        Err(AnalyticsError::Schema { missing })
    }
}

/// Normalize already-split rows, preserving input order.
pub fn normalize_rows(
    rows: Vec<RawRow>,
    opts: NormalizeOptions,
) -> (Vec<SalesRecord>, NormalizationReport) {
    let mut report = NormalizationReport {
        total_rows: rows.len(),
        ..NormalizationReport::default()
    };
    let mut seen: HashSet<RawRow> = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());

    for (idx, row) in rows.into_iter().enumerate() {
        if !seen.insert(row.clone()) {
            report.duplicate_rows += 1;
            if opts.dedupe {
                report.removed_duplicates += 1;
                continue;
            }
        }

        report.missing_values += row.cells().iter().filter(|c| non_empty(**c).is_none()).count();

        if non_empty(row.order_date.as_deref()).is_some()
            && parse_date_dayfirst(row.order_date.as_deref()).is_none()
        {
            report.unparseable_order_dates += 1;
        }
        if non_empty(row.ship_date.as_deref()).is_some()
            && parse_date_dayfirst(row.ship_date.as_deref()).is_none()
        {
            report.unparseable_ship_dates += 1;
        }

        match normalize_row(&row) {
            Ok(rec) => records.push(rec),
            Err(issue) => {
                debug!(row = idx + 1, %issue, "dropping row");
                report.dropped_rows += 1;
            }
        }
    }

    report.kept_rows = records.len();
    info!(
        total = report.total_rows,
        kept = report.kept_rows,
        dropped = report.dropped_rows,
        duplicates = report.duplicate_rows,
        "normalized dataset"
    );
    (records, report)
}

fn required(cell: Option<&str>, field: &'static str) -> std::result::Result<String, RowIssue> {
    non_empty(cell)
        .map(str::to_string)
        .ok_or(RowIssue::MissingField(field))
}

fn number(
    cell: Option<&str>,
    field: &'static str,
    valid: impl Fn(f64) -> bool,
) -> std::result::Result<f64, RowIssue> {
    non_empty(cell).ok_or(RowIssue::MissingField(field))?;
    parse_f64_safe(cell)
        .filter(|v| valid(*v))
        .ok_or(RowIssue::InvalidValue(field))
}

/// Turn one raw row into a typed record. Dates that fail to parse become
/// `None`; every other field is required.
pub fn normalize_row(row: &RawRow) -> std::result::Result<SalesRecord, RowIssue> {
    let quantity = {
        non_empty(row.quantity.as_deref()).ok_or(RowIssue::MissingField("Quantity"))?;
        parse_u32_safe(row.quantity.as_deref())
            .filter(|q| *q > 0)
            .ok_or(RowIssue::InvalidValue("Quantity"))?
    };

    Ok(SalesRecord {
        order_id: required(row.order_id.as_deref(), "Order ID")?,
        customer_name: required(row.customer_name.as_deref(), "Customer Name")?,
        product_name: required(row.product_name.as_deref(), "Product Name")?,
        category: required(row.category.as_deref(), "Category")?,
        sub_category: required(row.sub_category.as_deref(), "Sub-Category")?,
        region: required(row.region.as_deref(), "Region")?,
        state: required(row.state.as_deref(), "State")?,
        ship_mode: required(row.ship_mode.as_deref(), "Ship Mode")?,
        postal_code: required(row.postal_code.as_deref(), "Postal Code")?,
        order_date: parse_date_dayfirst(row.order_date.as_deref()),
        ship_date: parse_date_dayfirst(row.ship_date.as_deref()),
        sales: number(row.sales.as_deref(), "Sales", |v| v >= 0.0)?,
        quantity,
        discount: number(row.discount.as_deref(), "Discount", |v| (0.0..=1.0).contains(&v))?,
        profit: number(row.profit.as_deref(), "Profit", |_| true)?,
        shipping_cost: number(row.shipping_cost.as_deref(), "Shipping Cost", |v| v >= 0.0)?,
    })
}

// Exports of the source dataset are latin-1; fall back to a byte-to-char
// mapping when a field is not valid UTF-8.
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

fn decode_record(raw: &ByteRecord) -> StringRecord {
    raw.iter().map(decode_field).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Row ID,Order ID,Order Date,Ship Date,Ship Mode,Customer Name,State,Postal Code,Region,Category,Sub-Category,Product Name,Sales,Quantity,Discount,Profit,Shipping Cost";

    fn csv_text(lines: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for l in lines {
            s.push('\n');
            s.push_str(l);
        }
        s
    }

    #[test]
    fn test_loads_day_first_dates() {
        let text = csv_text(&[
            "1,CA-1,08-11-2016,11/11/2016,Second Class,Claire Gute,Kentucky,42420,South,Furniture,Bookcases,Bush Bookcase,261.96,2,0,41.91,35.2",
        ]);
        let (records, report) =
            load_from_reader(text.as_bytes(), NormalizeOptions::default()).unwrap();
        assert_eq!(report.total_rows, 1);
        assert_eq!(report.kept_rows, 1);
        let r = &records[0];
        assert_eq!(r.order_date, NaiveDate::from_ymd_opt(2016, 11, 8));
        assert_eq!(r.ship_date, NaiveDate::from_ymd_opt(2016, 11, 11));
        assert_eq!(r.quantity, 2);
        assert_eq!(r.customer_name, "Claire Gute");
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let text = "Order ID,Sales\nCA-1,10";
        let err = load_from_reader(text.as_bytes(), NormalizeOptions::default()).unwrap_err();
        match err {
            AnalyticsError::Schema { missing } => {
                assert!(missing.contains(&"Postal Code".to_string()));
                assert!(missing.contains(&"Order Date".to_string()));
                assert!(!missing.contains(&"Sales".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_date_is_recovered_missing_postal_code_is_dropped() {
        let text = csv_text(&[
            "1,CA-1,32-13-2016,11/11/2016,Second Class,Ann,Ohio,43001,East,Technology,Phones,Phone,100,1,0,20,5",
            "2,CA-2,08-11-2016,11/11/2016,Second Class,Bob,Ohio,,East,Technology,Phones,Phone,100,1,0,20,5",
        ]);
        let (records, report) =
            load_from_reader(text.as_bytes(), NormalizeOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].order_date, None);
        assert_eq!(report.unparseable_order_dates, 1);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.missing_values, 1);
    }

    #[test]
    fn test_invalid_numbers_drop_row() {
        let base = RawRow {
            order_id: Some("CA-1".into()),
            order_date: Some("01/01/2015".into()),
            ship_date: Some("03/01/2015".into()),
            ship_mode: Some("First Class".into()),
            customer_name: Some("Ann".into()),
            state: Some("Ohio".into()),
            postal_code: Some("43001".into()),
            region: Some("East".into()),
            category: Some("Technology".into()),
            sub_category: Some("Phones".into()),
            product_name: Some("Phone".into()),
            sales: Some("100".into()),
            quantity: Some("2".into()),
            discount: Some("0.2".into()),
            profit: Some("-4".into()),
            shipping_cost: Some("3".into()),
        };
        assert!(normalize_row(&base).is_ok());

        let mut r = base.clone();
        r.quantity = Some("0".into());
        assert_eq!(normalize_row(&r), Err(RowIssue::InvalidValue("Quantity")));

        let mut r = base.clone();
        r.discount = Some("1.5".into());
        assert_eq!(normalize_row(&r), Err(RowIssue::InvalidValue("Discount")));

        let mut r = base.clone();
        r.sales = None;
        assert_eq!(normalize_row(&r), Err(RowIssue::MissingField("Sales")));

        let mut r = base;
        r.ship_date = None;
        assert!(normalize_row(&r).unwrap().ship_date.is_none());
    }

    #[test]
    fn test_duplicates_kept_unless_dedupe() {
        let line = "1,CA-1,08-11-2016,11/11/2016,Second Class,Ann,Ohio,43001,East,Technology,Phones,Phone,100,1,0,20,5";
        let text = csv_text(&[line, line]);

        let (records, report) =
            load_from_reader(text.as_bytes(), NormalizeOptions::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(report.removed_duplicates, 0);

        let (records, report) =
            load_from_reader(text.as_bytes(), NormalizeOptions { dedupe: true }).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(report.removed_duplicates, 1);
    }

    #[test]
    fn test_padded_header_names_are_matched() {
        let text = format!(
            "{}\n1,CA-1,08-11-2016,11/11/2016,Second Class,Ann,Ohio,43001,East,Technology,Phones,Phone,100,1,0,20,5",
            HEADER.replace(',', ", ")
        );
        let (records, report) =
            load_from_reader(text.as_bytes(), NormalizeOptions::default()).unwrap();
        assert_eq!(report.kept_rows, 1);
        assert_eq!(report.dropped_rows, 0);
        assert_eq!(report.missing_values, 0);
        assert_eq!(records[0].order_id, "CA-1");
        assert_eq!(records[0].postal_code, "43001");
        assert_eq!(records[0].shipping_cost, 5.0);
    }

    #[test]
    fn test_removed_duplicates_do_not_add_missing_cells() {
        let line = "1,CA-1,08-11-2016,,Second Class,Ann,Ohio,43001,East,Technology,Phones,Phone,100,1,0,20,5";
        let text = csv_text(&[line, line]);

        let (_, report) = load_from_reader(text.as_bytes(), NormalizeOptions::default()).unwrap();
        assert_eq!(report.missing_values, 2);

        let (_, report) =
            load_from_reader(text.as_bytes(), NormalizeOptions { dedupe: true }).unwrap();
        assert_eq!(report.removed_duplicates, 1);
        assert_eq!(report.missing_values, 1);
    }

    #[test]
    fn test_latin1_bytes_are_decoded() {
        let mut bytes = csv_text(&[]).into_bytes();
        bytes.extend_from_slice(
            b"\n1,CA-1,08-11-2016,11/11/2016,Second Class,Ren\xe9,Ohio,43001,East,Technology,Phones,Phone,100,1,0,20,5",
        );
        let (records, _) = load_from_reader(bytes.as_slice(), NormalizeOptions::default()).unwrap();
        assert_eq!(records[0].customer_name, "René");
    }
}
