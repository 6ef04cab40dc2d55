// Cell parsing and number formatting shared by the loader and the CLI.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Day-first layouts tried in order. ISO dates are accepted as well since
/// they are unambiguous.
const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Trimmed, non-empty text or `None`.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Numeric cell as a finite `f64`.
///
/// Thousands separators are dropped; letters anywhere in the cell (`n/a`,
/// `inf`, `1e3x`) make it unparseable.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let cell = non_empty(s)?;
    if cell.bytes().any(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    cell.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_u32_safe(s: Option<&str>) -> Option<u32> {
    let s = non_empty(s)?.replace(',', "");
    s.parse::<u32>().ok()
}

/// Parse a day-first date such as `31-12-2014` or `31/12/2014`.
///
/// A trailing time component (`31/12/2014 00:00`) is ignored. Anything that
/// does not parse yields `None`; the caller decides how to count it.
pub fn parse_date_dayfirst(s: Option<&str>) -> Option<NaiveDate> {
    let s = non_empty(s)?;
    let day_part = s.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day_part, fmt).ok())
}

/// Whole days from `start` to `end`; negative when `end` comes first.
pub fn days_diff(start: NaiveDate, end: NaiveDate) -> i64 {
    end.signed_duration_since(start).num_days()
}

/// `1,234,567.89`-style rendering with `decimals` fraction digits.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut out = whole
        .parse::<u64>()
        .map(|w| w.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| whole.to_string());
    if let Some(f) = frac {
        out.push('.');
        out.push_str(f);
    }
    // No "-0.00".
    let is_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
    if n.is_sign_negative() && !is_zero {
        out.insert(0, '-');
    }
    out
}

pub fn format_int<T: ToFormattedString>(n: T) -> String {
    n.to_formatted_string(&Locale::en)
}
