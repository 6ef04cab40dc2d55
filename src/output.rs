use crate::aggregate::AggregationResult;
use crate::error::Result;
use crate::metric::Metric;
use crate::rank::RankedGroup;
use crate::util::{format_int, format_number};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Plain CSV cell: integral values without decimals, everything else at
/// two decimals, undefined left empty.
fn csv_cell(m: Metric) -> String {
    match m.value() {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{:.2}", v),
        None => String::new(),
    }
}

/// Human-readable cell with thousands separators.
fn display_cell(m: Metric) -> String {
    match m.value() {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format_int(v as i64),
        Some(v) => format_number(v, 2),
        None => "undefined".to_string(),
    }
}

fn header(result: &AggregationResult) -> Vec<String> {
    result
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .chain(result.columns().iter().cloned())
        .collect()
}

fn rows<'a>(
    result: &'a AggregationResult,
    cell: fn(Metric) -> String,
) -> impl Iterator<Item = Vec<String>> + 'a {
    result.iter().map(move |(key, row)| {
        key.values()
            .iter()
            .map(|k| k.to_string())
            .chain(row.values.iter().map(|m| cell(*m)))
            .collect()
    })
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export an aggregation result with one column per dimension and metric.
pub fn write_result_csv(path: &Path, result: &AggregationResult) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header(result))?;
    for row in rows(result, csv_cell) {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_result(result: &AggregationResult, max_rows: usize) {
    if result.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(header(result));
    for row in rows(result, display_cell).take(max_rows) {
        builder.push_record(row);
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}\n", table_str);
    if result.len() > max_rows {
        println!("({} of {} groups shown)\n", max_rows, format_int(result.len()));
    }
}

/// Print a ranking as `Rank | key | metric`.
pub fn preview_ranked(groups: &[RankedGroup<'_>], metric: &str) {
    if groups.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["Rank".to_string(), "Group".to_string(), metric.to_string()]);
    for (idx, g) in groups.iter().enumerate() {
        builder.push_record([
            (idx + 1).to_string(),
            g.key.to_string(),
            display_cell(Metric::Value(g.value)),
        ]);
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
