// CLI entry point.
//
// - `load` normalizes the CSV and prints the data-quality report.
// - `report` builds every rollup, exports CSV files plus a JSON summary and
//   prints markdown previews.
// - `kpi` prints the headline indicators only.
// - `menu` (the default) is the interactive loop: [1] load, [2] reports.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use superstore_report::config::{Config, LogFormat};
use superstore_report::output;
use superstore_report::reports::{SalesReport, PROFIT_MARGIN, TOTAL_SALES};
use superstore_report::types::{KpiRow, QualityRow, SegmentCountRow};
use superstore_report::util::{format_int, format_number};
use superstore_report::{Dataset, KpiSummary, Metric};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "superstore_report")]
#[command(about = "Sales analytics rollups, segments and KPIs", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Input CSV (overrides the config file)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Directory for exported CSV/JSON files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Drop repeated full rows before aggregating
    #[arg(long, global = true)]
    dedupe: bool,

    /// First order date to include (YYYY-MM-DD)
    #[arg(long, global = true)]
    start: Option<NaiveDate>,

    /// Last order date to include (YYYY-MM-DD)
    #[arg(long, global = true)]
    end: Option<NaiveDate>,

    /// Only records of this category
    #[arg(long, global = true)]
    category: Option<String>,

    /// Only records of this region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Size of top-N rankings
    #[arg(long, global = true)]
    top_n: Option<usize>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and clean the dataset, printing diagnostics
    Load,
    /// Generate every report and the JSON summary
    Report,
    /// Print headline KPIs
    Kpi,
    /// Interactive menu
    Menu,
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(input) = &cli.input {
        config.input = input.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if cli.dedupe {
        config.dedupe = true;
    }
    if let Some(n) = cli.top_n {
        config.top_n = n;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.filter.start = cli.start.or(config.filter.start);
    config.filter.end = cli.end.or(config.filter.end);
    if cli.category.is_some() {
        config.filter.category = cli.category.clone();
    }
    if cli.region.is_some() {
        config.filter.region = cli.region.clone();
    }
    Ok(config)
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

/// Print `label` and read one trimmed line from stdin; `None` at end of input.
fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    io::stdout().flush().ok();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// Y/N after a report run; `true` returns to the menu.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to Report Selection (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Please answer Y or N."),
        }
    }
}

/// Load, clean and filter the dataset, printing a short data-quality summary.
fn handle_load(config: &Config) -> Result<Dataset> {
    let dataset = Dataset::load(&config.input, config.normalize_options())
        .with_context(|| format!("loading {}", config.input.display()))?;
    let report = dataset.report();

    println!(
        "Processing dataset... ({} rows read, {} kept)",
        format_int(report.total_rows),
        format_int(report.kept_rows)
    );
    let row = |check: &str, rows: usize| QualityRow {
        check: check.to_string(),
        rows: format_int(rows),
    };
    let quality = vec![
        row("Dropped (missing/invalid field)", report.dropped_rows),
        row("Malformed", report.malformed_rows),
        row("Duplicates seen", report.duplicate_rows),
        row("Duplicates removed", report.removed_duplicates),
        row("Missing cells", report.missing_values),
        row("Unparseable order dates", report.unparseable_order_dates),
        row("Unparseable ship dates", report.unparseable_ship_dates),
    ];
    output::preview_table_rows(&quality, quality.len());

    if let Some((first, last)) = dataset.order_date_span() {
        println!("Date Range: {} to {}\n", first, last);
    }

    let filtered = dataset.filter(&config.filter)?;
    if !config.filter.is_empty() {
        println!(
            "Filter applied: {} of {} records remain.\n",
            format_int(filtered.len()),
            format_int(dataset.len())
        );
    }
    if filtered.is_empty() {
        warn!("no records left to analyse");
    }
    Ok(filtered)
}

fn kpi_rows(kpis: &KpiSummary) -> Vec<KpiRow> {
    kpis.to_map()
        .into_iter()
        .map(|(name, value)| KpiRow {
            name: name.to_string(),
            value: match value {
                Metric::Value(v) => format_number(v, 2),
                Metric::Undefined => "undefined".to_string(),
            },
        })
        .collect()
}

fn handle_kpi(dataset: &Dataset) {
    let rows = kpi_rows(&KpiSummary::compute(dataset));
    println!("Key Performance Indicators\n");
    output::preview_table_rows(&rows, rows.len());
}

/// Line printed under a rollup preview once its CSV export was attempted.
fn export_status(path: &Path, written: &superstore_report::Result<()>) -> String {
    match written {
        Ok(()) => format!("(Full table exported to {})", path.display()),
        Err(e) => format!("(Not exported to {}: {})", path.display(), e),
    }
}

/// Build every rollup, export it and print previews.
///
/// Writes one CSV per rollup, `kpis.csv` and `summary.json` under the
/// configured output directory.
fn handle_generate_reports(config: &Config, dataset: &Dataset) -> Result<()> {
    let report = SalesReport::build(dataset)?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    println!("Generating reports...\n");
    for (stem, result) in report.rollups() {
        let path = config.output_dir.join(format!("{stem}.csv"));
        let written = output::write_result_csv(&path, result);
        println!("{}", stem.replace('_', " "));
        output::preview_result(result, config.preview_rows);
        if let Err(e) = &written {
            warn!(path = %path.display(), error = %e, "rollup export failed");
        }
        println!("{}\n", export_status(&path, &written));
    }

    println!("Top {} Products by Sales", config.top_n);
    output::preview_ranked(&report.top_products(config.top_n)?, TOTAL_SALES);
    println!("Top {} Loss-Making Products", config.top_n);
    output::preview_ranked(&report.loss_making_products(config.top_n)?, TOTAL_SALES);
    println!("Top {} Customers by Sales", config.top_n);
    output::preview_ranked(&report.top_customers(config.top_n)?, TOTAL_SALES);
    println!("Top {} States by Sales", config.top_n);
    output::preview_ranked(&report.top_states(config.top_n)?, TOTAL_SALES);
    println!("Top {} States by Profit Margin", config.top_n);
    output::preview_ranked(&report.top_states_by_margin(config.top_n)?, PROFIT_MARGIN);

    println!("Customer Distribution by Segment");
    let segments: Vec<SegmentCountRow> = report
        .tier_distribution()
        .into_iter()
        .map(|(label, customers)| SegmentCountRow {
            segment: label.unwrap_or_else(|| "undefined".to_string()),
            customers,
        })
        .collect();
    output::preview_table_rows(&segments, segments.len());

    let kpis = kpi_rows(&report.kpis);
    output::write_csv(&config.output_dir.join("kpis.csv"), &kpis)?;
    println!("Key Performance Indicators");
    output::preview_table_rows(&kpis, kpis.len());

    let summary = report.summary(dataset)?;
    let summary_path = config.output_dir.join("summary.json");
    output::write_json(&summary_path, &summary)?;
    println!("Summary Stats ({}):", summary_path.display());
    println!(
        "{{\"best_region\": {:?}, \"best_category\": {:?}, \"avg_product_margin\": {}}}\n",
        summary.best_region.as_deref().unwrap_or("-"),
        summary.best_category.as_deref().unwrap_or("-"),
        summary.avg_product_margin
    );
    info!(
        total_sales = report.kpis.total_sales,
        total_profit = report.kpis.total_profit,
        rollups = report.rollups().len(),
        "reports written"
    );
    Ok(())
}

fn run_menu(config: &Config) {
    // Loaded once, reused for every report run until the user reloads.
    let mut data: Option<Dataset> = None;
    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = prompt("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => match handle_load(config) {
                Ok(ds) => data = Some(ds),
                Err(e) => eprintln!("Failed to load file: {:#}\n", e),
            },
            "2" => {
                println!();
                let Some(ds) = &data else {
                    println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
                    continue;
                };
                if let Err(e) = handle_generate_reports(config, ds) {
                    eprintln!("Report error: {:#}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(&config);

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Load => {
            handle_load(&config)?;
        }
        Commands::Report => {
            let dataset = handle_load(&config)?;
            handle_generate_reports(&config, &dataset)?;
        }
        Commands::Kpi => {
            let dataset = handle_load(&config)?;
            handle_kpi(&dataset);
        }
        Commands::Menu => run_menu(&config),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use superstore_report::reports::state_spec;
    use superstore_report::{aggregate, Dataset};

    #[test]
    fn test_failed_export_is_not_reported_as_written() {
        let result = aggregate(&Dataset::from_sales(Vec::new()), &state_spec()).unwrap();
        let path = std::env::temp_dir()
            .join("superstore_report_missing_dir")
            .join("nested")
            .join("state_analysis.csv");
        let written = output::write_result_csv(&path, &result);
        assert!(written.is_err());
        let line = export_status(&path, &written);
        assert!(line.starts_with("(Not exported to"));
        assert!(!line.contains("Full table exported"));

        assert_eq!(
            export_status(Path::new("out.csv"), &Ok(())),
            "(Full table exported to out.csv)"
        );
    }
}
