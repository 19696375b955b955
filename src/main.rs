//! Derive customer metrics from a customer summary CSV
//!
//! Usage:
//!   cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --input <PATH>       Customer summary CSV (default: data/20241029-customer-summary.csv)
//!   --output <PATH>      Augmented CSV (default: data/updated_customer_summary.csv)
//!   --config <PATH>      JSON file overriding term windows / recency gate
//!   --delimiter <CHAR>   Field separator (default: ,)

use anyhow::{Context, Result};
use clap::Parser;
use customer_metrics::summary::{count_by_category, TERM_ORDER, TYPE_ORDER};
use customer_metrics::table::delimiter_byte;
use customer_metrics::{CustomerMetricsDeriver, CustomerTable, MetricsConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "customer_metrics")]
#[command(about = "Derive tip, tenure, location and spend-ratio metrics per customer")]
struct Args {
    /// Input CSV path
    #[arg(long, default_value = "data/20241029-customer-summary.csv")]
    input: PathBuf,

    /// Output CSV path
    #[arg(long, default_value = "data/updated_customer_summary.csv")]
    output: PathBuf,

    /// Optional JSON config with term windows and recency gate
    #[arg(long)]
    config: Option<PathBuf>,

    /// Field delimiter for both input and output
    #[arg(long, default_value = ",")]
    delimiter: char,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let delimiter = delimiter_byte(args.delimiter)?;

    let config = MetricsConfig::load(args.config.as_deref())
        .with_context(|| format!("loading config {:?}", args.config))?;
    let deriver = CustomerMetricsDeriver::new(config);
    let config = deriver.config();
    info!(
        "Recency gate {} to {}, {} term windows",
        config.recency_gate.start,
        config.recency_gate.end,
        config.term_windows.len()
    );

    info!("Reading customer summary from {:?}", args.input);
    let table = CustomerTable::from_path(&args.input, delimiter)
        .with_context(|| format!("reading {:?}", args.input))?;
    info!("Read {} customer rows", table.len());

    let output = deriver
        .derive_table(&table)
        .with_context(|| format!("deriving metrics for {:?}", args.input))?;

    output
        .write_path(&args.output, delimiter)
        .with_context(|| format!("writing {:?}", args.output))?;
    info!("Wrote {} rows to {:?}", output.len(), args.output);

    for (column, order) in [
        ("customer_type", &TYPE_ORDER[..]),
        ("customer_term", &TERM_ORDER[..]),
    ] {
        let counts = count_by_category(&output, column, Some(order))?;
        let line = counts
            .iter()
            .map(|c| format!("{}={}", c.category, c.count))
            .collect::<Vec<_>>()
            .join(", ");
        info!("{}: {}", column, line);
    }

    Ok(())
}
