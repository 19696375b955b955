//! Render the standard customer metric charts
//!
//! Reads the CSV written by `customer_metrics` and writes PNG bar charts:
//! average tip % by customer term and by customer type, customer term
//! counts, and favorite category spend ratio by category and term.
//!
//! Usage:
//!   cargo run --release --bin render_charts -- [OPTIONS]

use anyhow::{Context, Result};
use clap::Parser;
use customer_metrics::charts::render_standard_charts;
use customer_metrics::table::delimiter_byte;
use customer_metrics::CustomerTable;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "render_charts")]
#[command(about = "Render bar charts from a derived customer metrics CSV")]
struct Args {
    /// Derived CSV path
    #[arg(long, default_value = "data/updated_customer_summary.csv")]
    input: PathBuf,

    /// Directory for the PNG files
    #[arg(long, default_value = "graphs")]
    out_dir: PathBuf,

    /// Favorite categories kept in the spend ratio chart
    #[arg(long, default_value = "10")]
    top_categories: usize,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let delimiter = delimiter_byte(args.delimiter)?;

    let table = CustomerTable::from_path(&args.input, delimiter)
        .with_context(|| format!("reading {:?}", args.input))?;
    info!("Loaded {} customers from {:?}", table.len(), args.input);

    let written = render_standard_charts(&table, &args.out_dir, args.top_categories)
        .with_context(|| format!("rendering charts into {:?}", args.out_dir))?;

    info!("Rendered {} charts", written.len());
    for path in written {
        info!("  {}", path.display());
    }

    Ok(())
}
