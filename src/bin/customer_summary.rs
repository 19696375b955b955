//! Customer Summary - console report over the derived metrics CSV
//!
//! Run: ./target/release/customer_summary [section]
//! Sections: all, counts, tips, spend

use anyhow::{Context, Result};
use clap::Parser;
use customer_metrics::summary::{
    count_by_category, mean_by_category, CategoryStat, LOCATION_ORDER, TERM_ORDER, TYPE_ORDER,
};
use customer_metrics::table::delimiter_byte;
use customer_metrics::CustomerTable;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "customer_summary")]
#[command(about = "Print counts and averages of derived customer metrics")]
struct Args {
    /// Report section: all, counts, tips, spend
    #[arg(default_value = "all")]
    section: String,

    /// Derived CSV path
    #[arg(long, default_value = "data/updated_customer_summary.csv")]
    input: PathBuf,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(70));
    println!("  {}", title);
    println!("{}\n", "═".repeat(70));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(60));
}

fn print_counts(table: &CustomerTable, column: &str, order: &[&str]) -> Result<()> {
    let counts = count_by_category(table, column, Some(order))?;
    let total: usize = counts.iter().map(|c| c.count).sum();
    for c in &counts {
        let pct = if total > 0 {
            c.count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        println!("  {:<14} {:>10} {:>9.1}%", c.category, c.count, pct);
    }
    let unassigned = table.len().saturating_sub(total);
    println!("  {:<14} {:>10}", "(undefined)", unassigned);
    Ok(())
}

fn print_means(stats: &[CategoryStat], as_percent: bool) {
    println!("  {:<14} {:>10} {:>12}", "category", "customers", "mean");
    for s in stats {
        let mean = match (s.mean, as_percent) {
            (Some(m), true) => format!("{:.1}%", m * 100.0),
            (Some(m), false) => format!("{:.4}", m),
            (None, _) => "-".to_string(),
        };
        println!("  {:<14} {:>10} {:>12}", s.category, s.count, mean);
    }
}

fn run_counts_section(table: &CustomerTable) -> Result<()> {
    print_section_header("1. CUSTOMER COUNTS");

    print_subsection("By Customer Type");
    print_counts(table, "customer_type", &TYPE_ORDER)?;

    print_subsection("By Customer Term (recently active only)");
    print_counts(table, "customer_term", &TERM_ORDER)?;

    print_subsection("By Customer Term (all customers)");
    print_counts(table, "customer_term_full", &TERM_ORDER)?;

    print_subsection("By Preferred Location");
    print_counts(table, "preferred_location", &LOCATION_ORDER)?;
    Ok(())
}

fn run_tips_section(table: &CustomerTable) -> Result<()> {
    print_section_header("2. AVERAGE TIP PERCENTAGE");

    for (title, column, order) in [
        ("By Customer Type", "customer_type", &TYPE_ORDER[..]),
        ("By Customer Term", "customer_term", &TERM_ORDER[..]),
        ("By Preferred Location", "preferred_location", &LOCATION_ORDER[..]),
    ] {
        print_subsection(title);
        let stats = mean_by_category(table, column, "avg_tip_percentage", Some(order))?;
        print_means(&stats, true);
    }
    Ok(())
}

fn run_spend_section(table: &CustomerTable) -> Result<()> {
    print_section_header("3. FAVORITE SPEND RATIOS");

    for (title, value_column) in [
        ("Favorite Category Share by Customer Term", "favorite_category_spend_ratio"),
        ("Favorite Item Share by Customer Term", "favorite_item_spend_ratio"),
    ] {
        print_subsection(title);
        let stats = mean_by_category(table, "customer_term", value_column, Some(&TERM_ORDER[..]))?;
        print_means(&stats, false);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let delimiter = delimiter_byte(args.delimiter)?;
    let table = CustomerTable::from_path(&args.input, delimiter)
        .with_context(|| format!("reading {:?}", args.input))?;

    println!("\n{}", "█".repeat(70));
    println!("  CUSTOMER METRICS SUMMARY  ({} customers)", table.len());
    println!("{}", "█".repeat(70));

    match args.section.as_str() {
        "all" => {
            run_counts_section(&table)?;
            run_tips_section(&table)?;
            run_spend_section(&table)?;
        }
        "counts" => run_counts_section(&table)?,
        "tips" => run_tips_section(&table)?,
        "spend" => run_spend_section(&table)?,
        other => {
            println!("Unknown section: {}", other);
            println!("Available: all, counts, tips, spend");
        }
    }

    println!("\n{}", "█".repeat(70));
    Ok(())
}
