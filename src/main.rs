// Shop Analytics - CLI
//
//   shop-analytics import shopifyOrders orders.csv
//   shop-analytics report total-sales --interval monthly
//   shop-analytics collections

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shop_analytics::{
    init_tracing, load_documents, AnalyticsEngine, Config, Granularity, SqliteStore,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shop-analytics", version, about = "E-commerce sales and customer analytics")]
struct Cli {
    /// SQLite database (overrides ANALYTICS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a CSV or JSON export into a collection
    Import {
        collection: String,
        file: PathBuf,
    },
    /// Compute a metric and print it as JSON
    Report {
        #[arg(value_enum)]
        metric: Metric,
        /// daily, monthly, quarterly or yearly
        #[arg(long, short, default_value = "monthly")]
        interval: String,
    },
    /// List collections and document counts
    Collections,
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    TotalSales,
    SalesGrowth,
    NewCustomers,
    RepeatCustomers,
    CustomerGeography,
    CustomerLtv,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing("info");

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Command::Import { collection, file } => run_import(&config, &collection, &file),
        Command::Report { metric, interval } => run_report(&config, metric, &interval),
        Command::Collections => run_collections(&config),
    }
}

fn run_import(config: &Config, collection: &str, file: &Path) -> Result<()> {
    let docs = load_documents(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    tracing::info!(file = %file.display(), documents = docs.len(), "loaded export");

    let mut store = SqliteStore::open(&config.db_path)?;
    let summary = store.insert_documents(collection, &docs)?;

    println!("✓ Inserted: {} documents into {}", summary.inserted, collection);
    println!("✓ Skipped duplicates: {}", summary.duplicates);
    println!("✓ Collection now holds {} documents", store.count(collection)?);

    Ok(())
}

fn run_report(config: &Config, metric: Metric, interval: &str) -> Result<()> {
    // Reject the interval before touching the database
    let granularity: Granularity = interval.parse()?;

    let store = SqliteStore::open(&config.db_path)?;
    let engine = AnalyticsEngine::new(store)
        .with_collections(config.collections.clone())
        .with_geography_limit(config.geography_limit);

    match metric {
        Metric::TotalSales => print_json(&engine.total_sales(granularity)?),
        Metric::SalesGrowth => print_json(&engine.sales_growth(granularity)?),
        Metric::NewCustomers => print_json(&engine.new_customers(granularity)?),
        Metric::RepeatCustomers => print_json(&engine.repeat_customers(granularity)?),
        Metric::CustomerGeography => print_json(&engine.customer_geography()?),
        Metric::CustomerLtv => print_json(&engine.customer_ltv()?),
    }
}

fn run_collections(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    print_json(&store.collections()?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
