//! Coinflow CLI — ad hoc pipeline invocation.
//!
//! Commands:
//! - `fetch` — refresh every series for a symbol (anchor first, then auxiliaries)
//! - `merge` — build and persist the combined training table
//! - `stream` — print live trades for a while, then close the subscription
//! - `cache status` — report cached series, row counts, and time ranges

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinflow_core::stream::TradeStream;
use coinflow_core::{Config, DataManager, Interval};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "coinflow", about = "Coinflow CLI — crypto data ingestion pipeline")]
struct Cli {
    /// Path to a TOML config file. Defaults to built-in paths and endpoints.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and cache every series for a symbol.
    Fetch {
        /// Trading pair (e.g. BTCUSDT).
        symbol: String,

        /// Kline interval (e.g. 4h, 1d).
        #[arg(long, default_value = "4h")]
        interval: String,
    },
    /// Merge the cached series into the combined training table.
    Merge {
        /// Trading pair (e.g. BTCUSDT).
        symbol: String,

        /// Kline interval (e.g. 4h, 1d).
        #[arg(long, default_value = "4h")]
        interval: String,
    },
    /// Print live trades for a symbol.
    Stream {
        /// Trading pair (e.g. BTCUSDT).
        symbol: String,

        /// How long to stream before closing, in seconds.
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached series, row counts, and time ranges.
    Status {
        /// Trading pair (e.g. BTCUSDT).
        symbol: String,

        /// Kline interval (e.g. 4h, 1d).
        #[arg(long, default_value = "4h")]
        interval: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Fetch { symbol, interval } => run_fetch(&config, &symbol, &interval),
        Commands::Merge { symbol, interval } => run_merge(&config, &symbol, &interval),
        Commands::Stream { symbol, seconds } => run_stream(&config, &symbol, seconds),
        Commands::Cache { action } => match action {
            CacheAction::Status { symbol, interval } => run_status(&config, &symbol, &interval),
        },
    }
}

fn parse_interval(spec: &str) -> Result<Interval> {
    spec.parse::<Interval>()
        .with_context(|| format!("unsupported interval {spec:?}"))
}

fn run_fetch(config: &Config, symbol: &str, interval: &str) -> Result<()> {
    let manager = DataManager::new(config, symbol, parse_interval(interval)?)?;
    manager.fetch_and_store_all()?;
    println!("Fetch complete for {}", symbol.to_uppercase());
    Ok(())
}

fn run_merge(config: &Config, symbol: &str, interval: &str) -> Result<()> {
    let manager = DataManager::new(config, symbol, parse_interval(interval)?)?;
    let combined = manager.merge_for_training()?;
    if combined.is_empty() {
        println!("Nothing to merge — run `fetch {}` first", symbol.to_uppercase());
    } else {
        println!(
            "Merged {} rows into {}",
            combined.len(),
            manager
                .cache()
                .file_path(coinflow_core::DataKind::Combined)
                .display()
        );
    }
    Ok(())
}

fn run_stream(config: &Config, symbol: &str, seconds: u64) -> Result<()> {
    let stream = TradeStream::new(&config.api.binance_ws_url);
    let subscription = stream.subscribe(symbol)?;
    let deadline = Instant::now() + Duration::from_secs(seconds);

    while Instant::now() < deadline {
        if let Some(trade) = subscription.next_timeout(Duration::from_millis(500)) {
            println!(
                "{} | Price: {} | Qty: {}",
                trade.timestamp, trade.price, trade.quantity
            );
        }
    }

    let dropped = subscription.dropped_trades();
    subscription.close();
    if dropped > 0 {
        eprintln!("Warning: {dropped} trades dropped (slow consumer)");
    }
    Ok(())
}

fn run_status(config: &Config, symbol: &str, interval: &str) -> Result<()> {
    let manager = DataManager::new(config, symbol, parse_interval(interval)?)?;
    println!(
        "Cache status for {} {} under {}:",
        manager.cache().symbol(),
        interval,
        config.data_paths.raw.display()
    );
    for status in manager.cache().status() {
        if status.cached {
            match (status.row_count, status.start, status.end) {
                (Some(rows), Some(start), Some(end)) => {
                    println!("  {:<12} {rows:>8} rows  {start} .. {end}", status.kind.to_string());
                }
                _ => println!("  {:<12} cached (no metadata)", status.kind.to_string()),
            }
        } else {
            println!("  {:<12} —", status.kind.to_string());
        }
    }
    Ok(())
}
