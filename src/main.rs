mod analysis;
mod bars;
mod cache;
mod candle;
mod comfy_table;
mod error;
mod indicators;
mod klines;
mod loader;
mod narrative;
mod report;
mod storage_utils;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::analysis::RunOptions;
use crate::bars::Period;
use crate::error::LoadError;

/// Daily report for one ticker: K-line shapes, EMA/MACD/RSI readings and a
/// plain-language interpretation of the last five sessions.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Ticker symbol, e.g. TSLA, AAPL, 0700.HK. Defaults to config.json.
    symbol: Option<String>,

    /// Lookback period.
    #[arg(short, long, value_enum)]
    period: Option<Period>,

    /// Storage directory for config.json and saved reports.
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Print only; do not write the JSON report or the CSV table.
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let options = RunOptions {
        symbol: cli.symbol,
        period: cli.period,
        storage_dir: cli.storage,
        save: !cli.no_save,
    };

    if let Err(e) = analysis::run_report_pipeline(options).await {
        match e.downcast_ref::<LoadError>() {
            Some(LoadError::NoData { symbol }) => {
                eprintln!(
                    "No data found for {}: check the symbol or your network connection.",
                    symbol
                );
            }
            Some(LoadError::InvalidSymbol(raw)) => {
                eprintln!("{:?} is not a valid ticker symbol.", raw);
            }
            _ => eprintln!("Error generating report: {:#}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}
