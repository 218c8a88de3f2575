//! quantsim CLI — download, backtest, and optimize commands.
//!
//! Commands:
//! - `download` — fetch Binance klines and write the CSV cache
//! - `backtest` — run one strategy from a JSON parameter set, print metrics JSON
//! - `optimize` — walk-forward random search, then out-of-sample evaluation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use quantsim_core::data::{load_or_fetch, save_csv, split_by_ratio, BinanceProvider, DataProvider, Interval};
use quantsim_runner::config::QuantsimConfig;
use quantsim_runner::pipeline::{load_bars, run_pipeline};
use quantsim_runner::runner::{run_backtest, StrategyParams};

#[derive(Parser)]
#[command(
    name = "quantsim",
    about = "quantsim — single-instrument bar-by-bar backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download Binance spot klines into a CSV cache.
    Download {
        /// Trading pair, e.g. BTCUSDT.
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,

        /// Kline interval (1m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 12h, 1d, 1w).
        #[arg(long, default_value = "1h")]
        interval: Interval,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2018-01-01")]
        start: NaiveDate,

        /// End date (YYYY-MM-DD). Defaults to now.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// CSV cache path.
        #[arg(long)]
        cache: PathBuf,

        /// Re-download even if the cache exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Run one strategy and print its metrics as JSON.
    Backtest {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy parameters: a JSON file path or an inline JSON object.
        #[arg(long)]
        params: String,

        /// Which chronological split to run on.
        #[arg(long, value_enum, default_value_t = SplitArg::All)]
        split: SplitArg,
    },
    /// Optimize on the training split and evaluate on test and validation.
    Optimize {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitArg {
    All,
    Train,
    Test,
    Validation,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbol,
            interval,
            start,
            end,
            cache,
            force,
        } => run_download(&symbol, interval, start, end, &cache, force),
        Commands::Backtest {
            config,
            params,
            split,
        } => run_backtest_cmd(config.as_deref(), &params, split),
        Commands::Optimize { config } => run_optimize(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<QuantsimConfig> {
    match path {
        Some(path) => QuantsimConfig::load(path)
            .with_context(|| format!("invalid config {}", path.display())),
        None => Ok(QuantsimConfig::default()),
    }
}

fn run_download(
    symbol: &str,
    interval: Interval,
    start: NaiveDate,
    end: Option<NaiveDate>,
    cache: &Path,
    force: bool,
) -> Result<()> {
    let start = start.and_time(NaiveTime::MIN).and_utc();
    let end = end
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(Utc::now);
    let provider = BinanceProvider::new()?;

    let bars = if force {
        let bars = provider.fetch(symbol, interval, start, end)?;
        save_csv(cache, &bars)?;
        bars
    } else {
        load_or_fetch(cache, &provider, symbol, interval, start, end)?
    };

    println!(
        "{} {} bars for {symbol} ({interval}) in {}",
        bars.len(),
        if force { "downloaded" } else { "cached" },
        cache.display()
    );
    Ok(())
}

fn parse_params(arg: &str) -> Result<StrategyParams> {
    let path = Path::new(arg);
    let json = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read params {}", path.display()))?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&json).context("params must be a JSON object of strategy parameters")
}

fn run_backtest_cmd(config_path: Option<&Path>, params: &str, split: SplitArg) -> Result<()> {
    let config = load_config(config_path)?;
    let params = parse_params(params)?;
    let provider = BinanceProvider::new()?;
    let bars = load_bars(&config, &provider)?;

    let parts = split_by_ratio(&bars, config.split.train, config.split.test)?;
    let selected = match split {
        SplitArg::All => &bars[..],
        SplitArg::Train => parts.train,
        SplitArg::Test => parts.test,
        SplitArg::Validation => parts.validation,
    };

    let result = run_backtest(selected, &params, &config.simulation, config.periods_per_year())?;
    println!("{}", serde_json::to_string_pretty(&result.metrics)?);
    Ok(())
}

fn run_optimize(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = BinanceProvider::new()?;
    let output = run_pipeline(&config, &provider)?;

    println!("Best parameters:");
    println!("{}", serde_json::to_string_pretty(&output.best_params)?);
    if let Some(best) = output.search.best_value() {
        println!("Best Calmar (train): {best:.4}");
    }
    println!("\nTEST:");
    println!("{}", serde_json::to_string_pretty(&output.test.metrics)?);
    println!("\nVALIDATION:");
    println!("{}", serde_json::to_string_pretty(&output.validation.metrics)?);
    println!("\nArtifacts saved to: {}", output.output_dir.display());
    Ok(())
}
