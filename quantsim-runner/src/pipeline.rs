//! End-to-end optimize pipeline.
//!
//! load → split train/test/validation → random search on train → evaluate
//! the best strategy on test and validation → write artifacts.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use quantsim_core::data::{load_or_fetch, split_by_ratio, DataProvider};
use quantsim_core::domain::Bar;

use crate::config::QuantsimConfig;
use crate::export::{generate_report, save_search_artifacts, save_split_artifacts};
use crate::runner::{run_backtest, BacktestResult, StrategyParams};
use crate::sweep::{random_search, SearchResult};

/// Everything the optimize command produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub search: SearchResult,
    pub best_params: StrategyParams,
    pub test: BacktestResult,
    pub validation: BacktestResult,
    pub output_dir: PathBuf,
}

/// Load bars from the configured cache, downloading on a miss.
pub fn load_bars(config: &QuantsimConfig, provider: &dyn DataProvider) -> Result<Vec<Bar>> {
    let data = &config.data;
    let bars = load_or_fetch(
        &data.cache,
        provider,
        &data.symbol,
        data.interval,
        data.start_time(),
        data.end_time(),
    )
    .with_context(|| format!("failed to load {} {} bars", data.symbol, data.interval))?;
    tracing::info!(
        bars = bars.len(),
        first = ?bars.first().map(|b| b.timestamp),
        last = ?bars.last().map(|b| b.timestamp),
        "data loaded"
    );
    Ok(bars)
}

/// Run the search and out-of-sample evaluation over already loaded bars.
pub fn optimize(bars: &[Bar], config: &QuantsimConfig) -> Result<PipelineOutput> {
    let split = split_by_ratio(bars, config.split.train, config.split.test)?;
    tracing::info!(
        train = split.train.len(),
        test = split.test.len(),
        validation = split.validation.len(),
        "split data"
    );

    let search = random_search(split.train, &config.simulation, &config.search);
    let Some(best_params) = search.best_params() else {
        save_search_artifacts(&search, &config.output.dir)?;
        bail!(
            "all {} trials were pruned; widen the search space or provide more training data",
            search.trials.len()
        );
    };

    let ppy = config.periods_per_year();
    let test = run_backtest(split.test, &best_params, &config.simulation, ppy)
        .context("test evaluation failed")?;
    let validation = run_backtest(split.validation, &best_params, &config.simulation, ppy)
        .context("validation evaluation failed")?;

    let output_dir = config.output.dir.clone();
    save_search_artifacts(&search, &output_dir)?;
    save_split_artifacts("test", &test, &output_dir)?;
    save_split_artifacts("validation", &validation, &output_dir)?;
    let report = generate_report(&search, &[("test", &test), ("validation", &validation)]);
    std::fs::write(output_dir.join("report.md"), report)
        .with_context(|| format!("failed to write report in {}", output_dir.display()))?;

    tracing::info!(dir = %output_dir.display(), "artifacts written");
    Ok(PipelineOutput {
        search,
        best_params,
        test,
        validation,
        output_dir,
    })
}

/// Load, then optimize.
pub fn run_pipeline(config: &QuantsimConfig, provider: &dyn DataProvider) -> Result<PipelineOutput> {
    let bars = load_bars(config, provider)?;
    optimize(&bars, config)
}
