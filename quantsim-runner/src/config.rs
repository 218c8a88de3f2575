//! TOML pipeline configuration.
//!
//! Every section is optional and falls back to the defaults of the reference
//! BTCUSDT hourly pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quantsim_core::data::Interval;
use quantsim_core::engine::params::{
    DEFAULT_FEE_RATE, DEFAULT_INITIAL_CASH, DEFAULT_MAX_NOTIONAL, DEFAULT_MIN_QUANTITY,
};

use crate::sweep::SearchSpace;
use crate::walk_forward::WalkForwardConfig;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Top-level configuration for download, backtest and optimize commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantsimConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub simulation: SimulationConfig,
    pub metrics: MetricsConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

impl QuantsimConfig {
    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.symbol.trim().is_empty() {
            return Err(ConfigError::invalid("data.symbol", "must not be empty"));
        }
        if let Some(end) = self.data.end {
            if end <= self.data.start {
                return Err(ConfigError::invalid(
                    "data.end",
                    format!("{end} is not after start {}", self.data.start),
                ));
            }
        }

        let SplitConfig { train, test } = self.split;
        if !(train > 0.0 && test >= 0.0 && train + test <= 1.0) {
            return Err(ConfigError::invalid(
                "split",
                format!("train={train}, test={test} must satisfy 0 < train, train + test <= 1"),
            ));
        }

        self.simulation
            .sim_params(0.02, 0.04, 1.0)
            .validate()
            .map_err(|e| ConfigError::invalid("simulation", e.to_string()))?;

        if let Some(ppy) = self.metrics.periods_per_year {
            if !(ppy.is_finite() && ppy > 0.0) {
                return Err(ConfigError::invalid("metrics.periods_per_year", "must be positive"));
            }
        }

        if self.search.n_trials == 0 {
            return Err(ConfigError::invalid("search.n_trials", "must be at least 1"));
        }
        if self.search.walk_forward.n_splits == 0 {
            return Err(ConfigError::invalid("search.n_splits", "must be at least 1"));
        }
        self.search
            .space
            .validate()
            .map_err(|reason| ConfigError::invalid("search.space", reason))?;
        Ok(())
    }

    /// Annualisation factor: explicit value, else derived from the bar interval.
    pub fn periods_per_year(&self) -> f64 {
        self.metrics
            .periods_per_year
            .unwrap_or_else(|| self.data.interval.periods_per_year())
    }
}

/// `[data]`: market, range and cache location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub symbol: String,
    pub interval: Interval,
    pub start: NaiveDate,
    /// Inclusive of everything before this date; `None` means now.
    pub end: Option<NaiveDate>,
    pub cache: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: Interval::Hour1,
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            end: None,
            cache: PathBuf::from("data/BTCUSDT_1h.csv"),
        }
    }
}

impl DataConfig {
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or_else(Utc::now)
    }
}

/// `[split]`: chronological train / test ratios; validation takes the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train: f64,
    pub test: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train: 0.6,
            test: 0.2,
        }
    }
}

/// `[simulation]`: account settings shared by every trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub fee_rate: f64,
    pub initial_cash: f64,
    pub max_notional: f64,
    pub min_quantity: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fee_rate: DEFAULT_FEE_RATE,
            initial_cash: DEFAULT_INITIAL_CASH,
            max_notional: DEFAULT_MAX_NOTIONAL,
            min_quantity: DEFAULT_MIN_QUANTITY,
        }
    }
}

impl SimulationConfig {
    /// Engine parameters for one strategy's stop / target / size.
    pub fn sim_params(
        &self,
        stop_loss: f64,
        take_profit: f64,
        target_quantity: f64,
    ) -> quantsim_core::SimParams {
        quantsim_core::SimParams::new(stop_loss, take_profit, target_quantity)
            .with_fee_rate(self.fee_rate)
            .with_initial_cash(self.initial_cash)
            .with_max_notional(self.max_notional)
            .with_min_quantity(self.min_quantity)
    }
}

/// `[metrics]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub periods_per_year: Option<f64>,
}

/// `[search]` and `[search.space]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub n_trials: usize,
    pub seed: u64,
    #[serde(flatten)]
    pub walk_forward: WalkForwardConfig,
    pub space: SearchSpace,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_trials: 60,
            seed: 42,
            walk_forward: WalkForwardConfig::default(),
            space: SearchSpace::default(),
        }
    }
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
        }
    }
}
