//! Random parameter search over the walk-forward objective.
//!
//! Trials are sampled up front, each from its own RNG derived from the master
//! seed and the trial number, then evaluated in parallel with rayon. The same
//! seed gives the same trials and scores regardless of thread count.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use quantsim_core::domain::Bar;
use quantsim_core::signals::SignalParams;

use crate::config::{SearchConfig, SimulationConfig};
use crate::runner::StrategyParams;
use crate::walk_forward::{evaluate_walk_forward, TrialOutcome};

// ─── Search space ────────────────────────────────────────────────────

/// Inclusive integer range, written `[min, max]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange(pub usize, pub usize);

/// Inclusive float range, written `[min, max]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange(pub f64, pub f64);

impl IntRange {
    fn sample<R: Rng>(self, rng: &mut R) -> usize {
        rng.gen_range(self.0..=self.1)
    }
}

impl FloatRange {
    fn sample<R: Rng>(self, rng: &mut R) -> f64 {
        rng.gen_range(self.0..=self.1)
    }

    /// Uniform over the grid `min, min + step, ..., max`.
    fn sample_stepped<R: Rng>(self, step: f64, rng: &mut R) -> f64 {
        let first = (self.0 / step).round() as i64;
        let last = (self.1 / step).round() as i64;
        let k = rng.gen_range(first..=last);
        // Snap to 9 decimals so 3 * 0.1 reads back as 0.3.
        (k as f64 * step * 1e9).round() / 1e9
    }
}

/// Ranges for every tunable strategy parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub rsi_window: IntRange,
    pub rsi_low: IntRange,
    pub rsi_high: IntRange,
    pub sma_fast: IntRange,
    pub sma_slow: IntRange,
    pub macd_fast: IntRange,
    pub macd_slow: IntRange,
    pub macd_signal: IntRange,
    pub stop_loss: FloatRange,
    pub take_profit: FloatRange,
    pub n_shares: FloatRange,
    pub n_shares_step: f64,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            rsi_window: IntRange(8, 20),
            rsi_low: IntRange(20, 40),
            rsi_high: IntRange(60, 80),
            sma_fast: IntRange(8, 40),
            sma_slow: IntRange(50, 120),
            macd_fast: IntRange(8, 14),
            macd_slow: IntRange(18, 30),
            macd_signal: IntRange(5, 12),
            stop_loss: FloatRange(0.006, 0.03),
            take_profit: FloatRange(0.02, 0.06),
            n_shares: FloatRange(0.1, 5.0),
            n_shares_step: 0.1,
        }
    }
}

impl SearchSpace {
    /// Every range must be non-empty; float ranges finite.
    pub fn validate(&self) -> Result<(), String> {
        let ints = [
            ("rsi_window", self.rsi_window),
            ("rsi_low", self.rsi_low),
            ("rsi_high", self.rsi_high),
            ("sma_fast", self.sma_fast),
            ("sma_slow", self.sma_slow),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ];
        for (name, IntRange(lo, hi)) in ints {
            if lo > hi {
                return Err(format!("{name}: min {lo} > max {hi}"));
            }
        }
        let floats = [
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
            ("n_shares", self.n_shares),
        ];
        for (name, FloatRange(lo, hi)) in floats {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(format!("{name}: invalid range [{lo}, {hi}]"));
            }
        }
        if !(self.n_shares_step.is_finite() && self.n_shares_step > 0.0) {
            return Err(format!("n_shares_step must be positive, got {}", self.n_shares_step));
        }
        Ok(())
    }

    /// Draw one strategy. Draw order is fixed so a seed always maps to the
    /// same parameters.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> StrategyParams {
        let signal = SignalParams {
            rsi_window: self.rsi_window.sample(rng),
            rsi_low: self.rsi_low.sample(rng) as f64,
            rsi_high: self.rsi_high.sample(rng) as f64,
            sma_fast: self.sma_fast.sample(rng),
            sma_slow: self.sma_slow.sample(rng),
            macd_fast: self.macd_fast.sample(rng),
            macd_slow: self.macd_slow.sample(rng),
            macd_signal: self.macd_signal.sample(rng),
        };
        StrategyParams {
            signal,
            stop_loss: self.stop_loss.sample(rng),
            take_profit: self.take_profit.sample(rng),
            n_shares: self.n_shares.sample_stepped(self.n_shares_step, rng),
        }
    }
}

/// Deterministic RNG for one trial.
///
/// The sub-seed is a BLAKE3 hash of (master seed, trial number), so it does
/// not depend on the order in which trials are drawn.
pub fn trial_rng(master_seed: u64, trial: usize) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(&(trial as u64).to_le_bytes());
    let hash = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(hash.as_bytes());
    StdRng::from_seed(seed)
}

// ─── Results ─────────────────────────────────────────────────────────

/// One evaluated parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub number: usize,
    pub params: StrategyParams,
    pub outcome: TrialOutcome,
    pub duration_ms: u64,
}

/// All trials from a search, in trial-number order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub trials: Vec<Trial>,
}

impl SearchResult {
    /// Highest-scoring completed trial; ties go to the lower trial number.
    pub fn best_trial(&self) -> Option<&Trial> {
        self.trials
            .iter()
            .filter_map(|t| t.outcome.score().map(|s| (t, s)))
            .fold(None, |best: Option<(&Trial, f64)>, (t, s)| match best {
                Some((_, best_score)) if best_score >= s => best,
                _ => Some((t, s)),
            })
            .map(|(t, _)| t)
    }

    pub fn best_params(&self) -> Option<StrategyParams> {
        self.best_trial().map(|t| t.params)
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().and_then(|t| t.outcome.score())
    }

    pub fn completed(&self) -> usize {
        self.trials.iter().filter(|t| !t.outcome.is_pruned()).count()
    }

    pub fn pruned(&self) -> usize {
        self.trials.len() - self.completed()
    }
}

// ─── Search ──────────────────────────────────────────────────────────

/// Sample `n_trials` strategies and score each on `train` in parallel.
pub fn random_search(train: &[Bar], sim: &SimulationConfig, search: &SearchConfig) -> SearchResult {
    let candidates: Vec<StrategyParams> = (0..search.n_trials)
        .map(|i| search.space.sample(&mut trial_rng(search.seed, i)))
        .collect();

    tracing::info!(
        trials = search.n_trials,
        seed = search.seed,
        bars = train.len(),
        threads = rayon::current_num_threads(),
        "starting random search"
    );

    let trials: Vec<Trial> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(number, params)| {
            let started = Instant::now();
            let outcome = evaluate_walk_forward(train, &params, sim, &search.walk_forward);
            let duration_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                TrialOutcome::Completed { score, .. } => {
                    tracing::debug!(trial = number, score, duration_ms, "trial completed")
                }
                TrialOutcome::Pruned(reason) => {
                    tracing::debug!(trial = number, %reason, "trial pruned")
                }
            }
            Trial {
                number,
                params,
                outcome,
                duration_ms,
            }
        })
        .collect();

    let result = SearchResult { trials };
    match result.best_trial() {
        Some(best) => tracing::info!(
            completed = result.completed(),
            pruned = result.pruned(),
            best_trial = best.number,
            best_value = best.outcome.score().unwrap_or(f64::NAN),
            "search finished"
        ),
        None => tracing::warn!(pruned = result.pruned(), "search finished with no completed trial"),
    }
    result
}
