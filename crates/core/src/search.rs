//! Monte Carlo search over random long-only weight vectors.
//!
//! Each draw samples N uniforms and normalizes them onto the simplex, then scores the
//! resulting portfolio. Instruments are treated as uncorrelated (diagonal covariance).
//! Draws are evaluated in fixed-size chunks, each with its own seeded generator, so the
//! scored population is identical regardless of how rayon schedules the chunks.

use crate::domain::instrument::Universe;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::fmt;
use std::time::{Duration, Instant};

/// One-sided 95% z-score for parametric VaR.
pub const VAR_95_Z: f64 = 1.645;

const CHUNK_DRAWS: usize = 512;

/// Per-request knobs shared by every search an optimizer runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub seed: u64,
    /// Daily risk-free rate.
    pub risk_free_rate: f64,
    pub deadline: Option<Duration>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            risk_free_rate: 0.0001,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub draws: usize,
    pub risk_free_rate: f64,
    pub include_var: bool,
    pub seed: u64,
    pub deadline: Option<Duration>,
}

impl SearchConfig {
    pub fn new(settings: &SearchSettings, draws: usize, include_var: bool) -> Self {
        Self {
            draws,
            risk_free_rate: settings.risk_free_rate,
            include_var,
            seed: settings.seed,
            deadline: settings.deadline,
        }
    }

    pub fn with_draws(self, draws: usize) -> Self {
        Self { draws, ..self }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioCandidate {
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub var_95: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    DeadlineExceeded { elapsed: Duration, deadline: Duration },
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::DeadlineExceeded { elapsed, deadline } => write!(
                f,
                "search deadline exceeded (elapsed={}ms, deadline={}ms)",
                elapsed.as_millis(),
                deadline.as_millis()
            ),
        }
    }
}

impl std::error::Error for SearchError {}

/// Scores `config.draws` random portfolios over `universe`, best first.
///
/// Ordering is Sharpe descending; with `include_var`, ties go to the lower VaR.
pub fn search(
    universe: &Universe,
    config: &SearchConfig,
) -> Result<Vec<PortfolioCandidate>, SearchError> {
    if universe.is_empty() || config.draws == 0 {
        return Ok(Vec::new());
    }

    let returns = universe.mean_returns();
    let variances: Vec<f64> = universe.volatilities().iter().map(|v| v * v).collect();

    let started = Instant::now();
    let n_chunks = (config.draws + CHUNK_DRAWS - 1) / CHUNK_DRAWS;

    let chunks: Vec<Option<Vec<PortfolioCandidate>>> = (0..n_chunks)
        .into_par_iter()
        .map(|chunk_idx| {
            if let Some(deadline) = config.deadline {
                if started.elapsed() >= deadline {
                    return None;
                }
            }

            let start = chunk_idx * CHUNK_DRAWS;
            let end = (start + CHUNK_DRAWS).min(config.draws);
            let mut rng = chunk_rng(config.seed, chunk_idx);

            let mut out = Vec::with_capacity(end - start);
            for _ in start..end {
                let weights = draw_weights(&mut rng, returns.len());
                out.push(score(weights, &returns, &variances, config));
            }
            Some(out)
        })
        .collect();

    let mut population = Vec::with_capacity(config.draws);
    for chunk in chunks {
        match chunk {
            Some(candidates) => population.extend(candidates),
            None => {
                let elapsed = started.elapsed();
                let deadline = config.deadline.unwrap_or_default();
                tracing::warn!(
                    class = %universe.class(),
                    draws = config.draws,
                    elapsed_ms = elapsed.as_millis(),
                    "monte carlo search hit its deadline"
                );
                return Err(SearchError::DeadlineExceeded { elapsed, deadline });
            }
        }
    }

    sort_candidates(&mut population, config.include_var);

    tracing::debug!(
        class = %universe.class(),
        instruments = universe.len(),
        draws = config.draws,
        best_sharpe = population.first().map(|c| c.sharpe_ratio),
        elapsed_ms = started.elapsed().as_millis(),
        "monte carlo search completed"
    );

    Ok(population)
}

pub fn best(candidates: &[PortfolioCandidate]) -> Option<&PortfolioCandidate> {
    candidates.first()
}

/// Diagonal-covariance portfolio volatility: sqrt(sum w_i^2 * sigma_i^2).
pub fn volatility(weights: &[f64], variances: &[f64]) -> f64 {
    weights
        .iter()
        .zip(variances)
        .map(|(w, var)| w * w * var)
        .sum::<f64>()
        .sqrt()
}

pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility > 0.0 {
        (expected_return - risk_free_rate) / volatility
    } else {
        0.0
    }
}

pub fn value_at_risk_95(expected_return: f64, volatility: f64) -> f64 {
    -(expected_return - VAR_95_Z * volatility)
}

fn chunk_rng(seed: u64, chunk_idx: usize) -> StdRng {
    // Golden-ratio stride keeps neighbouring chunk seeds far apart.
    StdRng::seed_from_u64(seed ^ (chunk_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn draw_weights<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
    let mut weights: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    } else {
        weights.fill(1.0 / n as f64);
    }
    weights
}

fn score(
    weights: Vec<f64>,
    returns: &[f64],
    variances: &[f64],
    config: &SearchConfig,
) -> PortfolioCandidate {
    let expected_return: f64 = weights.iter().zip(returns).map(|(w, r)| w * r).sum();
    let volatility = volatility(&weights, variances);
    let sharpe_ratio = sharpe_ratio(expected_return, volatility, config.risk_free_rate);
    let var_95 = config
        .include_var
        .then(|| value_at_risk_95(expected_return, volatility));

    PortfolioCandidate {
        weights,
        expected_return,
        volatility,
        sharpe_ratio,
        var_95,
    }
}

fn sort_candidates(population: &mut [PortfolioCandidate], include_var: bool) {
    population.sort_by(|a, b| {
        let by_sharpe = b.sharpe_ratio.total_cmp(&a.sharpe_ratio);
        if !include_var {
            return by_sharpe;
        }
        by_sharpe.then_with(|| {
            let va = a.var_95.unwrap_or(f64::INFINITY);
            let vb = b.var_95.unwrap_or(f64::INFINITY);
            va.total_cmp(&vb)
        })
    });
}
