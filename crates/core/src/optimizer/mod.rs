pub mod bond;
pub mod crypto;
pub mod currency;
pub mod equity;
pub mod pruning;

use crate::domain::instrument::{Instrument, InstrumentClass, Universe};
use crate::domain::recommendation::{ClassRecommendation, Recommendation};
use crate::search::{self, PortfolioCandidate, SearchConfig, SearchError};
use crate::universe::UniverseSource;
use std::fmt;

pub use bond::BondOptimizer;
pub use crypto::CryptoOptimizer;
pub use currency::CurrencyOptimizer;
pub use equity::EquityOptimizer;

/// One instrument family's basket builder.
pub trait AssetOptimizer: Send + Sync {
    fn class(&self) -> InstrumentClass;

    /// Number of holdings to recommend for `amount`.
    fn target_count(&self, amount: f64) -> usize;

    fn recommend(
        &self,
        source: &dyn UniverseSource,
        amount: f64,
    ) -> Result<ClassRecommendation, OptimizerError>;
}

#[derive(Debug, Clone)]
pub enum OptimizerError {
    UniverseUnavailable { class: InstrumentClass, detail: String },
    EmptyUniverse { class: InstrumentClass },
    NoCandidates { class: InstrumentClass },
    Search { class: InstrumentClass, source: SearchError },
}

impl OptimizerError {
    pub fn class(&self) -> InstrumentClass {
        match self {
            OptimizerError::UniverseUnavailable { class, .. }
            | OptimizerError::EmptyUniverse { class }
            | OptimizerError::NoCandidates { class }
            | OptimizerError::Search { class, .. } => *class,
        }
    }
}

impl fmt::Display for OptimizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerError::UniverseUnavailable { class, detail } => {
                write!(f, "{class} universe unavailable: {detail}")
            }
            OptimizerError::EmptyUniverse { class } => write!(f, "{class} universe is empty"),
            OptimizerError::NoCandidates { class } => {
                write!(f, "{class} search produced no candidate portfolios")
            }
            OptimizerError::Search { class, source } => {
                write!(f, "{class} search failed: {source}")
            }
        }
    }
}

impl std::error::Error for OptimizerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OptimizerError::Search { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Holding count as a step function of the invested amount.
///
/// Each `(limit, count)` applies while `amount < limit`; `ceiling` applies above the last
/// limit. Limits must be ascending and counts non-decreasing.
#[derive(Debug, Clone, Copy)]
pub struct TargetPolicy {
    breakpoints: &'static [(f64, usize)],
    ceiling: usize,
}

impl TargetPolicy {
    pub const fn new(breakpoints: &'static [(f64, usize)], ceiling: usize) -> Self {
        Self {
            breakpoints,
            ceiling,
        }
    }

    pub fn target_count(&self, amount: f64) -> usize {
        self.breakpoints
            .iter()
            .find(|(limit, _)| amount < *limit)
            .map(|(_, count)| *count)
            .unwrap_or(self.ceiling)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = f64> + '_ {
        self.breakpoints.iter().map(|(limit, _)| *limit)
    }
}

pub(crate) fn load_universe(
    source: &dyn UniverseSource,
    class: InstrumentClass,
) -> Result<Universe, OptimizerError> {
    let universe = source.load(class).map_err(|err| {
        let detail = format!("{err:#}");
        tracing::error!(
            %class,
            source = source.source_name(),
            error = %detail,
            "failed to load universe"
        );
        OptimizerError::UniverseUnavailable { class, detail }
    })?;

    if universe.is_empty() {
        tracing::warn!(%class, "universe is empty");
        return Err(OptimizerError::EmptyUniverse { class });
    }
    Ok(universe)
}

pub(crate) fn best_candidate(
    universe: &Universe,
    config: &SearchConfig,
) -> Result<PortfolioCandidate, OptimizerError> {
    let class = universe.class();
    if universe.is_empty() {
        return Err(OptimizerError::EmptyUniverse { class });
    }

    let population = search::search(universe, config)
        .map_err(|source| OptimizerError::Search { class, source })?;
    population
        .into_iter()
        .next()
        .ok_or(OptimizerError::NoCandidates { class })
}

/// Stability screen with a return-ranked fallback.
///
/// Keeps instruments passing `is_stable`; when fewer than `target` survive, uses the
/// `2 * target` instruments with the largest mean return instead.
pub(crate) fn stable_or_top_return<F>(universe: &Universe, target: usize, is_stable: F) -> Universe
where
    F: Fn(&Instrument) -> bool,
{
    let stable = universe.filter(|i| is_stable(i));
    if stable.len() >= target {
        tracing::debug!(
            class = %universe.class(),
            stable = stable.len(),
            "stability filter applied"
        );
        return stable;
    }

    tracing::info!(
        class = %universe.class(),
        stable = stable.len(),
        target,
        fallback = target * 2,
        "not enough stable instruments; using top by mean return"
    );
    universe.largest_by_return(target * 2)
}

/// Top `target` instruments by weight, renormalized to 100 and priced against `amount`.
pub fn select_top_holdings(
    universe: &Universe,
    weights: &[f64],
    target: usize,
    amount: f64,
) -> Vec<Recommendation> {
    debug_assert_eq!(weights.len(), universe.len());

    let mut ranked: Vec<(&Instrument, f64)> = universe
        .instruments()
        .iter()
        .zip(weights.iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(target);

    let total: f64 = ranked.iter().map(|(_, w)| w).sum();
    let kept = ranked.len();

    ranked
        .into_iter()
        .map(|(instrument, w)| {
            let weight = if total > 0.0 {
                w / total * 100.0
            } else {
                100.0 / kept as f64
            };
            Recommendation {
                symbol: instrument.symbol.clone(),
                name: instrument.name.clone(),
                weight,
                amount: amount * weight / 100.0,
            }
        })
        .collect()
}

/// Drops holdings below `floor` percent and spreads their weight over the rest.
///
/// If every holding is below the floor the list is returned unfiltered. The result is
/// sorted by weight, largest first.
pub fn apply_weight_floor(
    recommendations: Vec<Recommendation>,
    floor: f64,
    amount: f64,
) -> Vec<Recommendation> {
    let (mut kept, dropped): (Vec<_>, Vec<_>) =
        recommendations.iter().cloned().partition(|r| r.weight >= floor);

    let mut out = if kept.is_empty() {
        recommendations
    } else {
        let pruned: f64 = dropped.iter().map(|r| r.weight).sum();
        if pruned > 0.0 {
            let kept_total: f64 = kept.iter().map(|r| r.weight).sum();
            for rec in &mut kept {
                rec.weight += rec.weight / kept_total * pruned;
                rec.amount = amount * rec.weight / 100.0;
            }
        }
        kept
    };

    out.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    out
}

/// Annualizes the winning draw's daily metrics into percentages.
pub(crate) fn summarize(
    class: InstrumentClass,
    amount: f64,
    target_count: usize,
    recommendations: Vec<Recommendation>,
    best: &PortfolioCandidate,
    periods_per_year: f64,
) -> ClassRecommendation {
    ClassRecommendation {
        class,
        investment_amount: amount,
        target_count,
        recommendations,
        portfolio_return: best.expected_return * periods_per_year * 100.0,
        portfolio_volatility: best.volatility * periods_per_year.sqrt() * 100.0,
        sharpe_ratio: best.sharpe_ratio,
        var_95: best.var_95.map(|v| v * periods_per_year * 100.0),
    }
}
