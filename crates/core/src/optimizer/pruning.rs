//! Iterative universe pruning for large instrument sets.
//!
//! Each pass runs a short search and keeps only the instruments the best draw leaned on
//! most, so the final search spends its draws on a handful of names instead of a hundred.

use crate::domain::instrument::Universe;
use crate::search::{self, SearchConfig, SearchError};

pub const MAX_PRUNE_ITERATIONS: usize = 8;
pub const PRUNE_DRAWS: usize = 5_000;

#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub universe: Universe,
    pub iterations: usize,
}

/// Size of the universe after one pruning pass.
///
/// Halves while far above target (never below `2 * target`), then steps to `2 * target`
/// and finally to `target`.
pub fn next_prune_size(size: usize, target: usize) -> usize {
    if size > 3 * target {
        (2 * target).max(size / 2)
    } else if size > 2 * target {
        2 * target
    } else {
        target
    }
}

/// Shrinks `universe` toward `target` instruments.
///
/// Runs at most [`MAX_PRUNE_ITERATIONS`] passes of `config.draws` each. Survivors keep their
/// original order. A pass that yields no candidates ends the loop with the current set.
pub fn prune_universe(
    universe: &Universe,
    target: usize,
    config: &SearchConfig,
) -> Result<PruneOutcome, SearchError> {
    let target = target.max(1);
    let mut current = universe.clone();
    let mut iterations = 0;

    while current.len() > target && iterations < MAX_PRUNE_ITERATIONS {
        let population = search::search(&current, config)?;
        let Some(best) = search::best(&population) else {
            tracing::warn!(
                class = %current.class(),
                size = current.len(),
                "pruning search returned no candidates"
            );
            break;
        };

        let next = next_prune_size(current.len(), target);
        current = current.retain_top_weighted(&best.weights, next);
        iterations += 1;

        tracing::debug!(
            class = %current.class(),
            iteration = iterations,
            size = current.len(),
            best_sharpe = best.sharpe_ratio,
            "pruned universe"
        );
    }

    if current.len() > target {
        tracing::info!(
            class = %current.class(),
            size = current.len(),
            target,
            "pruning cap reached; using remaining universe"
        );
    }

    Ok(PruneOutcome {
        universe: current,
        iterations,
    })
}
