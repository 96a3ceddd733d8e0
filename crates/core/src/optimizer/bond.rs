use crate::domain::instrument::InstrumentClass;
use crate::domain::recommendation::ClassRecommendation;
use crate::optimizer::{
    best_candidate, load_universe, select_top_holdings, stable_or_top_return, summarize,
    AssetOptimizer, OptimizerError, TargetPolicy,
};
use crate::search::{SearchConfig, SearchSettings};
use crate::universe::UniverseSource;

pub const TARGETS: TargetPolicy =
    TargetPolicy::new(&[(20_000.0, 2), (50_000.0, 3), (100_000.0, 5)], 8);

const DRAWS: usize = 3_000;
const MAX_DAILY_VOLATILITY: f64 = 0.005;
const PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone)]
pub struct BondOptimizer {
    settings: SearchSettings,
}

impl BondOptimizer {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }
}

impl AssetOptimizer for BondOptimizer {
    fn class(&self) -> InstrumentClass {
        InstrumentClass::Bond
    }

    fn target_count(&self, amount: f64) -> usize {
        TARGETS.target_count(amount)
    }

    fn recommend(
        &self,
        source: &dyn UniverseSource,
        amount: f64,
    ) -> Result<ClassRecommendation, OptimizerError> {
        let target = self.target_count(amount);
        tracing::info!(class = %self.class(), amount, target, "building bond basket");

        let universe = load_universe(source, self.class())?;
        // Positive carry and low daily volatility only.
        let stable = stable_or_top_return(&universe, target, |i| {
            i.mean_daily_return > 0.0 && i.daily_volatility < MAX_DAILY_VOLATILITY
        });

        let best = best_candidate(&stable, &SearchConfig::new(&self.settings, DRAWS, false))?;
        let recommendations = select_top_holdings(&stable, &best.weights, target, amount);

        let out = summarize(self.class(), amount, target, recommendations, &best, PERIODS_PER_YEAR);
        tracing::info!(
            class = %self.class(),
            holdings = out.recommendations.len(),
            portfolio_return = out.portfolio_return,
            sharpe = out.sharpe_ratio,
            "bond basket ready"
        );
        Ok(out)
    }
}
