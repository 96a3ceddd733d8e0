use crate::domain::instrument::InstrumentClass;
use crate::domain::recommendation::ClassRecommendation;
use crate::optimizer::pruning::{prune_universe, PRUNE_DRAWS};
use crate::optimizer::{
    apply_weight_floor, best_candidate, load_universe, select_top_holdings, summarize,
    AssetOptimizer, OptimizerError, TargetPolicy,
};
use crate::search::{SearchConfig, SearchSettings};
use crate::universe::UniverseSource;

pub const TARGETS: TargetPolicy = TargetPolicy::new(
    &[
        (50_000.0, 3),
        (100_000.0, 5),
        (300_000.0, 8),
        (500_000.0, 10),
        (800_000.0, 15),
    ],
    18,
);

const FINAL_DRAWS: usize = 10_000;
/// Minimum holding weight in percent.
pub const WEIGHT_FLOOR: f64 = 5.0;
const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone)]
pub struct EquityOptimizer {
    settings: SearchSettings,
}

impl EquityOptimizer {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }
}

impl AssetOptimizer for EquityOptimizer {
    fn class(&self) -> InstrumentClass {
        InstrumentClass::Equity
    }

    fn target_count(&self, amount: f64) -> usize {
        TARGETS.target_count(amount)
    }

    fn recommend(
        &self,
        source: &dyn UniverseSource,
        amount: f64,
    ) -> Result<ClassRecommendation, OptimizerError> {
        let class = self.class();
        let target = self.target_count(amount);
        tracing::info!(%class, amount, target, "building equity basket");

        let universe = load_universe(source, class)?;
        let search = SearchConfig::new(&self.settings, PRUNE_DRAWS, true);

        let pruned = prune_universe(&universe, target, &search)
            .map_err(|source| OptimizerError::Search { class, source })?;
        tracing::info!(
            %class,
            from = universe.len(),
            to = pruned.universe.len(),
            iterations = pruned.iterations,
            "equity universe pruned"
        );

        let best = best_candidate(&pruned.universe, &search.with_draws(FINAL_DRAWS))?;
        let holdings = select_top_holdings(&pruned.universe, &best.weights, target, amount);
        let recommendations = apply_weight_floor(holdings, WEIGHT_FLOOR, amount);

        let out = summarize(class, amount, target, recommendations, &best, TRADING_DAYS);
        tracing::info!(
            %class,
            holdings = out.recommendations.len(),
            portfolio_return = out.portfolio_return,
            var_95 = out.var_95,
            sharpe = out.sharpe_ratio,
            "equity basket ready"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;
    use crate::optimizer::test_support::{assert_valid_basket, instruments};
    use crate::universe::InMemoryUniverseSource;

    fn nifty() -> InMemoryUniverseSource {
        InMemoryUniverseSource::new()
            .with_class(InstrumentClass::Equity, instruments("NSE", 100, 0.012))
    }

    #[test]
    fn target_counts_are_monotonic() {
        let opt = EquityOptimizer::new(SearchSettings::default());
        assert_eq!(opt.target_count(10_000.0), 3);
        assert_eq!(opt.target_count(50_000.0), 5);
        assert_eq!(opt.target_count(250_000.0), 8);
        assert_eq!(opt.target_count(499_999.0), 10);
        assert_eq!(opt.target_count(500_000.0), 15);
        assert_eq!(opt.target_count(5_000_000.0), 18);

        let mut last = 0;
        for amount in (0..60).map(|i| i as f64 * 20_000.0) {
            let count = opt.target_count(amount);
            assert!(count >= last);
            last = count;
        }
    }

    #[test]
    fn basket_respects_target_and_floor() {
        let opt = EquityOptimizer::new(SearchSettings::default());
        let amount = 250_000.0;
        let out = opt.recommend(&nifty(), amount).unwrap();

        assert!(out.recommendations.len() <= 8);
        assert_valid_basket(&out.recommendations, amount);
        assert!(out.recommendations.iter().all(|r| r.weight >= WEIGHT_FLOOR));
        assert!(out
            .recommendations
            .windows(2)
            .all(|w| w[0].weight >= w[1].weight));
        assert!(out.var_95.is_some());
    }

    #[test]
    fn same_inputs_give_the_same_basket() {
        let opt = EquityOptimizer::new(SearchSettings::default());
        let a = opt.recommend(&nifty(), 120_000.0).unwrap();
        let b = opt.recommend(&nifty(), 120_000.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn capped_pruning_still_yields_a_target_sized_basket() {
        let src = InMemoryUniverseSource::new()
            .with_class(InstrumentClass::Equity, instruments("NSE", 1_000, 0.012));
        let amount = 10_000.0;
        let out = EquityOptimizer::new(SearchSettings::default())
            .recommend(&src, amount)
            .unwrap();

        assert_eq!(out.target_count, 3);
        assert!(!out.recommendations.is_empty() && out.recommendations.len() <= 3);
        assert_valid_basket(&out.recommendations, amount);
        assert!(out.recommendations.iter().all(|r| r.weight >= WEIGHT_FLOOR));
    }

    #[test]
    fn single_stock_universe() {
        let src = InMemoryUniverseSource::new()
            .with_class(InstrumentClass::Equity, vec![Instrument::new("RELIANCE", 0.0008, 0.015)]);
        let out = EquityOptimizer::new(SearchSettings::default())
            .recommend(&src, 75_000.0)
            .unwrap();
        assert_eq!(out.recommendations.len(), 1);
        assert_eq!(out.recommendations[0].symbol, "RELIANCE");
        assert!((out.recommendations[0].weight - 100.0).abs() < 1e-9);
    }

    #[test]
    fn expired_deadline_surfaces_as_search_error() {
        let settings = SearchSettings {
            deadline: Some(std::time::Duration::ZERO),
            ..SearchSettings::default()
        };
        let err = EquityOptimizer::new(settings)
            .recommend(&nifty(), 120_000.0)
            .unwrap_err();
        assert!(matches!(err, OptimizerError::Search { .. }));
    }
}
