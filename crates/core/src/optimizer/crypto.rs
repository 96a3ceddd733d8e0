use crate::domain::instrument::InstrumentClass;
use crate::domain::recommendation::ClassRecommendation;
use crate::optimizer::{
    best_candidate, load_universe, select_top_holdings, summarize, AssetOptimizer, OptimizerError,
    TargetPolicy,
};
use crate::search::{SearchConfig, SearchSettings};
use crate::universe::UniverseSource;

pub const TARGETS: TargetPolicy =
    TargetPolicy::new(&[(10_000.0, 2), (50_000.0, 3), (100_000.0, 5)], 8);

const DRAWS: usize = 5_000;
/// Source tables list coins by market cap, so the head is the liquid part of the market.
const MAX_UNIVERSE: usize = 30;
const PERIODS_PER_YEAR: f64 = 365.0;
const QUOTE_SUFFIX: &str = "-USD";

#[derive(Debug, Clone)]
pub struct CryptoOptimizer {
    settings: SearchSettings,
}

impl CryptoOptimizer {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }
}

impl AssetOptimizer for CryptoOptimizer {
    fn class(&self) -> InstrumentClass {
        InstrumentClass::Crypto
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
        tracing::info!(class = %self.class(), amount, target, "building crypto basket");

        let universe = load_universe(source, self.class())?.head(MAX_UNIVERSE);

        let best = best_candidate(&universe, &SearchConfig::new(&self.settings, DRAWS, false))?;
        let mut recommendations = select_top_holdings(&universe, &best.weights, target, amount);
        for rec in &mut recommendations {
            rec.symbol = display_symbol(&rec.symbol);
        }

        let out = summarize(self.class(), amount, target, recommendations, &best, PERIODS_PER_YEAR);
        tracing::info!(
            class = %self.class(),
            holdings = out.recommendations.len(),
            sharpe = out.sharpe_ratio,
            "crypto basket ready"
        );
        Ok(out)
    }
}

fn display_symbol(ticker: &str) -> String {
    ticker
        .strip_suffix(QUOTE_SUFFIX)
        .unwrap_or(ticker)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;
    use crate::optimizer::test_support::{assert_valid_basket, instruments};
    use crate::universe::InMemoryUniverseSource;

    #[test]
    fn target_counts_follow_breakpoints() {
        let opt = CryptoOptimizer::new(SearchSettings::default());
        assert_eq!(opt.target_count(9_999.0), 2);
        assert_eq!(opt.target_count(10_000.0), 3);
        assert_eq!(opt.target_count(50_000.0), 5);
        assert_eq!(opt.target_count(100_000.0), 8);
    }

    #[test]
    fn only_the_first_thirty_coins_are_considered() {
        let mut coins: Vec<Instrument> = instruments("C", 30, 0.03)
            .into_iter()
            .map(|c| {
                Instrument::new(
                    format!("{}-USD", c.symbol),
                    c.mean_daily_return,
                    c.daily_volatility,
                )
            })
            .collect();
        // Dominant tail coin that must never be picked.
        coins.push(Instrument::new("TAIL-USD", 0.05, 0.001));

        let src = InMemoryUniverseSource::new().with_class(InstrumentClass::Crypto, coins);
        let out = CryptoOptimizer::new(SearchSettings::default())
            .recommend(&src, 200_000.0)
            .unwrap();
        assert_eq!(out.recommendations.len(), 8);
        assert_valid_basket(&out.recommendations, 200_000.0);
        assert!(out.recommendations.iter().all(|r| r.symbol != "TAIL"));
        assert!(out.recommendations.iter().all(|r| !r.symbol.ends_with("-USD")));
    }

    #[test]
    fn strips_quote_suffix_only() {
        assert_eq!(display_symbol("BTC-USD"), "BTC");
        assert_eq!(display_symbol("USDT"), "USDT");
        assert_eq!(display_symbol("ETH-USDC"), "ETH-USDC");
    }
}
