//! Upstream allocation prediction and the advisor that turns it into instrument baskets.

use crate::aggregate::Aggregator;
use crate::domain::allocation::{AllocationResponse, AssetClass, RiskProfile};
use crate::domain::instrument::InstrumentClass;
use crate::shortlist::{recommended_instruments, TopInstrumentSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const LOW_RISK_BELOW: f64 = 0.3;
const HIGH_RISK_ABOVE: f64 = 0.6;

/// Financial and psychometric answers an investor submits.
///
/// The psychometric fields are expected on a 0..=1 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorProfile {
    pub age: u32,
    pub income: f64,
    pub capital: f64,
    pub expenses: f64,
    pub emi: f64,
    pub liquidity_need: f64,
    pub dependents: u32,
    pub confidence: f64,
    pub knowledge: f64,
    pub comfort_with_negatives: f64,
    pub market_awareness: f64,
    pub experience: f64,
}

impl InvestorProfile {
    pub fn risk_score(&self) -> f64 {
        0.4 * self.comfort_with_negatives + 0.3 * self.confidence + 0.3 * self.experience
    }

    pub fn risk_profile(&self) -> RiskProfile {
        let score = self.risk_score();
        if score < LOW_RISK_BELOW {
            RiskProfile::Low
        } else if score > HIGH_RISK_ABOVE {
            RiskProfile::High
        } else {
            RiskProfile::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPrediction {
    /// Percentages in 0..=100; they need not sum to exactly 100.
    pub allocation: BTreeMap<AssetClass, f64>,
    pub risk_profile: Option<RiskProfile>,
}

pub trait AllocationPredictor: Send + Sync {
    fn predict(&self, profile: &InvestorProfile) -> anyhow::Result<AllocationPrediction>;
}

/// Allocation used when no prediction is available.
pub fn default_allocation() -> BTreeMap<AssetClass, f64> {
    BTreeMap::from([
        (AssetClass::Equity, 20.0),
        (AssetClass::Debt, 30.0),
        (AssetClass::Gold, 15.0),
        (AssetClass::RealEstate, 15.0),
        (AssetClass::Crypto, 5.0),
        (AssetClass::Cash, 15.0),
    ])
}

/// Returns the same allocation for every profile, tagged with the profile's risk level.
#[derive(Debug, Clone)]
pub struct FixedAllocationPredictor {
    allocation: BTreeMap<AssetClass, f64>,
}

impl FixedAllocationPredictor {
    pub fn new(allocation: BTreeMap<AssetClass, f64>) -> Self {
        Self { allocation }
    }
}

impl Default for FixedAllocationPredictor {
    fn default() -> Self {
        Self::new(default_allocation())
    }
}

impl AllocationPredictor for FixedAllocationPredictor {
    fn predict(&self, profile: &InvestorProfile) -> anyhow::Result<AllocationPrediction> {
        Ok(AllocationPrediction {
            allocation: self.allocation.clone(),
            risk_profile: Some(profile.risk_profile()),
        })
    }
}

pub struct Advisor {
    predictor: Arc<dyn AllocationPredictor>,
    aggregator: Aggregator,
    top_instruments: Option<Arc<dyn TopInstrumentSource>>,
}

impl Advisor {
    pub fn new(predictor: Arc<dyn AllocationPredictor>, aggregator: Aggregator) -> Self {
        Self {
            predictor,
            aggregator,
            top_instruments: None,
        }
    }

    /// Curated lists used for the `recommended_instruments` shortlist.
    pub fn with_top_instruments(mut self, source: Arc<dyn TopInstrumentSource>) -> Self {
        self.top_instruments = Some(source);
        self
    }

    /// Predicts a top-level allocation for `profile` and fills it against `profile.capital`.
    ///
    /// A failed or out-of-range prediction falls back to [`default_allocation`] with no risk
    /// tag. Without a predicted risk tag the shortlist uses the profile's own risk level.
    pub fn advise(&self, profile: &InvestorProfile) -> anyhow::Result<AllocationResponse> {
        anyhow::ensure!(
            profile.capital.is_finite() && profile.capital >= 0.0,
            "capital must be a non-negative number (got {})",
            profile.capital
        );

        let prediction = match self.predictor.predict(profile).and_then(validate_prediction) {
            Ok(prediction) => prediction,
            Err(err) => {
                let detail = format!("{err:#}");
                tracing::warn!(
                    error = %detail,
                    "allocation prediction unusable; using default allocation"
                );
                AllocationPrediction {
                    allocation: default_allocation(),
                    risk_profile: None,
                }
            }
        };

        let mut response = self.aggregator.aggregate(&prediction.allocation, profile.capital);

        let risk = prediction
            .risk_profile
            .unwrap_or_else(|| profile.risk_profile());
        let curated = self.curated_lists();
        response.recommended_instruments = recommended_instruments(
            &prediction.allocation,
            risk,
            &curated,
            response.recommendations_for(InstrumentClass::Equity),
        );
        response.risk_profile = prediction.risk_profile;
        Ok(response)
    }

    fn curated_lists(&self) -> BTreeMap<AssetClass, Vec<String>> {
        let Some(source) = &self.top_instruments else {
            return BTreeMap::new();
        };
        source.load().unwrap_or_else(|err| {
            let detail = format!("{err:#}");
            tracing::warn!(
                source = source.source_name(),
                error = %detail,
                "top instruments unavailable; shortlist limited to equity"
            );
            BTreeMap::new()
        })
    }
}

fn validate_prediction(prediction: AllocationPrediction) -> anyhow::Result<AllocationPrediction> {
    for (class, pct) in &prediction.allocation {
        anyhow::ensure!(
            pct.is_finite() && (0.0..=100.0).contains(pct),
            "predicted percentage for {class} is out of range (got {pct})"
        );
    }
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::OptimizerRegistry;
    use crate::optimizer::test_support::instruments;
    use crate::search::SearchSettings;
    use crate::shortlist::InMemoryTopInstruments;
    use crate::universe::InMemoryUniverseSource;
    use serde_json::json;

    struct FailingPredictor;

    impl AllocationPredictor for FailingPredictor {
        fn predict(&self, _profile: &InvestorProfile) -> anyhow::Result<AllocationPrediction> {
            anyhow::bail!("model artifact missing")
        }
    }

    fn profile(comfort: f64, confidence: f64, experience: f64) -> InvestorProfile {
        serde_json::from_value(json!({
            "age": 45,
            "income": 240000,
            "capital": 100000,
            "expenses": 100000,
            "emi": 80000,
            "liquidity_need": 0,
            "dependents": 4,
            "confidence": confidence,
            "knowledge": 0.1,
            "comfort_with_negatives": comfort,
            "market_awareness": 0.1,
            "experience": experience
        }))
        .unwrap()
    }

    fn aggregator() -> Aggregator {
        let source = InMemoryUniverseSource::new()
            .with_class(InstrumentClass::Bond, instruments("GS", 10, 0.001))
            .with_class(InstrumentClass::Currency, instruments("FX", 6, 0.003))
            .with_class(InstrumentClass::Crypto, instruments("CR", 10, 0.03))
            .with_class(InstrumentClass::Equity, instruments("EQ", 20, 0.012));
        Aggregator::new(Arc::new(source), OptimizerRegistry::standard(&SearchSettings::default()))
            .with_parallel(false)
    }

    #[test]
    fn risk_profile_thresholds() {
        assert_eq!(profile(0.0, 0.1, 0.0).risk_profile(), RiskProfile::Low);
        assert_eq!(profile(0.5, 0.5, 0.5).risk_profile(), RiskProfile::Medium);
        assert_eq!(profile(0.9, 0.8, 0.7).risk_profile(), RiskProfile::High);
        // Boundaries are exclusive on both sides.
        assert_eq!(profile(0.75, 0.0, 0.0).risk_profile(), RiskProfile::Medium);
        assert_eq!(profile(0.0, 1.0, 1.0).risk_profile(), RiskProfile::Medium);
    }

    #[test]
    fn default_allocation_sums_to_one_hundred() {
        let total: f64 = default_allocation().values().sum();
        assert_eq!(total, 100.0);
        assert_eq!(default_allocation().len(), AssetClass::ALL.len());
    }

    #[test]
    fn advisor_attaches_risk_profile_and_prices_capital() {
        let advisor = Advisor::new(Arc::new(FixedAllocationPredictor::default()), aggregator());
        let response = advisor.advise(&profile(0.9, 0.9, 0.9)).unwrap();

        assert_eq!(response.risk_profile, Some(RiskProfile::High));
        assert_eq!(response.allocation[&AssetClass::Debt].amount, 30_000.0);
        assert_eq!(response.allocation[&AssetClass::Crypto].amount, 5_000.0);
        for class in InstrumentClass::ALL {
            assert!(response.recommendations_for(class).is_some(), "missing {class}");
        }

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["risk_profile"], json!("high"));
    }

    #[test]
    fn advisor_falls_back_when_prediction_fails() {
        let advisor = Advisor::new(Arc::new(FailingPredictor), aggregator());
        let response = advisor.advise(&profile(0.2, 0.2, 0.2)).unwrap();

        let percentages: BTreeMap<AssetClass, f64> = response
            .allocation
            .iter()
            .map(|(class, entry)| (*class, entry.percentage))
            .collect();
        assert_eq!(percentages, default_allocation());
        assert!(response.risk_profile.is_none());
        assert!(response.recommendations_for(InstrumentClass::Bond).is_some());
    }

    #[test]
    fn advisor_rejects_bad_capital() {
        let advisor = Advisor::new(Arc::new(FixedAllocationPredictor::default()), aggregator());
        let mut bad = profile(0.5, 0.5, 0.5);
        bad.capital = f64::NAN;
        assert!(advisor.advise(&bad).is_err());
        bad.capital = -1.0;
        assert!(advisor.advise(&bad).is_err());
    }

    #[test]
    fn out_of_range_prediction_falls_back_to_default() {
        let skewed = FixedAllocationPredictor::new(BTreeMap::from([
            (AssetClass::Equity, 140.0),
            (AssetClass::Debt, 10.0),
        ]));
        let advisor = Advisor::new(Arc::new(skewed), aggregator());
        let response = advisor.advise(&profile(0.5, 0.5, 0.5)).unwrap();

        assert_eq!(response.allocation.len(), default_allocation().len());
        assert_eq!(response.allocation[&AssetClass::Equity].percentage, 20.0);
        assert!(response.risk_profile.is_none());
    }

    #[test]
    fn shortlist_uses_curated_lists_and_equity_basket() {
        let curated = InMemoryTopInstruments::new()
            .with_class(AssetClass::Gold, vec!["GOLDBEES", "SGB 2032", "HDFCGOLD"])
            .with_class(AssetClass::Debt, vec!["GS2033", "GS2037", "SDL2030", "GS2040"]);
        let advisor = Advisor::new(Arc::new(FixedAllocationPredictor::default()), aggregator())
            .with_top_instruments(Arc::new(curated));
        let response = advisor.advise(&profile(0.5, 0.5, 0.5)).unwrap();
        let shortlist = &response.recommended_instruments;

        // gold 15% -> 3 names, debt 30% -> 5 requested but only 4 curated.
        assert_eq!(shortlist[&AssetClass::Gold].len(), 3);
        assert_eq!(shortlist[&AssetClass::Debt].len(), 4);
        assert!(!shortlist.contains_key(&AssetClass::RealEstate));

        let basket = response.recommendations_for(InstrumentClass::Equity).unwrap();
        assert_eq!(shortlist[&AssetClass::Equity].len(), basket.len());
        assert!(shortlist[&AssetClass::Equity][0].starts_with(&basket[0].symbol));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["recommended_instruments"]["gold"][0], json!("GOLDBEES"));
    }

    #[test]
    fn equity_shortlist_falls_back_by_risk_when_optimizer_fails() {
        let source = InMemoryUniverseSource::new()
            .with_class(InstrumentClass::Bond, instruments("GS", 10, 0.001));
        let registry = OptimizerRegistry::standard(&SearchSettings::default());
        let aggregator = Aggregator::new(Arc::new(source), registry).with_parallel(false);

        let advisor = Advisor::new(Arc::new(FixedAllocationPredictor::default()), aggregator);
        let response = advisor.advise(&profile(0.0, 0.1, 0.0)).unwrap();
        assert!(response.recommendations_for(InstrumentClass::Equity).is_none());
        assert_eq!(
            response.recommended_instruments[&AssetClass::Equity][0],
            "HDFC Bank (15.5%)"
        );
    }
}
