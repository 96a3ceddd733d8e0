//! Fans a top-level allocation out to the per-class optimizers.

use crate::config::Settings;
use crate::domain::allocation::{AllocationEntry, AllocationResponse, AssetClass};
use crate::domain::instrument::InstrumentClass;
use crate::domain::recommendation::ClassRecommendation;
use crate::optimizer::{
    AssetOptimizer, BondOptimizer, CryptoOptimizer, CurrencyOptimizer, EquityOptimizer,
};
use crate::search::SearchSettings;
use crate::universe::{CsvUniverseSource, UniverseSource};
use anyhow::Context;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
pub struct OptimizerRegistry {
    optimizers: BTreeMap<InstrumentClass, Box<dyn AssetOptimizer>>,
}

impl OptimizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bond, crypto, currency and equity optimizers sharing one set of search settings.
    pub fn standard(settings: &SearchSettings) -> Self {
        Self::new()
            .with_optimizer(BondOptimizer::new(*settings))
            .with_optimizer(CryptoOptimizer::new(*settings))
            .with_optimizer(CurrencyOptimizer::new(*settings))
            .with_optimizer(EquityOptimizer::new(*settings))
    }

    /// Registers `optimizer` under its own class, replacing any previous one.
    pub fn with_optimizer(mut self, optimizer: impl AssetOptimizer + 'static) -> Self {
        self.optimizers.insert(optimizer.class(), Box::new(optimizer));
        self
    }

    pub fn get(&self, class: InstrumentClass) -> Option<&dyn AssetOptimizer> {
        self.optimizers.get(&class).map(|o| o.as_ref())
    }

    pub fn classes(&self) -> impl Iterator<Item = InstrumentClass> + '_ {
        self.optimizers.keys().copied()
    }
}

pub struct Aggregator {
    source: Arc<dyn UniverseSource>,
    registry: OptimizerRegistry,
    parallel: bool,
}

impl Aggregator {
    pub fn new(source: Arc<dyn UniverseSource>, registry: OptimizerRegistry) -> Self {
        Self {
            source,
            registry,
            parallel: true,
        }
    }

    /// CSV-backed aggregator with the standard optimizers.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let source = CsvUniverseSource::from_settings(settings)?;
        let registry = OptimizerRegistry::standard(&settings.search_settings());
        Ok(Self::new(Arc::new(source), registry).with_parallel(settings.aggregate_parallel))
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Prices every allocation entry against `total_capital` and attaches instrument lists.
    ///
    /// Classes without an optimizer, with a non-positive amount, or whose optimizer fails
    /// get no `<class>_recommendations` key.
    pub fn aggregate(
        &self,
        percentages: &BTreeMap<AssetClass, f64>,
        total_capital: f64,
    ) -> AllocationResponse {
        let allocation: BTreeMap<AssetClass, AllocationEntry> = percentages
            .iter()
            .map(|(asset, pct)| {
                let entry = AllocationEntry {
                    percentage: *pct,
                    amount: total_capital * pct / 100.0,
                };
                (*asset, entry)
            })
            .collect();

        let jobs: Vec<(InstrumentClass, f64)> = allocation
            .iter()
            .filter_map(|(asset, entry)| {
                let class = asset.instrument_class()?;
                (entry.amount > 0.0).then_some((class, entry.amount))
            })
            .collect();

        tracing::info!(
            total_capital,
            classes = allocation.len(),
            optimizer_jobs = jobs.len(),
            parallel = self.parallel,
            "aggregating allocation"
        );

        let run = |&(class, amount): &(InstrumentClass, f64)| self.run_optimizer(class, amount);
        let results: Vec<Option<ClassRecommendation>> = if self.parallel {
            jobs.par_iter().map(run).collect()
        } else {
            jobs.iter().map(run).collect()
        };

        let recommendations = results
            .into_iter()
            .flatten()
            .map(|rec| (rec.class.recommendations_key(), rec.recommendations))
            .collect();

        AllocationResponse {
            allocation,
            recommendations,
            recommended_instruments: BTreeMap::new(),
            risk_profile: None,
            generated_at: chrono::Utc::now(),
        }
    }

    /// Runs a single optimizer directly, surfacing its error instead of omitting it.
    pub fn recommend(
        &self,
        class: InstrumentClass,
        amount: f64,
    ) -> anyhow::Result<ClassRecommendation> {
        anyhow::ensure!(
            amount.is_finite() && amount > 0.0,
            "amount must be a positive number (got {amount})"
        );
        let optimizer = self
            .registry
            .get(class)
            .with_context(|| format!("no optimizer registered for {class}"))?;
        let out = optimizer.recommend(self.source.as_ref(), amount)?;
        Ok(out)
    }

    fn run_optimizer(&self, class: InstrumentClass, amount: f64) -> Option<ClassRecommendation> {
        let Some(optimizer) = self.registry.get(class) else {
            tracing::warn!(%class, amount, "no optimizer registered; skipping");
            return None;
        };

        match optimizer.recommend(self.source.as_ref(), amount) {
            Ok(rec) => Some(rec),
            Err(err) => {
                tracing::warn!(
                    %class,
                    amount,
                    error = %err,
                    "optimizer failed; omitting recommendations"
                );
                None
            }
        }
    }
}
