pub mod csv;

use crate::domain::instrument::{Instrument, InstrumentClass, Universe};
use anyhow::Result;
use std::collections::BTreeMap;

pub use self::csv::CsvUniverseSource;

/// Read-only source of per-class instrument statistics.
pub trait UniverseSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    fn load(&self, class: InstrumentClass) -> Result<Universe>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUniverseSource {
    universes: BTreeMap<InstrumentClass, Vec<Instrument>>,
}

impl InMemoryUniverseSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: InstrumentClass, instruments: Vec<Instrument>) -> Self {
        self.universes.insert(class, instruments);
        self
    }
}

impl UniverseSource for InMemoryUniverseSource {
    fn source_name(&self) -> &'static str {
        "in_memory"
    }

    fn load(&self, class: InstrumentClass) -> Result<Universe> {
        let instruments = self
            .universes
            .get(&class)
            .ok_or_else(|| anyhow::anyhow!("no {class} universe registered"))?;
        for item in instruments {
            validate_instrument(item)?;
        }
        Ok(Universe::new(class, instruments.clone()))
    }
}

pub(crate) fn validate_instrument(item: &Instrument) -> Result<()> {
    anyhow::ensure!(!item.symbol.trim().is_empty(), "symbol must be non-empty");
    anyhow::ensure!(
        item.mean_daily_return.is_finite(),
        "mean daily return must be finite (symbol={})",
        item.symbol
    );
    anyhow::ensure!(
        item.daily_volatility.is_finite() && item.daily_volatility >= 0.0,
        "daily volatility must be finite and non-negative (symbol={})",
        item.symbol
    );
    Ok(())
}
