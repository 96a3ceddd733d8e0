//! Display shortlists of well-known instruments per asset class.
//!
//! Every class with a positive percentage gets the head of its curated list, sized by how
//! much of the portfolio it takes. Equity uses the optimizer's basket when one exists and
//! falls back to a fixed list chosen by risk profile.

use crate::domain::allocation::{AssetClass, RiskProfile};
use crate::domain::recommendation::Recommendation;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const TOP_INSTRUMENTS_FILE: &str = "top_instruments.csv";

const LOW_RISK_EQUITY: [&str; 5] = [
    "HDFC Bank (15.5%)",
    "TCS (12.3%)",
    "Infosys (10.8%)",
    "HUL (9.7%)",
    "ITC (8.2%)",
];
const MEDIUM_RISK_EQUITY: [&str; 5] = [
    "Reliance Industries (18.2%)",
    "HDFC Bank (14.5%)",
    "Infosys (12.1%)",
    "ICICI Bank (10.8%)",
    "Bharti Airtel (9.3%)",
];
const HIGH_RISK_EQUITY: [&str; 5] = [
    "Tata Motors (20.5%)",
    "Reliance Industries (17.8%)",
    "ICICI Bank (15.2%)",
    "Adani Enterprises (12.6%)",
    "SBI (10.4%)",
];

/// Curated instrument names per asset class, best first.
pub trait TopInstrumentSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    fn load(&self) -> Result<BTreeMap<AssetClass, Vec<String>>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTopInstruments {
    lists: BTreeMap<AssetClass, Vec<String>>,
}

impl InMemoryTopInstruments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class<S: Into<String>>(mut self, class: AssetClass, names: Vec<S>) -> Self {
        self.lists
            .insert(class, names.into_iter().map(Into::into).collect());
        self
    }
}

impl TopInstrumentSource for InMemoryTopInstruments {
    fn source_name(&self) -> &'static str {
        "in_memory"
    }

    fn load(&self) -> Result<BTreeMap<AssetClass, Vec<String>>> {
        Ok(self.lists.clone())
    }
}

/// Long-form `asset_class,instrument` table; row order is rank order.
///
/// A missing file means no curated lists, not an error.
#[derive(Debug, Clone)]
pub struct CsvTopInstruments {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct TopInstrumentRow {
    #[serde(alias = "Asset Class", alias = "Asset_Class")]
    asset_class: String,
    #[serde(alias = "Instrument", alias = "Name")]
    instrument: String,
}

impl CsvTopInstruments {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(TOP_INSTRUMENTS_FILE))
    }
}

impl TopInstrumentSource for CsvTopInstruments {
    fn source_name(&self) -> &'static str {
        "csv_file"
    }

    fn load(&self) -> Result<BTreeMap<AssetClass, Vec<String>>> {
        let mut lists: BTreeMap<AssetClass, Vec<String>> = BTreeMap::new();
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no top instruments file");
            return Ok(lists);
        }

        let mut reader = ::csv::ReaderBuilder::new()
            .trim(::csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("failed to open top instruments: {}", self.path.display()))?;

        for (idx, row) in reader.deserialize::<TopInstrumentRow>().enumerate() {
            let line = idx + 2;
            let row = row.with_context(|| {
                format!("{}: malformed row at line {line}", self.path.display())
            })?;
            let class: AssetClass = row
                .asset_class
                .parse()
                .with_context(|| format!("{}: line {line}", self.path.display()))?;
            anyhow::ensure!(
                !row.instrument.is_empty(),
                "{}: empty instrument at line {line}",
                self.path.display()
            );
            lists.entry(class).or_default().push(row.instrument);
        }
        Ok(lists)
    }
}

/// How many names to show for a class holding `percentage` of the portfolio.
pub fn shortlist_size(percentage: f64) -> usize {
    if percentage >= 20.0 {
        5
    } else if percentage >= 10.0 {
        3
    } else {
        2
    }
}

pub fn fallback_equity(risk: RiskProfile) -> Vec<String> {
    let names = match risk {
        RiskProfile::Low => LOW_RISK_EQUITY,
        RiskProfile::Medium => MEDIUM_RISK_EQUITY,
        RiskProfile::High => HIGH_RISK_EQUITY,
    };
    names.iter().map(|s| s.to_string()).collect()
}

/// Builds the per-class shortlist for a positive allocation.
///
/// `equity_basket` is the equity optimizer output, if it ran and succeeded.
pub fn recommended_instruments(
    percentages: &BTreeMap<AssetClass, f64>,
    risk: RiskProfile,
    curated: &BTreeMap<AssetClass, Vec<String>>,
    equity_basket: Option<&[Recommendation]>,
) -> BTreeMap<AssetClass, Vec<String>> {
    let mut out = BTreeMap::new();
    for (class, pct) in percentages {
        if pct.is_nan() || *pct <= 0.0 {
            continue;
        }

        if *class == AssetClass::Equity {
            let names = match equity_basket {
                Some(basket) if !basket.is_empty() => basket
                    .iter()
                    .map(|r| format!("{} ({:.2}%)", r.symbol, r.weight))
                    .collect(),
                _ => fallback_equity(risk),
            };
            out.insert(*class, names);
            continue;
        }

        let Some(names) = curated.get(class) else {
            continue;
        };
        let take = shortlist_size(*pct).min(names.len());
        out.insert(*class, names[..take].to_vec());
    }
    out
}
