use crate::domain::instrument::InstrumentClass;
use crate::domain::recommendation::Recommendation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level asset classes produced by the allocation predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Debt,
    Gold,
    RealEstate,
    Crypto,
    Cash,
}

impl AssetClass {
    pub const ALL: [AssetClass; 6] = [
        AssetClass::Equity,
        AssetClass::Debt,
        AssetClass::Gold,
        AssetClass::RealEstate,
        AssetClass::Crypto,
        AssetClass::Cash,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Debt => "debt",
            AssetClass::Gold => "gold",
            AssetClass::RealEstate => "real_estate",
            AssetClass::Crypto => "crypto",
            AssetClass::Cash => "cash",
        }
    }

    /// Instrument family whose optimizer fills this class, if any.
    pub fn instrument_class(self) -> Option<InstrumentClass> {
        match self {
            AssetClass::Equity => Some(InstrumentClass::Equity),
            AssetClass::Debt => Some(InstrumentClass::Bond),
            AssetClass::Crypto => Some(InstrumentClass::Crypto),
            AssetClass::Cash => Some(InstrumentClass::Currency),
            AssetClass::Gold | AssetClass::RealEstate => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        AssetClass::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("unknown asset class: {s}"))
    }
}

/// Parses `equity=40,debt=30,...` into a percentage map.
pub fn parse_allocation(s: &str) -> anyhow::Result<BTreeMap<AssetClass, f64>> {
    let mut out = BTreeMap::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (class, pct) = part
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("allocation entry must be class=percentage: {part}"))?;
        let class: AssetClass = class.parse()?;
        let pct: f64 = pct
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid percentage for {class}: {pct}"))?;
        anyhow::ensure!(
            pct.is_finite() && (0.0..=100.0).contains(&pct),
            "percentage for {class} must be within 0..=100 (got {pct})"
        );
        anyhow::ensure!(out.insert(class, pct).is_none(), "duplicate asset class: {class}");
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub percentage: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub allocation: BTreeMap<AssetClass, AllocationEntry>,
    /// `<class>_recommendations` lists, flattened into the top-level object.
    #[serde(flatten)]
    pub recommendations: BTreeMap<String, Vec<Recommendation>>,
    /// Display shortlist per asset class, e.g. `"HDFC Bank (15.5%)"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recommended_instruments: BTreeMap<AssetClass, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_profile: Option<RiskProfile>,
    pub generated_at: DateTime<Utc>,
}

impl AllocationResponse {
    pub fn recommendations_for(&self, class: InstrumentClass) -> Option<&[Recommendation]> {
        self.recommendations
            .get(&class.recommendations_key())
            .map(Vec::as_slice)
    }
}
