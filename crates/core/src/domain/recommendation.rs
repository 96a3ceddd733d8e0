use crate::domain::instrument::InstrumentClass;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Percentage of the class amount, 0..=100.
    pub weight: f64,
    pub amount: f64,
}

/// Outcome of one optimizer call.
///
/// `portfolio_return`, `portfolio_volatility` and `var_95` are annualized percentages;
/// `sharpe_ratio` is the daily ratio of the winning draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecommendation {
    pub class: InstrumentClass,
    pub investment_amount: f64,
    pub target_count: usize,
    pub recommendations: Vec<Recommendation>,
    pub portfolio_return: f64,
    pub portfolio_volatility: f64,
    pub sharpe_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_95: Option<f64>,
}
