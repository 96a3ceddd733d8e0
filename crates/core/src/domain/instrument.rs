use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument families that have a dedicated optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Bond,
    Crypto,
    Currency,
    Equity,
}

impl InstrumentClass {
    pub const ALL: [InstrumentClass; 4] = [
        InstrumentClass::Bond,
        InstrumentClass::Crypto,
        InstrumentClass::Currency,
        InstrumentClass::Equity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentClass::Bond => "bond",
            InstrumentClass::Crypto => "crypto",
            InstrumentClass::Currency => "currency",
            InstrumentClass::Equity => "equity",
        }
    }

    /// Key under which this class's list appears in an allocation response.
    pub fn recommendations_key(self) -> String {
        format!("{}_recommendations", self.as_str())
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstrumentClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bond" | "bonds" => Ok(InstrumentClass::Bond),
            "crypto" => Ok(InstrumentClass::Crypto),
            "currency" | "currencies" => Ok(InstrumentClass::Currency),
            "equity" | "equities" | "stock" | "stocks" => Ok(InstrumentClass::Equity),
            other => anyhow::bail!("unknown instrument class: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: Option<String>,
    pub mean_daily_return: f64,
    pub daily_volatility: f64,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, mean_daily_return: f64, daily_volatility: f64) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            mean_daily_return,
            daily_volatility,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Ordered candidate set for one instrument class.
///
/// Every narrowing operation returns a new `Universe`; weight vectors produced by a search
/// are only meaningful against the exact snapshot they were drawn for.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    class: InstrumentClass,
    instruments: Vec<Instrument>,
}

impl Universe {
    pub fn new(class: InstrumentClass, instruments: Vec<Instrument>) -> Self {
        Self { class, instruments }
    }

    pub fn class(&self) -> InstrumentClass {
        self.class
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn mean_returns(&self) -> Vec<f64> {
        self.instruments.iter().map(|i| i.mean_daily_return).collect()
    }

    pub fn volatilities(&self) -> Vec<f64> {
        self.instruments.iter().map(|i| i.daily_volatility).collect()
    }

    pub fn filter<F>(&self, mut keep: F) -> Universe
    where
        F: FnMut(&Instrument) -> bool,
    {
        Universe {
            class: self.class,
            instruments: self.instruments.iter().filter(|i| keep(i)).cloned().collect(),
        }
    }

    /// First `n` instruments in universe order.
    pub fn head(&self, n: usize) -> Universe {
        Universe {
            class: self.class,
            instruments: self.instruments.iter().take(n).cloned().collect(),
        }
    }

    /// The `n` instruments with the largest mean return, best first.
    pub fn largest_by_return(&self, n: usize) -> Universe {
        let mut sorted = self.instruments.clone();
        sorted.sort_by(|a, b| b.mean_daily_return.total_cmp(&a.mean_daily_return));
        sorted.truncate(n);
        Universe {
            class: self.class,
            instruments: sorted,
        }
    }

    /// Keeps the `n` instruments with the highest weight, preserving universe order.
    ///
    /// `weights` must come from a search over this exact universe.
    pub fn retain_top_weighted(&self, weights: &[f64], n: usize) -> Universe {
        debug_assert_eq!(weights.len(), self.instruments.len());

        let mut ranked: Vec<usize> = (0..self.instruments.len().min(weights.len())).collect();
        ranked.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
        ranked.truncate(n);
        ranked.sort_unstable();

        Universe {
            class: self.class,
            instruments: ranked.into_iter().map(|idx| self.instruments[idx].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Universe {
        Universe::new(
            InstrumentClass::Bond,
            vec![
                Instrument::new("A", 0.0002, 0.003),
                Instrument::new("B", 0.0005, 0.004),
                Instrument::new("C", -0.0001, 0.002),
                Instrument::new("D", 0.0003, 0.009),
            ],
        )
    }

    #[test]
    fn largest_by_return_orders_best_first() {
        let top = sample().largest_by_return(2);
        let symbols: Vec<_> = top.instruments().iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "D"]);
    }

    #[test]
    fn retain_top_weighted_keeps_universe_order() {
        let universe = sample();
        let kept = universe.retain_top_weighted(&[0.1, 0.2, 0.4, 0.3], 2);
        let symbols: Vec<_> = kept.instruments().iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["C", "D"]);
        assert_eq!(universe.len(), 4);
    }

    #[test]
    fn filter_produces_new_universe() {
        let universe = sample();
        let positive = universe.filter(|i| i.mean_daily_return > 0.0);
        assert_eq!(positive.len(), 3);
        assert_eq!(universe.len(), 4);
        assert_eq!(positive.class(), InstrumentClass::Bond);
    }

    #[test]
    fn parses_class_names() {
        assert_eq!("Bonds".parse::<InstrumentClass>().unwrap(), InstrumentClass::Bond);
        assert_eq!("equity".parse::<InstrumentClass>().unwrap(), InstrumentClass::Equity);
        assert!("gold".parse::<InstrumentClass>().is_err());
        assert_eq!(InstrumentClass::Crypto.recommendations_key(), "crypto_recommendations");
    }
}
