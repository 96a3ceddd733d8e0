use crate::config::Settings;
use crate::domain::instrument::{Instrument, InstrumentClass, Universe};
use crate::universe::{validate_instrument, UniverseSource};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const BOND_FILE: &str = "bond_daily_stats.csv";
const CRYPTO_FILE: &str = "crypto_stats.csv";
const CURRENCY_FILE: &str = "currency_stats_vs_inr.csv";
const EQUITY_SNAPSHOT_PREFIX: &str = "nifty100_simulation_data_";
const EQUITY_FILE: &str = "equity_daily_stats.csv";

/// Reads per-class statistics tables from a data directory.
#[derive(Debug, Clone)]
pub struct CsvUniverseSource {
    data_dir: PathBuf,
}

// Column names differ between the exported stats files, so accept every known spelling.
#[derive(Debug, Deserialize)]
struct InstrumentRow {
    #[serde(alias = "Symbol", alias = "Ticker", alias = "Cuurency", alias = "Currency")]
    symbol: String,
    #[serde(default, alias = "Name")]
    name: Option<String>,
    #[serde(alias = "Mean Daily Return", alias = "Mean_Daily_Return")]
    mean_daily_return: f64,
    #[serde(alias = "Daily Volatility", alias = "Daily_Volatility")]
    daily_volatility: f64,
}

impl CsvUniverseSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let data_dir = settings.require_data_dir()?;
        let path = PathBuf::from(data_dir);
        anyhow::ensure!(
            path.is_dir(),
            "CAPWISE_DATA_DIR is not a directory: {}",
            path.display()
        );
        Ok(Self::new(path))
    }

    fn path_for(&self, class: InstrumentClass) -> Result<PathBuf> {
        let file = match class {
            InstrumentClass::Bond => BOND_FILE.to_string(),
            InstrumentClass::Crypto => CRYPTO_FILE.to_string(),
            InstrumentClass::Currency => CURRENCY_FILE.to_string(),
            InstrumentClass::Equity => match self.latest_equity_snapshot()? {
                Some(name) => name,
                None => EQUITY_FILE.to_string(),
            },
        };
        Ok(self.data_dir.join(file))
    }

    /// Latest `nifty100_simulation_data_*.csv` by file name (names embed the date).
    fn latest_equity_snapshot(&self) -> Result<Option<String>> {
        let entries = std::fs::read_dir(&self.data_dir)
            .with_context(|| format!("failed to list data dir: {}", self.data_dir.display()))?;

        let mut latest: Option<String> = None;
        for entry in entries {
            let entry = entry.context("failed to read data dir entry")?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !(name.starts_with(EQUITY_SNAPSHOT_PREFIX) && name.ends_with(".csv")) {
                continue;
            }
            if latest.as_deref().map_or(true, |cur| name.as_str() > cur) {
                latest = Some(name);
            }
        }
        Ok(latest)
    }
}

impl UniverseSource for CsvUniverseSource {
    fn source_name(&self) -> &'static str {
        "csv_dir"
    }

    fn load(&self, class: InstrumentClass) -> Result<Universe> {
        let path = self.path_for(class)?;
        tracing::debug!(%class, path = %path.display(), "loading instrument universe");

        let instruments = read_instruments(&path)?;
        tracing::info!(%class, rows = instruments.len(), "loaded instrument universe");
        Ok(Universe::new(class, instruments))
    }
}

fn read_instruments(path: &Path) -> Result<Vec<Instrument>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open universe file: {}", path.display()))?;

    let mut out = Vec::new();
    for (idx, row) in reader.deserialize::<InstrumentRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let row = row.with_context(|| format!("{}: malformed row at line {line}", path.display()))?;
        let instrument = Instrument {
            symbol: row.symbol.trim().to_string(),
            name: row
                .name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            mean_daily_return: row.mean_daily_return,
            daily_volatility: row.daily_volatility,
        };
        validate_instrument(&instrument)
            .with_context(|| format!("{}: invalid row at line {line}", path.display()))?;
        out.push(instrument);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_bond_file_with_display_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(BOND_FILE),
            "Name,Symbol,Mean Daily Return,Daily Volatility\n\
             Gilt 2033,GS2033,0.00021,0.0031\n\
             State Loan, SDL1 ,0.00018,0.0022\n",
        )
        .unwrap();

        let source = CsvUniverseSource::new(dir.path());
        let universe = source.load(InstrumentClass::Bond).unwrap();
        assert_eq!(universe.len(), 2);
        assert_eq!(universe.instruments()[0].name.as_deref(), Some("Gilt 2033"));
        assert_eq!(universe.instruments()[1].symbol, "SDL1");
    }

    #[test]
    fn reads_underscore_headers_and_currency_column() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CRYPTO_FILE),
            "Ticker,Mean_Daily_Return,Daily_Volatility,Market Cap\nBTC-USD,0.0021,0.035,1\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(CURRENCY_FILE),
            "Cuurency,Mean Daily Return,Daily Volatility\nUSDINR,0.0001,0.003\n",
        )
        .unwrap();

        let source = CsvUniverseSource::new(dir.path());
        let crypto = source.load(InstrumentClass::Crypto).unwrap();
        assert_eq!(crypto.instruments()[0].symbol, "BTC-USD");
        assert_eq!(crypto.instruments()[0].name, None);

        let currency = source.load(InstrumentClass::Currency).unwrap();
        assert_eq!(currency.instruments()[0].symbol, "USDINR");
    }

    #[test]
    fn picks_latest_equity_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let header = "Ticker,Mean Daily Return,Daily Volatility\n";
        fs::write(
            dir.path().join("nifty100_simulation_data_20250101.csv"),
            format!("{header}OLD.NS,0.001,0.02\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join("nifty100_simulation_data_20250301.csv"),
            format!("{header}NEW.NS,0.001,0.02\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join(EQUITY_FILE),
            format!("{header}FALLBACK.NS,0.001,0.02\n"),
        )
        .unwrap();

        let source = CsvUniverseSource::new(dir.path());
        let equity = source.load(InstrumentClass::Equity).unwrap();
        assert_eq!(equity.instruments()[0].symbol, "NEW.NS");
    }

    #[test]
    fn falls_back_to_plain_equity_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(EQUITY_FILE),
            "Ticker,Mean Daily Return,Daily Volatility\nINFY.NS,0.0007,0.015\n",
        )
        .unwrap();

        let equity = CsvUniverseSource::new(dir.path())
            .load(InstrumentClass::Equity)
            .unwrap();
        assert_eq!(equity.instruments()[0].symbol, "INFY.NS");
    }

    #[test]
    fn missing_file_and_bad_rows_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvUniverseSource::new(dir.path());
        assert!(source.load(InstrumentClass::Bond).is_err());

        fs::write(
            dir.path().join(CURRENCY_FILE),
            "Cuurency,Mean Daily Return,Daily Volatility\nEURINR,0.0001,-0.5\n",
        )
        .unwrap();
        assert!(source.load(InstrumentClass::Currency).is_err());

        fs::write(
            dir.path().join(CRYPTO_FILE),
            "Ticker,Mean_Daily_Return,Daily_Volatility\nETH-USD,abc,0.04\n",
        )
        .unwrap();
        assert!(source.load(InstrumentClass::Crypto).is_err());
    }
}
