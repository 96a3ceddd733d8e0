pub mod aggregate;
pub mod domain;
pub mod optimizer;
pub mod predictor;
pub mod search;
pub mod shortlist;
pub mod universe;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_SEARCH_SEED: u64 = 42;
    const DEFAULT_RISK_FREE_RATE: f64 = 0.0001;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_dir: Option<String>,
        pub sentry_dsn: Option<String>,
        pub search_seed: u64,
        pub risk_free_rate: f64,
        pub search_deadline_ms: Option<u64>,
        pub aggregate_parallel: bool,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        fn from_lookup<F>(var: F) -> anyhow::Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let search_seed = match var("SEARCH_SEED") {
                Some(s) => s
                    .trim()
                    .parse::<u64>()
                    .with_context(|| {
                        format!("SEARCH_SEED must be an unsigned integer (got {s:?})")
                    })?,
                None => DEFAULT_SEARCH_SEED,
            };

            let risk_free_rate = match var("RISK_FREE_RATE") {
                Some(s) => {
                    let rate = s
                        .trim()
                        .parse::<f64>()
                        .with_context(|| format!("RISK_FREE_RATE must be a number (got {s:?})"))?;
                    anyhow::ensure!(rate.is_finite(), "RISK_FREE_RATE must be finite");
                    rate
                }
                None => DEFAULT_RISK_FREE_RATE,
            };

            // Zero disables the deadline.
            let search_deadline_ms = match var("SEARCH_DEADLINE_MS") {
                Some(s) => {
                    let ms = s.trim().parse::<u64>().with_context(|| {
                        format!("SEARCH_DEADLINE_MS must be an unsigned integer (got {s:?})")
                    })?;
                    (ms > 0).then_some(ms)
                }
                None => None,
            };

            let aggregate_parallel = var("AGGREGATE_PARALLEL")
                .map(|s| !matches!(s.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true);

            Ok(Self {
                data_dir: var("CAPWISE_DATA_DIR"),
                sentry_dsn: var("SENTRY_DSN"),
                search_seed,
                risk_free_rate,
                search_deadline_ms,
                aggregate_parallel,
            })
        }

        pub fn require_data_dir(&self) -> anyhow::Result<&str> {
            self.data_dir
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .context("CAPWISE_DATA_DIR is required")
        }

        pub fn search_settings(&self) -> crate::search::SearchSettings {
            crate::search::SearchSettings {
                seed: self.search_seed,
                risk_free_rate: self.risk_free_rate,
                deadline: self.search_deadline_ms.map(Duration::from_millis),
            }
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                data_dir: None,
                sentry_dsn: None,
                search_seed: DEFAULT_SEARCH_SEED,
                risk_free_rate: DEFAULT_RISK_FREE_RATE,
                search_deadline_ms: None,
                aggregate_parallel: true,
            }
        }
    }

}
