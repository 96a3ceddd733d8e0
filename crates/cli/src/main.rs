use anyhow::Context;
use capwise_core::aggregate::Aggregator;
use capwise_core::domain::allocation::parse_allocation;
use capwise_core::domain::instrument::InstrumentClass;
use capwise_core::predictor::{Advisor, FixedAllocationPredictor, InvestorProfile};
use capwise_core::shortlist::CsvTopInstruments;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "capwise")]
struct Args {
    /// Directory holding the per-class statistics CSVs. Overrides CAPWISE_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Run asset classes one after another instead of in parallel.
    #[arg(long, global = true)]
    sequential: bool,

    /// Pretty-print the JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fill a top-level allocation with instrument baskets.
    Allocate {
        #[arg(long)]
        capital: f64,

        /// e.g. `equity=40,debt=30,gold=10,cash=20`
        #[arg(long)]
        allocation: String,
    },
    /// Build a single instrument basket.
    Recommend {
        /// bond, crypto, currency or equity
        #[arg(long)]
        class: InstrumentClass,

        #[arg(long)]
        amount: f64,
    },
    /// Predict an allocation for an investor profile (JSON file) and fill it.
    Advise {
        #[arg(long)]
        profile: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = capwise_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Some(dir) = args.data_dir.clone() {
        settings.data_dir = Some(dir);
    }
    if args.sequential {
        settings.aggregate_parallel = false;
    }

    match run(&args, &settings) {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "capwise run failed");
            Err(err)
        }
    }
}

fn run(args: &Args, settings: &capwise_core::config::Settings) -> anyhow::Result<String> {
    let aggregator = Aggregator::from_settings(settings)?;

    let value = match &args.command {
        Command::Allocate {
            capital,
            allocation,
        } => {
            anyhow::ensure!(
                capital.is_finite() && *capital >= 0.0,
                "--capital must be a non-negative number"
            );
            let percentages = parse_allocation(allocation)?;
            let response = aggregator.aggregate(&percentages, *capital);
            serde_json::to_value(&response)?
        }
        Command::Recommend { class, amount } => {
            let out = aggregator.recommend(*class, *amount)?;
            tracing::info!(%class, holdings = out.recommendations.len(), "basket built");
            serde_json::to_value(&out)?
        }
        Command::Advise { profile } => {
            let raw = std::fs::read_to_string(profile)
                .with_context(|| format!("read profile failed: {}", profile.display()))?;
            let profile: InvestorProfile =
                serde_json::from_str(&raw).context("investor profile JSON is invalid")?;

            let top = CsvTopInstruments::in_dir(settings.require_data_dir()?);
            let advisor = Advisor::new(Arc::new(FixedAllocationPredictor::default()), aggregator)
                .with_top_instruments(Arc::new(top));
            let response = advisor.advise(&profile)?;
            serde_json::to_value(&response)?
        }
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(rendered)
}

fn init_sentry(settings: &capwise_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
