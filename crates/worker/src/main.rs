use clap::Parser;
use pricewatch_core::browser::http::HttpLauncher;
use pricewatch_core::pipeline::{Aggregator, Pipeline};
use pricewatch_core::run::RunConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod categories;

#[derive(Debug, Parser)]
#[command(name = "pricewatch_worker")]
struct Args {
    /// JSON file with `[{"label": ..., "tickers": [...]}]`. Defaults to the built-in list.
    #[arg(long)]
    categories: Option<PathBuf>,

    /// Report path. Overrides REPORT_OUTPUT_PATH.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pause between categories in seconds. Overrides CATEGORY_DELAY_SECS.
    #[arg(long)]
    delay_secs: Option<u64>,

    /// Resolve and log the plan without opening a browser or the report file.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pricewatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&settings.output_path));
    let config = RunConfig {
        categories: categories::load_categories(args.categories.as_deref())?,
        delay: args
            .delay_secs
            .map(Duration::from_secs)
            .unwrap_or(settings.category_delay),
    };
    config.validate()?;

    if args.dry_run {
        for category in &config.categories {
            tracing::info!(
                category = %category.label,
                tickers = category.tickers.len(),
                "planned category"
            );
        }
        tracing::info!(
            dry_run = true,
            categories = config.categories.len(),
            output = %output.display(),
            delay = ?config.delay,
            "scrape run planned (dry-run)"
        );
        return Ok(());
    }

    let pipeline = Pipeline::new(
        Box::new(HttpLauncher::from_settings(&settings)),
        Aggregator::from_settings(&settings),
    );

    match pricewatch_core::run::run_to_file(&pipeline, &config, &output).await {
        Ok(written) => {
            tracing::info!(categories = written, output = %output.display(), "scrape run finished");
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(output = %output.display(), error = %format!("{err:#}"), "scrape run failed");
            Err(err)
        }
    }
}

fn init_sentry(settings: &pricewatch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
