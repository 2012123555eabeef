use std::time::Duration;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use senior_news::config::{live_artifact_url, Config};
use senior_news::fetcher::{Fetcher, LiveSnapshot};
use senior_news::pipeline::Pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "senior_news=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("SENIOR_NEWS_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded {} feeds from {}", config.feeds.len(), config_path);

    let fetcher = Fetcher::new(&config.user_agent, Duration::from_secs(config.timeout_secs))?;

    let live = config.resolve_base_url().map(|base| {
        info!("Archiving against {}", base);
        LiveSnapshot::new(&fetcher, live_artifact_url(&base))
    });
    if live.is_none() {
        info!("No site base URL configured, skipping archive");
    }

    let report = Pipeline::new(&config, &fetcher)
        .run(live.as_ref(), Utc::now())
        .await?;

    info!(
        "Run complete: {} items published ({} fresh, {} feeds ok, {} feeds failed{})",
        report.payload.total,
        report.fresh,
        report.feeds_ok,
        report.failures.len(),
        if report.blended { ", backfilled" } else { "" }
    );

    Ok(())
}
