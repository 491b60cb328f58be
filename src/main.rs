use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod database;
mod error;
mod fetcher;
mod identity;
mod job_finder;
mod models;
mod notifier;
mod scrapers;
mod traits;

use config::{Settings, SourcesConfig};
use database::JobStore;
use fetcher::Fetcher;
use job_finder::JobFinder;
use notifier::{Notifier, SmtpTransport};

/// Loads the sources file fresh for every run so edits apply without a restart.
async fn run_once(finder: &JobFinder, sources_file: &str, guard: &Mutex<()>) {
    let Ok(_running) = guard.try_lock() else {
        warn!("Previous run still in progress, skipping this trigger");
        return;
    };

    let config = SourcesConfig::load(sources_file);
    let summary = finder.run(&config).await;

    for (source, message) in &summary.errors {
        error!("{} failed: {}", source, message);
    }
    if !summary.notified {
        warn!("{} new jobs were stored but the digest was not delivered", summary.new_jobs.len());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("job_finder=info")))
        .init();

    info!("Starting Job Finder");

    let settings = Settings::from_env().context("loading settings")?;
    let run_once_only = std::env::args().skip(1).any(|arg| arg == "--once");

    let fetcher = Fetcher::new(settings.fetcher_config()).context("building HTTP client")?;
    info!("Session user agent: {}", fetcher.user_agent());
    let database = JobStore::new(&settings.database_url)
        .await
        .with_context(|| format!("opening database {}", settings.database_url))?;
    let notifier = match settings.email.clone() {
        Some(email) => Notifier::new(Arc::new(SmtpTransport::new(email))),
        None => Notifier::disabled(),
    };
    if notifier.is_enabled() {
        info!("Digest notifications enabled");
    }

    let finder = JobFinder::new(fetcher, database, notifier);
    let guard = Arc::new(Mutex::new(()));

    // Run once immediately
    run_once(&finder, &settings.sources_file, &guard).await;

    if run_once_only {
        return Ok(());
    }

    let sched = JobScheduler::new().await?;

    let job_finder = finder.clone();
    let job_guard = guard.clone();
    let sources_file = settings.sources_file.clone();
    sched
        .add(
            Job::new_async(settings.schedule.as_str(), move |_uuid, _l| {
                let finder = job_finder.clone();
                let guard = job_guard.clone();
                let sources_file = sources_file.clone();
                Box::pin(async move {
                    run_once(&finder, &sources_file, &guard).await;
                })
            })
            .with_context(|| format!("invalid SCRAPE_SCHEDULE `{}`", settings.schedule))?,
        )
        .await?;

    info!("Scheduler started - running on `{}`", settings.schedule);
    sched.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
