use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{SourceSpec, SourcesConfig};
use crate::database::JobStore;
use crate::fetcher::Fetcher;
use crate::models::JobPosting;
use crate::notifier::Notifier;
use crate::scrapers::SourceScraper;
use crate::traits::JobScraper;

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Postings extracted across all sources, before dedup
    pub found: usize,
    /// Postings written to the store this run
    pub new_jobs: Vec<JobPosting>,
    /// `(source, message)` for every page or source that failed
    pub errors: Vec<(String, String)>,
    pub notified: bool,
}

/// Runs fetch, extract, dedup, store and notify across the configured sources.
///
/// Sources are processed one at a time; a failing source is logged and
/// skipped. The notifier is called once with every posting the run stored.
#[derive(Clone)]
pub struct JobFinder {
    fetcher: Fetcher,
    database: JobStore,
    notifier: Notifier,
}

impl JobFinder {
    pub fn new(fetcher: Fetcher, database: JobStore, notifier: Notifier) -> Self {
        Self {
            fetcher,
            database,
            notifier,
        }
    }

    pub async fn run(&self, config: &SourcesConfig) -> RunSummary {
        let mut summary = RunSummary::default();

        info!("Starting job scraping...");

        for spec in config.resolve() {
            self.scrape_source(&spec, &mut summary).await;
        }

        summary.notified = self.notifier.notify(&summary.new_jobs).await;

        info!(
            "Scraping completed! Found {} jobs, {} new, {} errors",
            summary.found,
            summary.new_jobs.len(),
            summary.errors.len()
        );

        match self.database.stats().await {
            Ok(stats) => info!(
                "Store holds {} jobs ({} new) by source: {:?}",
                stats.total, stats.new, stats.by_source
            ),
            Err(e) => warn!("Could not read store statistics: {}", e),
        }

        summary
    }

    async fn scrape_source(&self, spec: &SourceSpec, summary: &mut RunSummary) {
        let tag = spec.tag();
        info!("Scraping {}...", tag);

        let scraper = match SourceScraper::for_source(spec) {
            Ok(scraper) => scraper,
            Err(e) => {
                error!("Error scraping {}: {}", tag, e);
                summary.errors.push((tag, e.to_string()));
                return;
            }
        };

        let report = scraper.scrape(&self.fetcher).await;
        summary.found += report.postings.len();
        summary
            .errors
            .extend(report.failures.into_iter().map(|failure| (tag.clone(), failure)));

        let new_jobs = self.process_jobs(report.postings).await;
        info!("Found {} new jobs from {}", new_jobs.len(), tag);
        summary.new_jobs.extend(new_jobs);
    }

    /// Stores postings not seen before and returns the ones actually written,
    /// stamped with the same `scraped_at` the store recorded.
    async fn process_jobs(&self, jobs: Vec<JobPosting>) -> Vec<JobPosting> {
        let mut new_jobs = Vec::new();

        for mut job in jobs {
            match self.database.exists(&job.job_id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!("Error checking job {}: {}", job.job_id, e);
                    continue;
                }
            }

            job.scraped_at = Utc::now();
            match self.database.insert_if_absent(&job).await {
                Ok(true) => {
                    info!("New job found: {} at {}", job.title, job.company);
                    new_jobs.push(job);
                }
                Ok(false) => {}
                Err(e) => warn!("Error adding job {}: {}", job.job_id, e),
            }
        }

        new_jobs
    }
}
