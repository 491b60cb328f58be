//! Traits at the pipeline seams: HTTP transport, source scraping and digest delivery

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, NotifyError, ParseError};
use crate::fetcher::{Fetcher, RawDocument};
use crate::models::JobPosting;
use crate::notifier::Digest;

/// A single GET round-trip. Retries and throttling live in [`Fetcher`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch `url`, failing on transport errors and non-2xx statuses.
    async fn get(&self, url: &str) -> Result<RawDocument, FetchError>;
}

/// Delivers a rendered digest. Swappable so the notifier can be tested without SMTP.
#[async_trait]
pub trait DigestTransport: Send + Sync {
    async fn send(&self, digest: &Digest) -> Result<(), NotifyError>;
}

/// One page to fetch for a source, with the context recorded on its postings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    pub url: String,
    /// Search keyword for structured sources, target name for custom pages
    pub context: String,
}

/// What a source produced in one run.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub postings: Vec<JobPosting>,
    pub failures: Vec<String>,
}

/// A job source: knows which pages to fetch and how to turn them into postings.
#[async_trait]
pub trait JobScraper: Send + Sync {
    /// Provenance tag written to every posting, e.g. `linkedin` or `custom_acme`
    fn source(&self) -> &str;

    /// Pages to fetch this run
    fn targets(&self) -> Vec<ScrapeTarget>;

    /// Parse a fetched page. Each card is parsed independently.
    fn extract(&self, document: &RawDocument, target: &ScrapeTarget) -> Vec<Result<JobPosting, ParseError>>;

    /// Fetch and extract every target, isolating failures per page and per card.
    ///
    /// A page that cannot be fetched is recorded in `failures` and skipped;
    /// a card that cannot be parsed is logged and dropped.
    async fn scrape(&self, fetcher: &Fetcher) -> ScrapeReport {
        let mut report = ScrapeReport::default();

        for target in self.targets() {
            debug!("Fetching {} for {}", target.url, self.source());

            let document = match fetcher.fetch(&target.url).await {
                Ok(document) => document,
                Err(e) => {
                    error!("Error scraping {} for {}: {}", self.source(), target.context, e);
                    report.failures.push(format!("{}: {e}", target.url));
                    continue;
                }
            };

            debug!("Fetched {} ({}, {} bytes)", document.url, document.status, document.body.len());

            let mut parsed = 0;
            for card in self.extract(&document, &target) {
                match card {
                    Ok(posting) => {
                        parsed += 1;
                        report.postings.push(posting);
                    }
                    Err(e) => warn!("Error parsing {} card: {}", self.source(), e),
                }
            }

            info!("Extracted {} postings from {} ({})", parsed, self.source(), target.context);
        }

        report
    }
}
