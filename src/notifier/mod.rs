//! # Digest Notifications
//!
//! New postings from a run are announced in a single digest message. The
//! digest is rendered by a pure function ([`render_digest`]) and handed to a
//! [`DigestTransport`]; [`SmtpTransport`] delivers it by email.
//!
//! ## Contract
//!
//! - An empty run sends nothing and reports success.
//! - Otherwise exactly one message is sent, listing every posting.
//! - Delivery failures are logged and reported as `false`. They never touch
//!   postings that were already stored.
//! - Without SMTP settings the notifier is disabled and logs a warning.

pub mod smtp;

use std::sync::Arc;

use askama::Template;
use tracing::{error, info, warn};

use crate::error::NotifyError;
use crate::models::{JobPosting, NOT_AVAILABLE};
use crate::traits::DigestTransport;

pub use smtp::SmtpTransport;

/// A rendered digest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    /// Postings enumerated in the body
    pub count: usize,
}

/// Sends one digest per run through an optional transport.
#[derive(Clone)]
pub struct Notifier {
    transport: Option<Arc<dyn DigestTransport>>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn DigestTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    pub fn disabled() -> Self {
        warn!("Email settings incomplete - digest notifications will be disabled");
        Self { transport: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Sends the digest for `postings`. Returns whether the run's postings were announced.
    pub async fn notify(&self, postings: &[JobPosting]) -> bool {
        if postings.is_empty() {
            info!("No new jobs to notify about");
            return true;
        }

        match self.deliver(postings).await {
            Ok(count) => {
                info!("Digest sent with {} new jobs", count);
                true
            }
            Err(e) => {
                error!("Error sending digest notification: {}", e);
                false
            }
        }
    }

    async fn deliver(&self, postings: &[JobPosting]) -> Result<usize, NotifyError> {
        let transport = self.transport.as_ref().ok_or(NotifyError::Disabled)?;
        let digest = render_digest(postings)?;
        transport.send(&digest).await?;
        Ok(digest.count)
    }
}

/// One posting as it appears in the digest body.
struct DigestEntry<'a> {
    title: &'a str,
    company: &'a str,
    location: &'a str,
    /// Empty when the posting has no salary bounds
    salary: String,
    url: &'a str,
    source: &'a str,
}

#[derive(Template)]
#[template(path = "digest.html")]
struct DigestTemplate<'a> {
    count: usize,
    jobs: Vec<DigestEntry<'a>>,
}

/// Renders the HTML digest for a non-empty list of postings.
pub fn render_digest(postings: &[JobPosting]) -> Result<Digest, NotifyError> {
    let count = postings.len();
    let jobs = postings
        .iter()
        .map(|job| DigestEntry {
            title: &job.title,
            company: &job.company,
            location: job.location.as_deref().unwrap_or(NOT_AVAILABLE),
            salary: job.salary_range().unwrap_or_default(),
            url: &job.url,
            source: &job.source,
        })
        .collect();

    let html = DigestTemplate { count, jobs }.render()?;

    Ok(Digest {
        subject: format!("{count} New Job Opportunities Found!"),
        html,
        count,
    })
}
