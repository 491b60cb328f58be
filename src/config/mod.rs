//! Process settings read from the environment (after `.env` is loaded).

pub mod sources;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::fetcher::FetcherConfig;

pub use sources::{CustomTarget, SearchParams, SourceSpec, SourcesConfig};

/// SMTP credentials for the digest email.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub sources_file: String,
    pub request_delay: Duration,
    pub max_retries: u32,
    /// Six-field cron expression for the daily run
    pub schedule: String,
    /// `None` when any of user, password or recipient is missing
    pub email: Option<EmailSettings>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_delay = match get("REQUEST_DELAY") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64)
                .with_context(|| format!("REQUEST_DELAY must be a non-negative number of seconds, got `{v}`"))?,
            None => Duration::from_secs(2),
        };

        let max_retries = match get("MAX_RETRIES") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .with_context(|| format!("MAX_RETRIES must be a positive integer, got `{v}`"))?,
            None => 3,
        };

        let port = match get("EMAIL_PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("EMAIL_PORT must be a port number, got `{v}`"))?,
            None => 587,
        };

        let email = match (get("EMAIL_USER"), get("EMAIL_PASSWORD"), get("RECIPIENT_EMAIL")) {
            (Some(username), Some(password), Some(recipient)) => Some(EmailSettings {
                host: get("EMAIL_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port,
                username,
                password,
                recipient,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite:data/jobs.db".to_string()),
            sources_file: get("SOURCES_FILE")
                .unwrap_or_else(|| "config/job_sources.yaml".to_string()),
            request_delay,
            max_retries,
            schedule: get("SCRAPE_SCHEDULE").unwrap_or_else(|| "0 0 9 * * *".to_string()),
            email,
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            base_delay: self.request_delay,
            max_retries: self.max_retries,
            ..FetcherConfig::default()
        }
    }
}
