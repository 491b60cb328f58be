//! # Page Fetcher
//!
//! Outbound HTTP layer shared by every source. A [`Fetcher`] wraps an
//! [`HttpClient`] with the request discipline the sources need to avoid
//! anti-scraping defenses:
//!
//! - **Session identity**: one user agent is picked at random from the pool
//!   when the fetcher is built and kept for its whole lifetime.
//! - **Retries**: transport failures and non-2xx statuses are retried up to
//!   `max_retries` attempts. After failed attempt `n` the fetcher waits
//!   `2^n` seconds; there is no wait before the first attempt. When every
//!   attempt fails, the last error is returned.
//! - **Throttling**: every successful fetch sleeps a uniform random delay in
//!   `[base_delay, base_delay + delay_jitter]` before returning.
//! - **Timeout**: each attempt is bounded by `timeout` (30s).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use tracing::warn;

use crate::error::FetchError;
use crate::traits::HttpClient;

pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// A fetched page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Request discipline for a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Identity pool; one entry is chosen per session
    pub user_agents: Vec<String>,
    /// Minimum pause after a successful fetch
    pub base_delay: Duration,
    /// Width of the random window added on top of `base_delay`
    pub delay_jitter: Duration,
    /// Total attempts per fetch, including the first
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agents: DEFAULT_USER_AGENTS.iter().map(ToString::to_string).collect(),
            base_delay: Duration::from_secs(2),
            delay_jitter: Duration::from_secs(2),
            max_retries: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

impl FetcherConfig {
    fn pick_user_agent(&self) -> String {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string())
    }

    fn throttle_delay(&self) -> Duration {
        if self.delay_jitter.is_zero() {
            return self.base_delay;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=self.delay_jitter.as_secs_f64());
        self.base_delay + Duration::from_secs_f64(jitter)
    }
}

/// Production [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<RawDocument, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await?;
        Ok(RawDocument {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

/// Retrying, throttled page fetcher. Cheap to clone.
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    config: FetcherConfig,
    user_agent: String,
}

impl Fetcher {
    /// Builds a fetcher with a `reqwest` client and a randomly chosen session identity.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let user_agent = config.pick_user_agent();
        let client = ReqwestClient::new(&user_agent, config.timeout)?;

        Ok(Self {
            client: Arc::new(client),
            config,
            user_agent,
        })
    }

    /// Builds a fetcher over an arbitrary transport.
    pub fn with_client(config: FetcherConfig, client: Arc<dyn HttpClient>) -> Self {
        let user_agent = config.pick_user_agent();
        Self {
            client,
            config,
            user_agent,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 1;

        loop {
            match self.client.get(url).await {
                Ok(document) => {
                    let delay = self.config.throttle_delay();
                    tokio::time::sleep(delay).await;
                    return Ok(document);
                }
                Err(e) if attempt < attempts => {
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt));
                    warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt, attempts, url, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
