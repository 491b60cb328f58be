//! Error types for the fetch, parse, store and notify seams of the pipeline.

use reqwest::StatusCode;

/// Failure of a single outbound page fetch, after retries are exhausted.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Failure to turn markup into a posting.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("cannot resolve link `{href}`: {reason}")]
    Url { href: String, reason: String },
}

/// Failure of a store read or write.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Failure to deliver a digest.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid mailbox `{0}`")]
    Address(String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("failed to render digest: {0}")]
    Render(#[from] askama::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("notifications are not configured")]
    Disabled,
}
