use thiserror::Error;

/// Invalid initialization arguments. This is the only error that crosses the
/// public boundary of [`crate::Flagship`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("application key cannot be empty")]
    EmptyAppKey,

    #[error("base URL cannot be empty")]
    EmptyBaseUrl,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("no Tokio runtime available; initialize from within a runtime context")]
    NoRuntime,
}

/// A single failed fetch attempt against the remote flag source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed flag payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server returned no flags")]
    Empty,
}

/// Persistent store failures. Logged and degraded, never surfaced.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("failed to encode flag snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode flag snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}
