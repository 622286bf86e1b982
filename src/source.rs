use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;

use crate::error::{ConfigError, FetchError};
use crate::flag::{FeatureFlag, FlagSet};

/// Remote provider of the full flag list for an application key.
#[async_trait]
pub trait FlagSource: Send + Sync {
    /// Performs one fetch. Any failure counts as one failed attempt for the
    /// resolver; retries are not the source's concern.
    async fn get_flags(&self, application_key: &str) -> Result<FlagSet, FetchError>;
}

/// Normalizes a base URL so it ends with exactly one `/`.
///
/// Only absolute `http` and `https` URLs without a query or fragment are
/// accepted, since request paths are appended to the base path.
pub fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: trimmed.to_string(),
        reason,
    };

    let mut url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("URL has no host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("URL must not have a query or fragment".to_string()));
    }
    let path = format!("{}/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// Fetches flags over HTTP from `GET {base}sdk/{applicationKey}/flags`.
#[derive(Debug, Clone)]
pub struct HttpFlagSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFlagSource {
    pub fn new(base_url: Url) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flagship/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The application key is encoded as a single path segment.
    pub fn flags_url(&self, application_key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["sdk", application_key, "flags"]);
        }
        url
    }
}

#[async_trait]
impl FlagSource for HttpFlagSource {
    async fn get_flags(&self, application_key: &str) -> Result<FlagSet, FetchError> {
        let url = self.flags_url(application_key);
        tracing::debug!(%url, "requesting flags");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        let flags: Vec<FeatureFlag> = serde_json::from_slice(&body)?;
        Ok(flags.into())
    }
}
