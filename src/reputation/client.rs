//! HTTP client for the third-party file-reputation API.
//!
//! A file unknown to the provider is a normal, non-exceptional outcome and is
//! modeled as such; only transport failures and unexpected statuses become
//! errors.

use crate::config::ReputationConfig;
use crate::error::{Result, VigilError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a reputation lookup, distinguished from transport failure.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// The provider knows this fingerprint; raw report attached.
    Found(Value),
    /// Fingerprint absent from the provider's database.
    NotFound,
    /// Quota exceeded; the caller may retry later.
    RateLimited,
    /// Key rejected.
    Unauthorized,
}

/// Seam for the reputation leg.
#[async_trait]
pub trait ReputationClient: Send + Sync {
    /// Look up a file report by its primary digest.
    async fn lookup(&self, sha256: &str, include: Option<&str>) -> Result<LookupOutcome>;
}

/// reqwest-backed client for the provider's v3 file endpoint.
#[derive(Debug, Clone)]
pub struct HttpReputationClient {
    config: ReputationConfig,
    client: reqwest::Client,
}

impl HttpReputationClient {
    pub fn new(config: ReputationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| VigilError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn file_url(&self, sha256: &str) -> String {
        format!("{}/files/{}", self.config.base_url, sha256)
    }
}

#[async_trait]
impl ReputationClient for HttpReputationClient {
    async fn lookup(&self, sha256: &str, include: Option<&str>) -> Result<LookupOutcome> {
        let mut request = self
            .client
            .get(self.file_url(sha256))
            .header("x-apikey", &self.config.api_key);
        if let Some(include) = include {
            request = request.query(&[("include", include)]);
        }

        let response = request.send().await.map_err(|e| {
            VigilError::ExternalServiceFailure(format!("reputation API unreachable: {}", e))
        })?;

        let status = response.status();
        debug!(%status, digest = %&sha256[..sha256.len().min(10)], "reputation lookup");
        match status {
            reqwest::StatusCode::NOT_FOUND => Ok(LookupOutcome::NotFound),
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                warn!("reputation API rate limited");
                Ok(LookupOutcome::RateLimited)
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                warn!("reputation API rejected credentials");
                Ok(LookupOutcome::Unauthorized)
            }
            s if s.is_success() => {
                let body: Value = response.json().await.map_err(|e| {
                    VigilError::ExternalServiceFailure(format!("invalid response body: {}", e))
                })?;
                Ok(LookupOutcome::Found(body))
            }
            s => Err(VigilError::ExternalServiceFailure(format!(
                "unexpected reputation API status: {}",
                s
            ))),
        }
    }
}
