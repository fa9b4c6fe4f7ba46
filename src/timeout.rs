//! Timeout utilities for bounding the external scan legs.
//!
//! Both external collaborators (the scanner subprocess and the reputation
//! API) are wrapped in a timeout so a hung scan cannot pin a request forever.

use crate::error::{Result, VigilError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

/// Default timeout for a local scanner run, in seconds
pub const SCANNER_TIMEOUT_SECONDS: u64 = 300; // 5 minutes

/// Default timeout for a reputation API lookup, in seconds
pub const REPUTATION_TIMEOUT_SECONDS: u64 = 30;

/// Timeout configuration for an external operation
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    /// Create a new timeout configuration
    pub fn new(seconds: u64, operation: impl Into<String>) -> Self {
        Self {
            duration: Duration::from_secs(seconds),
            operation_name: operation.into(),
        }
    }

    /// Timeout sized for a scanner subprocess run
    pub fn scanner() -> Self {
        Self::new(SCANNER_TIMEOUT_SECONDS, "local_scan")
    }

    /// Timeout sized for a reputation lookup
    pub fn reputation() -> Self {
        Self::new(REPUTATION_TIMEOUT_SECONDS, "reputation_lookup")
    }
}

/// Execute an async operation with a timeout
pub async fn with_timeout<T, F>(config: TimeoutConfig, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(
        "Starting operation '{}' with timeout of {}s",
        config.operation_name,
        config.duration.as_secs()
    );

    match timeout(config.duration, future).await {
        Ok(result) => {
            debug!(
                "Operation '{}' completed within budget",
                config.operation_name
            );
            result
        }
        Err(_) => {
            error!(
                "Operation '{}' timed out after {}s",
                config.operation_name,
                config.duration.as_secs()
            );
            Err(VigilError::Timeout {
                seconds: config.duration.as_secs(),
            })
        }
    }
}
