//! Configuration for the scan orchestration pipeline.
//!
//! All configuration is carried in plain structs injected at construction;
//! there is no ambient global. The scanner executable path is validated to
//! exist up front so a misconfigured deployment fails at startup rather than
//! on the first submission.

use crate::error::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the scanner executable.
pub const SCANNER_PATH_ENV: &str = "SCANNER_PATH";
/// Environment variable carrying the reputation API key.
pub const REPUTATION_API_KEY_ENV: &str = "VT_API_KEY";

/// Master configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    /// Local scanner subprocess configuration.
    pub scanner: ScannerConfig,
    /// Content-addressed storage configuration.
    pub storage: StorageConfig,
    /// Reputation API client configuration.
    pub reputation: ReputationConfig,
    /// Orchestrator behavior switches.
    pub orchestrator: OrchestratorConfig,
}

impl VigilConfig {
    /// Build a configuration from the environment, keeping defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(path) = std::env::var(SCANNER_PATH_ENV) {
            cfg.scanner.executable = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var(REPUTATION_API_KEY_ENV) {
            cfg.reputation.api_key = key;
        }
        cfg
    }

    /// Validate the parts that must hold before serving any request.
    pub fn validate(&self) -> Result<()> {
        self.scanner.validate()?;
        if self.reputation.api_key.is_empty() {
            return Err(VigilError::InvalidInput(format!(
                "reputation API key is not set ({})",
                REPUTATION_API_KEY_ENV
            )));
        }
        Ok(())
    }
}

/// Local scanner subprocess configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Path to the scanner executable.
    pub executable: PathBuf,
    /// Flag selecting immediate (batch) scan mode.
    pub scan_now_flag: String,
    /// Flag introducing the file argument.
    pub files_flag: String,
    /// Delay before the unconditional negative-answer reinforcement, in
    /// milliseconds.
    pub reinforce_delay_ms: u64,
    /// Whole-scan time budget in seconds.
    pub timeout_seconds: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("segavcmd"),
            scan_now_flag: "--scan-now".to_string(),
            files_flag: "--files".to_string(),
            reinforce_delay_ms: 2000,
            timeout_seconds: crate::timeout::SCANNER_TIMEOUT_SECONDS,
        }
    }
}

impl ScannerConfig {
    /// Fails if the executable does not exist. Fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if !self.executable.exists() {
            return Err(VigilError::ExternalProcessFailure(format!(
                "scanner executable not found at {}",
                self.executable.display()
            )));
        }
        Ok(())
    }
}

/// Content-addressed storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory under which submitted files are stored.
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("quarantine"),
        }
    }
}

impl StorageConfig {
    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base.as_ref().to_path_buf(),
        }
    }
}

/// Reputation API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// API key sent in the x-apikey header.
    pub api_key: String,
    /// Per-lookup time budget in seconds.
    pub timeout_seconds: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.virustotal.com/api/v3".to_string(),
            api_key: String::new(),
            timeout_seconds: crate::timeout::REPUTATION_TIMEOUT_SECONDS,
        }
    }
}

/// Orchestrator behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Look up prior analyses by fingerprint before re-scanning.
    pub check_hash_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            check_hash_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = VigilConfig::default();
        assert_eq!(cfg.scanner.scan_now_flag, "--scan-now");
        assert_eq!(cfg.scanner.files_flag, "--files");
        assert_eq!(cfg.scanner.reinforce_delay_ms, 2000);
        assert!(cfg.orchestrator.check_hash_enabled);
        assert!(cfg.reputation.base_url.ends_with("/api/v3"));
    }

    #[test]
    fn test_scanner_validation_missing_executable() {
        let cfg = ScannerConfig {
            executable: PathBuf::from("/nonexistent/scanner-binary"),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(VigilError::ExternalProcessFailure(_))
        ));
    }

    #[test]
    fn test_config_roundtrip_serde() {
        let cfg = VigilConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: VigilConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scanner.timeout_seconds, cfg.scanner.timeout_seconds);
    }
}
