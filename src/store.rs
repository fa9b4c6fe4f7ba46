//! Content-addressed storage for submitted file bytes.
//!
//! Files land under a directory derived from the primary digest: three
//! nested 4-character shards bound directory fan-out, and the stored name is
//! the first 10 hex characters plus the original extension. The truncation
//! keeps names short; the collision risk across unrelated files sharing a
//! digest prefix is an accepted tradeoff.
//!
//! This component never deletes anything. Retention is an operational
//! concern outside the core.

use crate::config::StorageConfig;
use crate::error::{Result, VigilError};
use std::path::PathBuf;
use tracing::{debug, info};

/// Minimum hex length for the three-level shard to be well-formed.
pub const MIN_DIGEST_HEX_LEN: usize = 12;

/// Length of the stored filename stem.
pub const FILENAME_HEX_LEN: usize = 10;

/// A storage location derived from a content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAddressedPath {
    /// Sharded directory, relative to the store base.
    pub dir: PathBuf,
    /// Filename stem: first 10 hex characters of the digest.
    pub stem: String,
}

impl ContentAddressedPath {
    /// Full relative path given the original extension (without a dot).
    pub fn file_name(&self, extension: Option<&str>) -> String {
        match extension {
            Some(ext) if !ext.is_empty() => format!("{}.{}", self.stem, ext),
            _ => self.stem.clone(),
        }
    }
}

/// Derive the sharded path for a primary digest. Pure; performs no I/O.
///
/// Fails with `InvalidDigestFormat` unless the input is at least 12
/// hexadecimal characters (either case). Shards are lowercased so the same
/// digest always lands in the same directory.
pub fn resolve_path(primary_digest_hex: &str) -> Result<ContentAddressedPath> {
    if primary_digest_hex.len() < MIN_DIGEST_HEX_LEN
        || !primary_digest_hex.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(VigilError::InvalidDigestFormat(format!(
            "need at least {} hex characters, got {:?}",
            MIN_DIGEST_HEX_LEN, primary_digest_hex
        )));
    }
    let hex = primary_digest_hex.to_ascii_lowercase();
    let mut dir = PathBuf::new();
    dir.push(&hex[0..4]);
    dir.push(&hex[4..8]);
    dir.push(&hex[8..12]);
    Ok(ContentAddressedPath {
        dir,
        stem: hex[..FILENAME_HEX_LEN].to_string(),
    })
}

/// The content-addressed file store rooted at a configured base directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    config: StorageConfig,
}

impl ContentStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Absolute path a digest/extension pair resolves to, without writing.
    pub fn locate(&self, primary_digest_hex: &str, extension: Option<&str>) -> Result<PathBuf> {
        let cap = resolve_path(primary_digest_hex)?;
        Ok(self
            .config
            .base_dir
            .join(&cap.dir)
            .join(cap.file_name(extension)))
    }

    /// Store bytes under the content-addressed path for `primary_digest_hex`.
    ///
    /// Directory creation is recursive and create-if-absent; writing the same
    /// bytes for the same digest twice is idempotent. The digest is validated
    /// before any filesystem mutation.
    pub async fn write(
        &self,
        primary_digest_hex: &str,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<PathBuf> {
        let cap = resolve_path(primary_digest_hex)?;
        let dir = self.config.base_dir.join(&cap.dir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(cap.file_name(extension));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size_bytes = bytes.len(), "stored content");
        info!(digest = %&primary_digest_hex[..FILENAME_HEX_LEN], "file stored");
        Ok(path)
    }
}
