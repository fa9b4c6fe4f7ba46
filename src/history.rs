//! Analysis records and the dedup/history store seam.
//!
//! One record per scan event: re-scanning a file appends a new record
//! referencing the same fingerprint instead of mutating the old one, so the
//! stored history is append-only. The backing document store is an external
//! collaborator consumed through the `HistoryStore` trait; an in-memory
//! implementation backs the tests.

use crate::error::{Result, VigilError};
use crate::fingerprint::FileFingerprint;
use crate::reputation::ReputationVerdict;
use crate::scanner::LocalScanVerdict;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// The backend's per-operation batch ceiling, with headroom below the
/// provider's hard limit of 500.
pub const DELETE_BATCH_CEILING: usize = 450;

static REPORT_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}-?[0-9]{1,5}$").unwrap());

/// Validate the optional report-number format: 3 letters, optional hyphen,
/// up to 5 digits (e.g. `REP-12345`).
pub fn validate_report_number(value: &str) -> Result<()> {
    if REPORT_NUMBER_RE.is_match(value) {
        Ok(())
    } else {
        Err(VigilError::InvalidInput(format!(
            "report number {:?} does not match AAA-NNNNN",
            value
        )))
    }
}

/// One scan event for one file.
///
/// Immutable once persisted except for the user-editable report number and
/// comment. The id is opaque and assigned by the store at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub hashes: FileFingerprint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub scan_result: Option<LocalScanVerdict>,
    pub virus_total_result: Option<ReputationVerdict>,
    /// When this scan event happened.
    pub date: DateTime<Utc>,
    /// For re-scans, when the original scan happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_scan_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The two user-editable fields.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub report_number: Option<String>,
    pub comment: Option<String>,
}

/// The four-operation (plus batching) surface the core needs from the
/// persistence backend. All operations may fail with `StoreUnavailable`;
/// retry policy belongs to the caller.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// First prior analysis matching the primary digest, if any.
    async fn find_by_fingerprint(&self, sha256: &str) -> Result<Option<AnalysisRecord>>;

    /// Persist a new record, assigning its opaque id; returns the stored
    /// record with id and timestamps filled in.
    async fn insert(&self, record: AnalysisRecord) -> Result<AnalysisRecord>;

    /// All records, unordered as stored; the caller sorts.
    async fn list_all(&self) -> Result<Vec<AnalysisRecord>>;

    /// Apply the user-editable fields to an existing record.
    async fn update(&self, id: &str, patch: RecordPatch) -> Result<()>;

    /// Delete a single record by id.
    async fn delete_one(&self, id: &str) -> Result<()>;

    /// Delete up to `DELETE_BATCH_CEILING` records in one backend operation.
    async fn delete_batch(&self, ids: &[String]) -> Result<()>;

    /// Delete any number of records, chunking transparently under the
    /// backend's batch ceiling.
    async fn delete_many(&self, ids: &[String]) -> Result<usize> {
        let mut deleted = 0;
        for chunk in ids.chunks(DELETE_BATCH_CEILING) {
            self.delete_batch(chunk).await?;
            deleted += chunk.len();
        }
        debug!(deleted, "batched delete complete");
        Ok(deleted)
    }
}

/// In-memory history store. The synchronization point for concurrent
/// submissions in tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<String, AnalysisRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn find_by_fingerprint(&self, sha256: &str) -> Result<Option<AnalysisRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.hashes.sha256 == sha256)
            .cloned())
    }

    async fn insert(&self, mut record: AnalysisRecord) -> Result<AnalysisRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        record.id = Some(id.clone());
        record.created_at = now;
        record.updated_at = now;
        self.records.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<AnalysisRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| VigilError::StoreUnavailable(format!("no record with id {}", id)))?;
        if let Some(report_number) = patch.report_number {
            validate_report_number(&report_number)?;
            record.report_number = Some(report_number);
        }
        if let Some(comment) = patch.comment {
            record.comment = Some(comment);
        }
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_one(&self, id: &str) -> Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<()> {
        let mut records = self.records.write().await;
        for id in ids {
            records.remove(id);
        }
        Ok(())
    }
}
