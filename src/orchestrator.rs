//! The coordinating logic for one submission: fingerprint, dedup check,
//! content-addressed store, both scan legs, record assembly, persistence.
//!
//! The two scan legs are independent and are issued concurrently. A failed
//! leg degrades to an absent verdict on the record instead of aborting the
//! request; only a scanner spawn failure, a storage write failure, or an
//! unavailable history store is fatal.

use crate::config::OrchestratorConfig;
use crate::error::{Result, VigilError};
use crate::filetype;
use crate::fingerprint::FileFingerprint;
use crate::history::{validate_report_number, AnalysisRecord, HistoryStore};
use crate::reputation::{self, LookupOutcome, ReputationClient, ReputationVerdict};
use crate::scanner::{self, LocalScanVerdict, LocalScanner};
use crate::store::ContentStore;
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn, Instrument};

/// One file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Content type as declared by the client, if any.
    pub declared_type: Option<String>,
    pub report_number: Option<String>,
    pub comment: Option<String>,
}

/// The scan orchestration pipeline.
pub struct Orchestrator<S, R, H> {
    config: OrchestratorConfig,
    store: ContentStore,
    scanner: S,
    reputation: R,
    history: H,
}

impl<S, R, H> Orchestrator<S, R, H>
where
    S: LocalScanner,
    R: ReputationClient,
    H: HistoryStore,
{
    pub fn new(
        config: OrchestratorConfig,
        store: ContentStore,
        scanner: S,
        reputation: R,
        history: H,
    ) -> Self {
        Self {
            config,
            store,
            scanner,
            reputation,
            history,
        }
    }

    /// Access to the underlying history store for list/update/delete flows.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Process a new submission end to end and return the persisted record.
    ///
    /// With dedup enabled, a prior analysis of the same content short-circuits
    /// the pipeline: the existing record is returned with no re-scan and no
    /// re-store.
    pub async fn submit(&self, submission: Submission) -> Result<AnalysisRecord> {
        if submission.bytes.is_empty() {
            return Err(VigilError::InvalidInput("empty file".to_string()));
        }
        if let Some(report_number) = submission.report_number.as_deref() {
            validate_report_number(report_number)?;
        }

        let fingerprint = FileFingerprint::of_bytes(&submission.bytes);
        let span = tracing::info_span!(
            "submission",
            file = %submission.name,
            digest = %fingerprint.short()
        );
        self.submit_inner(submission, fingerprint)
            .instrument(span)
            .await
    }

    async fn submit_inner(
        &self,
        submission: Submission,
        fingerprint: FileFingerprint,
    ) -> Result<AnalysisRecord> {
        if self.config.check_hash_enabled {
            if let Some(existing) = self
                .history
                .find_by_fingerprint(&fingerprint.sha256)
                .await?
            {
                info!(id = ?existing.id, "dedup hit, returning prior analysis");
                return Ok(existing);
            }
        }

        let file_type = filetype::classify(
            &submission.bytes,
            &submission.name,
            submission.declared_type.as_deref(),
        );
        let extension = file_extension(&submission.name);
        let stored_path = self
            .store
            .write(
                &fingerprint.sha256,
                &submission.bytes,
                extension.as_deref(),
            )
            .await?;

        let (local, remote) = tokio::join!(
            self.local_leg(&stored_path),
            self.reputation_leg(&fingerprint.sha256),
        );
        let scan_result = local?;
        let virus_total_result = remote?;

        let now = Utc::now();
        let record = AnalysisRecord {
            id: None,
            name: submission.name,
            size: submission.bytes.len() as u64,
            file_type,
            hashes: fingerprint,
            report_number: submission.report_number,
            comment: submission.comment,
            scan_result,
            virus_total_result,
            date: now,
            original_scan_date: None,
            created_at: now,
            updated_at: now,
        };
        let stored = self.history.insert(record).await?;
        info!(id = ?stored.id, "analysis recorded");
        Ok(stored)
    }

    /// Re-run both legs for an existing record and append a new record for
    /// the same content. The old record is untouched.
    pub async fn rescan(&self, record: &AnalysisRecord) -> Result<AnalysisRecord> {
        let extension = file_extension(&record.name);
        let stored_path = self
            .store
            .locate(&record.hashes.sha256, extension.as_deref())?;
        if !stored_path.exists() {
            return Err(VigilError::InvalidInput(format!(
                "stored artifact missing for {}",
                record.hashes.short()
            )));
        }

        let span = tracing::info_span!("rescan", digest = %record.hashes.short());
        async {
            let (local, remote) = tokio::join!(
                self.local_leg(&stored_path),
                self.reputation_leg(&record.hashes.sha256),
            );
            let scan_result = local?;
            let virus_total_result = remote?;

            let now = Utc::now();
            let rescanned = AnalysisRecord {
                id: None,
                name: record.name.clone(),
                size: record.size,
                file_type: record.file_type.clone(),
                hashes: record.hashes.clone(),
                report_number: record.report_number.clone(),
                comment: record.comment.clone(),
                scan_result,
                virus_total_result,
                date: now,
                original_scan_date: Some(record.date),
                created_at: now,
                updated_at: now,
            };
            let stored = self.history.insert(rescanned).await?;
            info!(id = ?stored.id, "re-scan recorded");
            Ok(stored)
        }
        .instrument(span)
        .await
    }

    /// The local scan leg. Spawn failure is fatal; anything else degrades to
    /// an absent verdict.
    async fn local_leg(&self, path: &Path) -> Result<Option<LocalScanVerdict>> {
        match self.scanner.scan(path).await {
            Ok(output) => {
                // Combined output: the verdict can land on either stream.
                let mut text = output.stdout;
                if !output.stderr.is_empty() {
                    text.push_str(&output.stderr);
                }
                Ok(Some(scanner::parse(&text)))
            }
            Err(err @ VigilError::ExternalProcessFailure(_)) => Err(err),
            Err(err) => {
                warn!(error = %err, "local scan leg failed, recording without verdict");
                Ok(None)
            }
        }
    }

    /// The reputation leg. Every failure short of a store problem degrades
    /// to an absent verdict; an unknown fingerprint is a normal outcome.
    async fn reputation_leg(&self, sha256: &str) -> Result<Option<ReputationVerdict>> {
        match self.reputation.lookup(sha256, None).await {
            Ok(LookupOutcome::Found(raw)) => match reputation::parse(&raw) {
                Ok(verdict) => Ok(Some(verdict)),
                Err(err) => {
                    warn!(error = %err, "malformed reputation report, recording without verdict");
                    Ok(None)
                }
            },
            Ok(LookupOutcome::NotFound) => {
                info!("fingerprint unknown to reputation provider");
                Ok(None)
            }
            Ok(LookupOutcome::RateLimited) => {
                warn!("reputation lookup rate limited, recording without verdict");
                Ok(None)
            }
            Ok(LookupOutcome::Unauthorized) => {
                warn!("reputation credentials rejected, recording without verdict");
                Ok(None)
            }
            Err(err) => {
                warn!(error = %err, "reputation leg failed, recording without verdict");
                Ok(None)
            }
        }
    }
}

fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
}
