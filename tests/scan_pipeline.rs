//! End-to-end pipeline tests: a fake interactive scanner script, the real
//! content-addressed store, an in-memory history store, and a canned
//! reputation report.

#![cfg(unix)]

use async_trait::async_trait;
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use vigil::config::{OrchestratorConfig, ScannerConfig, StorageConfig};
use vigil::history::{HistoryStore, MemoryHistoryStore};
use vigil::reputation::{LookupOutcome, ReputationClient};
use vigil::scanner::{ScanStatus, SegavScanner};
use vigil::store::ContentStore;
use vigil::{Orchestrator, Result, Submission};

/// Fake scanner: prints a report with an interactive prompt, requires the
/// negative answer on stdin to proceed, and tallies its invocations.
fn write_fake_scanner(dir: &Path) -> PathBuf {
    let path = dir.join("fake-segavcmd.sh");
    let body = r#"#!/bin/sh
echo "Versión del motor: 5.2.1.14"
echo "Licencia: Activa"
echo "Prueba eicar.com Infestado Desea descontaminar (S/N):"
read answer
echo "respuesta: $answer"
echo "Total de archivos revisados: 1"
echo "Infestados: 1"
echo "Sospechoso: 0"
echo "Limpios: 0"
echo scan >> "$(dirname "$0")/calls"
"#;
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn scan_invocations(script: &Path) -> usize {
    std::fs::read_to_string(script.parent().unwrap().join("calls"))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

struct CannedReputation {
    outcome: LookupOutcome,
}

#[async_trait]
impl ReputationClient for CannedReputation {
    async fn lookup(&self, _sha256: &str, _include: Option<&str>) -> Result<LookupOutcome> {
        Ok(self.outcome.clone())
    }
}

fn reputation_report() -> serde_json::Value {
    json!({
        "data": {
            "attributes": {
                "last_analysis_stats": {
                    "harmless": 60, "malicious": 3, "suspicious": 0,
                    "undetected": 9, "timeout": 0
                },
                "last_analysis_results": {
                    "EngineA": { "category": "malicious", "result": "EICAR-Test-File" },
                    "EngineB": { "category": "harmless", "result": null }
                }
            }
        }
    })
}

struct Pipeline {
    orchestrator: Orchestrator<SegavScanner, CannedReputation, MemoryHistoryStore>,
    script: PathBuf,
    store_root: PathBuf,
    _tmp: tempfile::TempDir,
}

fn pipeline(outcome: LookupOutcome) -> Pipeline {
    let tmp = tempfile::tempdir().unwrap();
    let script = write_fake_scanner(tmp.path());
    let store_root = tmp.path().join("store");
    let scanner = SegavScanner::new(ScannerConfig {
        executable: script.clone(),
        reinforce_delay_ms: 200,
        timeout_seconds: 10,
        ..Default::default()
    })
    .unwrap();
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        ContentStore::new(StorageConfig::with_base(&store_root)),
        scanner,
        CannedReputation { outcome },
        MemoryHistoryStore::new(),
    );
    Pipeline {
        orchestrator,
        script,
        store_root,
        _tmp: tmp,
    }
}

fn submission(name: &str, bytes: &[u8]) -> Submission {
    Submission {
        name: name.to_string(),
        bytes: bytes.to_vec(),
        declared_type: None,
        report_number: Some("REP-12345".to_string()),
        comment: Some("integration".to_string()),
    }
}

#[tokio::test]
async fn submit_infected_file_end_to_end() {
    let p = pipeline(LookupOutcome::Found(reputation_report()));

    let record = p
        .orchestrator
        .submit(submission("eicar.txt", b"X5O!P%@AP[4\\PZX54(P^)7CC)7}"))
        .await
        .unwrap();

    // Local verdict parsed out of the scanner's interactive session
    let scan = record.scan_result.as_ref().unwrap();
    assert_eq!(scan.status, ScanStatus::Infected);
    assert_eq!(scan.counts.infected, 1);
    assert_eq!(scan.engine_version.as_deref(), Some("5.2.1.14"));
    assert!(!scan.detections.is_empty());
    assert_eq!(scan.detections[0].threat, "eicar.com");
    // The prompt was answered negatively, never affirmatively
    assert!(scan.raw_text.contains("respuesta: N"));
    assert!(!scan.raw_text.contains("respuesta: S"));

    // Reputation verdict normalized from the canned report
    let vt = record.virus_total_result.as_ref().unwrap();
    assert_eq!(vt.stats.malicious, 3);
    assert_eq!(vt.total_engines, 72);
    assert_eq!(vt.malware_detections.len(), 1);

    // Bytes landed at the sharded content-addressed path
    let hex = &record.hashes.sha256;
    let expected = p
        .store_root
        .join(&hex[0..4])
        .join(&hex[4..8])
        .join(&hex[8..12])
        .join(format!("{}.txt", &hex[..10]));
    assert!(expected.is_file(), "missing {}", expected.display());

    assert_eq!(record.report_number.as_deref(), Some("REP-12345"));
    assert!(record.id.is_some());
}

#[tokio::test]
async fn duplicate_submission_short_circuits() {
    let p = pipeline(LookupOutcome::NotFound);

    let first = p
        .orchestrator
        .submit(submission("a.bin", b"identical payload"))
        .await
        .unwrap();
    let second = p
        .orchestrator
        .submit(submission("a.bin", b"identical payload"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(scan_invocations(&p.script), 1);
    assert_eq!(p.orchestrator.history().list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rescan_appends_to_history() {
    let p = pipeline(LookupOutcome::NotFound);

    let original = p
        .orchestrator
        .submit(submission("sample.bin", b"rescan me"))
        .await
        .unwrap();
    let rescanned = p.orchestrator.rescan(&original).await.unwrap();

    assert_ne!(original.id, rescanned.id);
    assert_eq!(rescanned.hashes, original.hashes);
    assert_eq!(rescanned.original_scan_date, Some(original.date));
    assert_eq!(scan_invocations(&p.script), 2);

    let history = p.orchestrator.history().list_all().await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn unknown_fingerprint_yields_partial_record() {
    let p = pipeline(LookupOutcome::NotFound);

    let record = p
        .orchestrator
        .submit(submission("unknown.bin", b"never seen upstream"))
        .await
        .unwrap();

    assert!(record.scan_result.is_some());
    assert!(record.virus_total_result.is_none());
}
