//! Parser for the local scanner's free-form diagnostic text.
//!
//! The scanner prints a Spanish-language report whose format is not
//! contractually guaranteed, so every field is matched by an independent
//! pattern: a missing or reordered line never blocks extraction of the
//! others, and absence yields a zero/None default instead of an error.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Engine name attached to every local detection entry.
pub const LOCAL_ENGINE_NAME: &str = "Segurmatica Antivirus";

static ENGINE_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Versi[oóí]n del motor:\s*([0-9.]+)").unwrap());
static LICENSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Licencia:\s*([^\r\n]+)").unwrap());
static REALTIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Protecci[oó]n en tiempo real:\s*([^\r\n]+)").unwrap());
static TOTAL_FILES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Total de archivos revisados:\s*(-?\d+)").unwrap());
static INFECTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Infestados:\s*(-?\d+)").unwrap());
static SUSPICIOUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Sospechosos?:\s*(-?\d+)").unwrap());
static CLEAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Limpios:\s*(-?\d+)").unwrap());
static DISINFECTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Descontaminados:\s*(-?\d+)").unwrap());
static QUARANTINED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:En )?Cuarentena:\s*(-?\d+)").unwrap());
static DETECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Segurm[aá]tica\s+Antivirus\s+([^\r\n]+)").unwrap());
static DETECTION_FALLBACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Prueba\s+([^\n]+?)\s+Infestado\s+Desea descontaminar").unwrap());

/// Overall status of a local scan, derived from the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Clean,
    Suspicious,
    Infected,
    Unknown,
}

/// Labeled counters extracted from the report.
///
/// Signed on purpose: a corrupted report can carry a negative number, and
/// that inconsistency must surface as `Unknown` rather than wrap around.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCounts {
    pub infected: i64,
    pub suspicious: i64,
    pub clean: i64,
    pub disinfected: i64,
    pub quarantined: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<i64>,
}

/// One engine/threat pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub engine: String,
    pub threat: String,
}

/// Structured result of a local scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalScanVerdict {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_protection: Option<String>,
    pub scanned_at: DateTime<Utc>,
    pub counts: ScanCounts,
    pub detections: Vec<Detection>,
    pub status: ScanStatus,
    /// Original diagnostic text, retained for audit.
    pub raw_text: String,
}

/// Derive the overall status. Priority order, first match wins.
pub fn derive_status(counts: &ScanCounts) -> ScanStatus {
    if counts.infected > 0 {
        ScanStatus::Infected
    } else if counts.suspicious > 0 {
        ScanStatus::Suspicious
    } else if counts.infected == 0 && counts.suspicious == 0 {
        ScanStatus::Clean
    } else {
        ScanStatus::Unknown
    }
}

fn capture_str(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn capture_count(re: &Regex, text: &str) -> i64 {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Parse diagnostic text into a structured verdict. Never fails.
pub fn parse(raw_text: &str) -> LocalScanVerdict {
    let counts = ScanCounts {
        infected: capture_count(&INFECTED_RE, raw_text),
        suspicious: capture_count(&SUSPICIOUS_RE, raw_text),
        clean: capture_count(&CLEAN_RE, raw_text),
        disinfected: capture_count(&DISINFECTED_RE, raw_text),
        quarantined: capture_count(&QUARANTINED_RE, raw_text),
        total_files: TOTAL_FILES_RE
            .captures(raw_text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok()),
    };

    let mut detections: Vec<Detection> = DETECTION_RE
        .captures_iter(raw_text)
        .filter_map(|c| c.get(1))
        .map(|m| Detection {
            engine: LOCAL_ENGINE_NAME.to_string(),
            threat: m.as_str().trim().to_string(),
        })
        .collect();

    // The detections list must be non-empty whenever the infected counter is
    // positive; downstream display depends on it.
    if detections.is_empty() && counts.infected > 0 {
        let threat = capture_str(&DETECTION_FALLBACK_RE, raw_text)
            .unwrap_or_else(|| "Amenaza detectada".to_string());
        warn!(threat = %threat, "infected count > 0 without an explicit detection line");
        detections.push(Detection {
            engine: LOCAL_ENGINE_NAME.to_string(),
            threat,
        });
    }

    let status = derive_status(&counts);

    LocalScanVerdict {
        engine_version: capture_str(&ENGINE_VERSION_RE, raw_text),
        license: capture_str(&LICENSE_RE, raw_text),
        realtime_protection: capture_str(&REALTIME_RE, raw_text),
        scanned_at: Utc::now(),
        counts,
        detections,
        status,
        raw_text: raw_text.to_string(),
    }
}
