//! Parser for the reputation provider's file-report JSON.
//!
//! Normalizes the provider's nested shape (attributes, per-engine results,
//! aggregate stats) into the same verdict family as the local scanner.
//! Unlike the local parser this one can fail: a report without the expected
//! `data.attributes` nesting is malformed, not merely degraded.

use crate::error::{Result, VigilError};
use crate::scanner::Detection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// URL template used when the provider omits a permalink.
pub const PERMALINK_TEMPLATE: &str = "https://www.virustotal.com/gui/file/";

/// Aggregate per-category engine counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationStats {
    pub harmless: i64,
    pub malicious: i64,
    pub suspicious: i64,
    pub undetected: i64,
    pub timeout: i64,
}

/// Display severity derived from the stats; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReputationSeverity {
    Malicious,
    Suspicious,
    Clean,
}

/// Structured result of a reputation lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationVerdict {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_date: Option<DateTime<Utc>>,
    pub stats: ReputationStats,
    pub total_engines: i64,
    /// Engines that flagged the file malicious with a named threat.
    pub malware_detections: Vec<Detection>,
    pub permalink: String,
}

impl ReputationVerdict {
    /// Same three-tier priority as the local status, applied independently;
    /// the two verdicts are never merged into one status.
    pub fn severity(&self) -> ReputationSeverity {
        if self.stats.malicious > 0 {
            ReputationSeverity::Malicious
        } else if self.stats.suspicious > 0 {
            ReputationSeverity::Suspicious
        } else {
            ReputationSeverity::Clean
        }
    }
}

fn stat(stats: &Value, key: &str) -> i64 {
    stats.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// Parse a raw provider report into a verdict.
pub fn parse(raw: &Value) -> Result<ReputationVerdict> {
    let data = raw
        .get("data")
        .ok_or_else(|| VigilError::MalformedReport("missing data".to_string()))?;
    let attr = data
        .get("attributes")
        .ok_or_else(|| VigilError::MalformedReport("missing data.attributes".to_string()))?;

    let stats_map = attr
        .get("last_analysis_stats")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    let stats = ReputationStats {
        harmless: stat(&stats_map, "harmless"),
        malicious: stat(&stats_map, "malicious"),
        suspicious: stat(&stats_map, "suspicious"),
        undetected: stat(&stats_map, "undetected"),
        timeout: stat(&stats_map, "timeout"),
    };
    // Total is the sum over the whole map, including categories we do not
    // break out individually.
    let total_engines = stats_map
        .as_object()
        .map(|m| m.values().filter_map(Value::as_i64).sum())
        .unwrap_or(0);

    let file_name = attr
        .get("meaningful_name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            attr.get("names")
                .and_then(Value::as_array)
                .and_then(|a| a.first())
                .and_then(Value::as_str)
                .map(str::to_string)
        });

    let sha256 = attr
        .get("sha256")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| data.get("id").and_then(Value::as_str).map(str::to_string));

    let scan_date = attr
        .get("last_analysis_date")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    let mut malware_detections = Vec::new();
    if let Some(engines) = attr.get("last_analysis_results").and_then(Value::as_object) {
        for (engine, result) in engines {
            let category = result.get("category").and_then(Value::as_str);
            let threat = result.get("result").and_then(Value::as_str);
            if category == Some("malicious") {
                if let Some(threat) = threat.filter(|t| !t.is_empty()) {
                    malware_detections.push(Detection {
                        engine: engine.clone(),
                        threat: threat.to_string(),
                    });
                }
            }
        }
    }

    let permalink = attr
        .get("permalink")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "{}{}",
                PERMALINK_TEMPLATE,
                sha256.as_deref().unwrap_or_default()
            )
        });

    Ok(ReputationVerdict {
        file_name,
        sha256,
        scan_date,
        stats,
        total_engines,
        malware_detections,
        permalink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> Value {
        json!({
            "data": {
                "id": "aabbccddeeff00112233445566778899aabbccddeeff00112233445566778899",
                "attributes": {
                    "meaningful_name": "eicar.com",
                    "last_analysis_date": 1700000000,
                    "last_analysis_stats": {
                        "harmless": 60,
                        "malicious": 1,
                        "suspicious": 0,
                        "undetected": 9,
                        "timeout": 0
                    },
                    "last_analysis_results": {
                        "EngineA": { "category": "malicious", "result": "EICAR-Test-File" },
                        "EngineB": { "category": "undetected", "result": null },
                        "EngineC": { "category": "malicious", "result": "" }
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_stats_and_total() {
        let v = parse(&sample_report()).unwrap();
        assert_eq!(v.stats.malicious, 1);
        assert_eq!(v.stats.harmless, 60);
        assert_eq!(v.total_engines, 70);
    }

    #[test]
    fn test_detections_only_malicious_with_named_threat() {
        let v = parse(&sample_report()).unwrap();
        assert_eq!(v.malware_detections.len(), 1);
        assert_eq!(v.malware_detections[0].engine, "EngineA");
        assert_eq!(v.malware_detections[0].threat, "EICAR-Test-File");
    }

    #[test]
    fn test_permalink_synthesized_from_digest() {
        let v = parse(&sample_report()).unwrap();
        assert!(v.permalink.starts_with(PERMALINK_TEMPLATE));
        assert!(v.permalink.ends_with(v.sha256.as_deref().unwrap()));
    }

    #[test]
    fn test_provider_permalink_wins() {
        let mut report = sample_report();
        report["data"]["attributes"]["permalink"] = json!("https://example.com/r/1");
        let v = parse(&report).unwrap();
        assert_eq!(v.permalink, "https://example.com/r/1");
    }

    #[test]
    fn test_missing_attributes_is_malformed() {
        assert!(matches!(
            parse(&json!({ "data": {} })),
            Err(VigilError::MalformedReport(_))
        ));
        assert!(matches!(
            parse(&json!({})),
            Err(VigilError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_missing_stats_default_to_zero() {
        let report = json!({ "data": { "attributes": {} } });
        let v = parse(&report).unwrap();
        assert_eq!(v.stats, ReputationStats::default());
        assert_eq!(v.total_engines, 0);
        assert_eq!(v.severity(), ReputationSeverity::Clean);
    }

    #[test]
    fn test_severity_priority() {
        let mut v = parse(&sample_report()).unwrap();
        assert_eq!(v.severity(), ReputationSeverity::Malicious);
        v.stats.malicious = 0;
        v.stats.suspicious = 2;
        assert_eq!(v.severity(), ReputationSeverity::Suspicious);
        v.stats.suspicious = 0;
        assert_eq!(v.severity(), ReputationSeverity::Clean);
    }

    #[test]
    fn test_scan_date_from_unix_seconds() {
        let v = parse(&sample_report()).unwrap();
        assert_eq!(v.scan_date.unwrap().timestamp(), 1700000000);
    }
}
