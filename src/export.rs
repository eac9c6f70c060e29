//! Canonical export document
//!
//! The export is a strict three-key projection of the analysis payload. Graph
//! presentation state never reaches it.

use crate::{AnalysisResult, AnalysisSummary, ForensicsError, FraudRing, SuspiciousAccount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportDocument {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: AnalysisSummary,
}

impl ExportDocument {
    /// Pretty JSON with 2-space indentation
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub fn serialize(result: &AnalysisResult) -> ExportDocument {
    ExportDocument {
        suspicious_accounts: result.suspicious_accounts.clone(),
        fraud_rings: result.fraud_rings.clone(),
        summary: result.summary.clone(),
    }
}

/// `forensics_analysis_<unix-millis>.json`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("forensics_analysis_{}.json", at.timestamp_millis())
}

/// Write the document into `dir`, returning the created path
pub fn write_to_dir(
    document: &ExportDocument,
    dir: impl AsRef<Path>,
    at: DateTime<Utc>,
) -> Result<PathBuf, ForensicsError> {
    let json = document
        .to_pretty_json()
        .map_err(|e| ForensicsError::Export(e.to_string()))?;
    let path = dir.as_ref().join(export_file_name(at));
    std::fs::write(&path, json)?;

    info!(
        path = %path.display(),
        rings = document.fraud_rings.len(),
        accounts = document.suspicious_accounts.len(),
        "Analysis exported"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use chrono::TimeZone;

    #[test]
    fn test_exactly_three_keys() {
        for result in [two_node_result(), cycle_result()] {
            let value = serde_json::to_value(serialize(&result)).unwrap();
            let mut keys: Vec<&String> = value.as_object().unwrap().keys().collect();
            keys.sort();
            assert_eq!(keys, vec!["fraud_rings", "summary", "suspicious_accounts"]);
        }
    }

    #[test]
    fn test_no_derived_fields() {
        let json = serialize(&cycle_result()).to_pretty_json().unwrap();
        assert!(!json.contains("in_same_ring"));
        assert!(!json.contains("inSameRing"));
        assert!(!json.contains("#3b82f6"));
        assert!(!json.contains("\"nodes\""));
        assert!(!json.contains("\"edges\""));
    }

    #[test]
    fn test_field_names_preserved() {
        let value = serde_json::to_value(serialize(&cycle_result())).unwrap();
        assert_eq!(value["suspicious_accounts"][0]["account_id"], "X");
        assert_eq!(value["suspicious_accounts"][0]["ring_id"], "R1");
        assert_eq!(value["fraud_rings"][0]["pattern_type"], "cycle");
        assert_eq!(value["fraud_rings"][0]["member_accounts"][2], "Z");
        assert_eq!(value["summary"]["total_accounts_analyzed"], 4);
        assert_eq!(value["summary"]["processing_time_seconds"], 0.5);
        assert!(value["summary"].get("suspicious_accounts_flagged").is_none());
    }

    #[test]
    fn test_two_space_indentation() {
        let json = serialize(&two_node_result()).to_pretty_json().unwrap();
        assert!(json.starts_with("{\n  \"suspicious_accounts\""));
        assert!(json.contains("\n  \"summary\": {\n    \"total_accounts_analyzed\": 2"));
        assert!(json.contains("\n      \"ring_id\": \"R1\""));
    }

    #[test]
    fn test_file_name_and_write() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            export_file_name(at),
            "forensics_analysis_1700000000123.json"
        );

        let dir = tempfile::tempdir().unwrap();
        let document = serialize(&cycle_result());
        let path = write_to_dir(&document, dir.path(), at).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: ExportDocument = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, document);
    }
}
