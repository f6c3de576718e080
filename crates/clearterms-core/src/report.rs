//! Persisted report and detection-log records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;
use crate::detector::Signal;
use crate::wire::ErrorKind;

/// Bumped whenever the [`Analysis`] contract changes; older cached reports
/// are discarded on read.
pub const SCHEMA_VERSION: u32 = 1;

/// Provenance of a cached report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub url: String,
    pub title: String,
    pub analyzed_at: DateTime<Utc>,
    pub content_hash: String,
    #[serde(default)]
    pub schema_version: u32,
}

/// A report stored under `analysis:<domain>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedReport {
    pub analysis: Analysis,
    pub meta: ReportMeta,
}

impl CachedReport {
    /// A cached report is only usable for the exact content it was built
    /// from, under the current schema version.
    pub fn is_valid_for(&self, content_hash: &str) -> bool {
        self.meta.content_hash == content_hash && self.meta.schema_version == SCHEMA_VERSION
    }
}

/// How one classification + analysis attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Cached,
    NoText,
    Failed { kind: ErrorKind },
}

/// One entry of the bounded detection log, kept for post-hoc inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionLogEntry {
    pub at: DateTime<Utc>,
    pub url: String,
    pub domain: String,
    pub is_policy_page: bool,
    pub signals: BTreeSet<Signal>,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RiskLevel;

    fn report(hash: &str, version: u32) -> CachedReport {
        CachedReport {
            analysis: Analysis {
                risk_score: 0,
                risk_level: RiskLevel::Low,
                the_gist: "A short but usable summary of the policy.".into(),
                red_flags: vec![],
                data_rights: vec![],
                the_escape: vec![],
                confidence: 0.5,
                disclaimers: vec!["Informational only — not legal advice.".into()],
            },
            meta: ReportMeta {
                url: "https://acme.com/terms".into(),
                title: "Terms".into(),
                analyzed_at: Utc::now(),
                content_hash: hash.into(),
                schema_version: version,
            },
        }
    }

    #[test]
    fn validity_requires_hash_and_version() {
        assert!(report("abc", SCHEMA_VERSION).is_valid_for("abc"));
        assert!(!report("abc", SCHEMA_VERSION).is_valid_for("def"));
        assert!(!report("abc", SCHEMA_VERSION + 1).is_valid_for("abc"));
    }

    #[test]
    fn legacy_meta_without_version_is_stale() {
        let mut value = serde_json::to_value(report("abc", SCHEMA_VERSION)).unwrap();
        value["meta"]
            .as_object_mut()
            .unwrap()
            .remove("schemaVersion");
        let parsed: CachedReport = serde_json::from_value(value).unwrap();
        assert!(!parsed.is_valid_for("abc"));
    }

    #[test]
    fn log_entry_flattens_outcome() {
        let entry = DetectionLogEntry {
            at: Utc::now(),
            url: "https://acme.com/privacy".into(),
            domain: "acme.com".into(),
            is_policy_page: true,
            signals: [Signal::UrlPattern].into(),
            outcome: AttemptOutcome::Failed {
                kind: ErrorKind::ParseError,
            },
            model: Some("gemini-2.5-flash".into()),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["kind"], "PARSE_ERROR");
        assert_eq!(value["isPolicyPage"], true);
        let back: DetectionLogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
