//! The result hardener: raw model text in, scored [`Analysis`] out.
//!
//! Local recovery (fence stripping, object extraction, sanitize-and-retry)
//! runs first. Only when it fails is a [`JsonRepair`] asked to rewrite the
//! raw text. Shape enforcement, the meaningfulness gate and deterministic
//! scoring always run on whatever parsed.

use async_trait::async_trait;
use clearterms_core::Analysis;
use clearterms_core::config::HardenerConfig;
use serde_json::Value;
use tracing::{debug, warn};

use crate::AnalysisError;
use crate::json::parse_json_candidate;
use crate::score::score;
use crate::shape::{ensure_meaningful, shape};

/// A second chance at turning unparseable output into JSON.
#[async_trait]
pub trait JsonRepair: Send + Sync {
    /// Rewrite `raw` so it parses against `schema`. `None` when the repair
    /// itself failed.
    async fn repair(&self, schema: &Value, raw: &str) -> Option<String>;
}

/// Repair that never succeeds; local recovery only.
pub struct NoRepair;

#[async_trait]
impl JsonRepair for NoRepair {
    async fn repair(&self, _schema: &Value, _raw: &str) -> Option<String> {
        None
    }
}

/// Shape, gate and score a parsed value.
fn finish(value: &Value, limits: &HardenerConfig) -> Result<Analysis, AnalysisError> {
    let mut analysis = shape(value, limits);
    ensure_meaningful(&analysis, limits)?;
    let (risk_score, risk_level) = score(&analysis.red_flags);
    analysis.risk_score = risk_score;
    analysis.risk_level = risk_level;
    Ok(analysis)
}

/// Harden without a remote repair step.
pub fn harden_local(raw: &str, limits: &HardenerConfig) -> Result<Analysis, AnalysisError> {
    finish(&parse_json_candidate(raw)?, limits)
}

/// Full pipeline. When both local parsing and the repair fail, the result
/// is always `Parse`; `NoJsonFound` only triggers the repair.
pub async fn harden<R>(
    raw: &str,
    schema: &Value,
    repair: &R,
    limits: &HardenerConfig,
) -> Result<Analysis, AnalysisError>
where
    R: JsonRepair + ?Sized,
{
    let value = match parse_json_candidate(raw) {
        Ok(value) => value,
        Err(local) => {
            debug!(error = %local, "local parse failed, requesting repair");
            let repaired = repair
                .repair(schema, raw)
                .await
                .and_then(|text| parse_json_candidate(&text).ok());
            match repaired {
                Some(value) => value,
                None => {
                    warn!(error = %local, "repair did not produce parseable JSON");
                    return Err(AnalysisError::Parse(local.to_string()));
                }
            }
        }
    };
    finish(&value, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearterms_core::{ClauseType, ErrorKind, RiskLevel};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRepair {
        output: Option<String>,
        calls: AtomicUsize,
    }

    impl FixedRepair {
        fn new(output: Option<&str>) -> Self {
            Self {
                output: output.map(str::to_string),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JsonRepair for FixedRepair {
        async fn repair(&self, _schema: &Value, _raw: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone()
        }
    }

    fn limits() -> HardenerConfig {
        HardenerConfig::default()
    }

    const NO_REFUNDS: &str = "```json\n{\"Risk_Score\": 90, \"Risk_Level\": \"Extreme\", \
        \"The_Gist\": \"All sales are final and nothing is refundable.\", \
        \"Red_Flags\": [{\"clause_type\": \"no_refunds\", \"title\": \"No refunds\", \
        \"why_it_matters\": \"You cannot get money back.\", \
        \"evidence_quotes\": [\"no refunds\"]}], \
        \"Data_Rights\": [], \"The_Escape\": [], \"Confidence\": 0.9, \
        \"Disclaimers\": [\"Informational only — not legal advice.\"]}\n```";

    #[test]
    fn fenced_output_is_scored_deterministically() {
        let analysis = harden_local(NO_REFUNDS, &limits()).unwrap();
        assert_eq!(analysis.risk_score, 8);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert_eq!(analysis.red_flags[0].clause_type, ClauseType::NoRefunds);
    }

    #[test]
    fn trailing_commas_recovered_locally() {
        let raw = r#"{"The_Gist": "Arbitration is mandatory for all disputes.",
            "Red_Flags": [ {"clause_type": "forced_arbitration_class_waiver",
            "title": "Arbitration", "why_it_matters": "No court.",
            "evidence_quotes": ["binding arbitration"]}, ],}"#;
        let analysis = harden_local(raw, &limits()).unwrap();
        assert_eq!(analysis.risk_score, 20);
    }

    #[test]
    fn two_clause_types_score_medium() {
        let raw = json!({
            "The_Gist": "Disputes go to arbitration and data is sold.",
            "Red_Flags": [
                {"clause_type": "forced_arbitration_class_waiver", "title": "a",
                 "why_it_matters": "", "evidence_quotes": ["binding arbitration"]},
                {"clause_type": "data_sale_or_ad_sharing", "title": "b",
                 "why_it_matters": "", "evidence_quotes": ["we may sell"]}
            ]
        })
        .to_string();
        let analysis = harden_local(&raw, &limits()).unwrap();
        assert_eq!(analysis.risk_score, 35);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn hardening_is_idempotent() {
        let first = serde_json::to_string(&harden_local(NO_REFUNDS, &limits()).unwrap()).unwrap();
        let second = serde_json::to_string(&harden_local(NO_REFUNDS, &limits()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn content_free_report_is_rejected() {
        let raw = r#"{"The_Gist": "n/a", "Red_Flags": [{"clause_type": "other", "evidence_quotes": []}]}"#;
        assert!(matches!(
            harden_local(raw, &limits()),
            Err(AnalysisError::EmptyAnalysis)
        ));
    }

    #[tokio::test]
    async fn repair_skipped_when_local_parse_succeeds() {
        let repair = FixedRepair::new(None);
        let schema = json!({});
        harden(NO_REFUNDS, &schema, &repair, &limits()).await.unwrap();
        assert_eq!(repair.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repair_rescues_unparseable_output() {
        let repair = FixedRepair::new(Some(
            r#"{"The_Gist": "Your subscription renews automatically every year.",
               "Red_Flags": [{"clause_type": "auto_renewal_or_difficult_cancellation",
               "title": "Auto-renewal", "why_it_matters": "", "evidence_quotes": ["renews automatically"]}]}"#,
        ));
        let schema = json!({});
        let analysis = harden("{\"The_Gist\": unquoted nonsense}", &schema, &repair, &limits())
            .await
            .unwrap();
        assert_eq!(repair.calls.load(Ordering::SeqCst), 1);
        assert_eq!(analysis.risk_score, 10);
    }

    #[tokio::test]
    async fn failed_repair_is_parse_error() {
        let schema = json!({});
        let no_json = harden("Sorry, I cannot help.", &schema, &NoRepair, &limits()).await;
        assert!(matches!(no_json, Err(AnalysisError::Parse(_))));
        assert_eq!(no_json.unwrap_err().kind(), ErrorKind::ParseError);

        let garbage = FixedRepair::new(Some("still not json"));
        let parse = harden("{\"a\": nope}", &schema, &garbage, &limits()).await;
        assert!(matches!(parse, Err(AnalysisError::Parse(_))));
    }
}
