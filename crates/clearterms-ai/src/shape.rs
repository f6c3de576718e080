//! Coercing an arbitrary parsed value into a schema-valid [`Analysis`].
//!
//! Every field is read independently and falls back to a schema-valid
//! default when missing or of the wrong type. Evidence-bearing items without
//! a non-empty quote are dropped.

use clearterms_core::config::HardenerConfig;
use clearterms_core::{Analysis, ClauseType, DataRight, EscapeStep, RedFlag, RiskLevel};
use serde_json::Value;

use crate::AnalysisError;

pub const DEFAULT_DISCLAIMERS: [&str; 2] = [
    "Informational only — not legal advice.",
    "Quotes are verbatim from the policy text provided.",
];

const UNCLEAR: &str = "Unclear";

fn text(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn items(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn quotes(item: &Value, max: usize) -> Vec<String> {
    items(item.get("evidence_quotes"))
        .iter()
        .filter_map(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}

fn red_flag(item: &Value, limits: &HardenerConfig) -> Option<RedFlag> {
    if !item.is_object() {
        return None;
    }
    let evidence_quotes = quotes(item, limits.max_evidence_quotes);
    if evidence_quotes.is_empty() {
        return None;
    }
    let clause_type = item
        .get("clause_type")
        .and_then(Value::as_str)
        .and_then(ClauseType::parse)
        .unwrap_or(ClauseType::Other);
    Some(RedFlag {
        clause_type,
        title: text(item.get("title"), UNCLEAR),
        why_it_matters: text(item.get("why_it_matters"), ""),
        evidence_quotes,
    })
}

fn data_right(item: &Value, limits: &HardenerConfig) -> Option<DataRight> {
    if !item.is_object() {
        return None;
    }
    let evidence_quotes = quotes(item, limits.max_evidence_quotes);
    (!evidence_quotes.is_empty()).then(|| DataRight {
        right: text(item.get("right"), UNCLEAR),
        details: text(item.get("details"), ""),
        evidence_quotes,
    })
}

fn escape_step(item: &Value, limits: &HardenerConfig) -> Option<EscapeStep> {
    if !item.is_object() {
        return None;
    }
    let evidence_quotes = quotes(item, limits.max_evidence_quotes);
    (!evidence_quotes.is_empty()).then(|| EscapeStep {
        step: text(item.get("step"), UNCLEAR),
        details: text(item.get("details"), ""),
        evidence_quotes,
    })
}

/// Shape `value` into an [`Analysis`]. Never fails: a non-object input
/// yields an empty report, which the meaningfulness gate then rejects.
///
/// `Risk_Score`/`Risk_Level` are carried over (clamped) from the input;
/// the hardener overwrites them with the deterministic score afterwards.
pub fn shape(value: &Value, limits: &HardenerConfig) -> Analysis {
    let red_flags = items(value.get("Red_Flags"))
        .iter()
        .filter_map(|i| red_flag(i, limits))
        .take(limits.max_red_flags)
        .collect();
    let data_rights = items(value.get("Data_Rights"))
        .iter()
        .filter_map(|i| data_right(i, limits))
        .collect();
    let the_escape = items(value.get("The_Escape"))
        .iter()
        .filter_map(|i| escape_step(i, limits))
        .collect();

    let confidence = value
        .get("Confidence")
        .and_then(Value::as_f64)
        .unwrap_or(limits.default_confidence)
        .clamp(0.0, 1.0);

    let mut disclaimers: Vec<String> = items(value.get("Disclaimers"))
        .iter()
        .filter_map(Value::as_str)
        .filter(|d| !d.trim().is_empty())
        .take(limits.max_disclaimers)
        .map(str::to_string)
        .collect();
    if disclaimers.is_empty() {
        disclaimers = DEFAULT_DISCLAIMERS.iter().map(|d| d.to_string()).collect();
    }

    let risk_score = value
        .get("Risk_Score")
        .and_then(Value::as_f64)
        .map(|s| s.clamp(0.0, 100.0).round() as u32)
        .unwrap_or(0);
    let risk_level = match value.get("Risk_Level").and_then(Value::as_str) {
        Some("Medium") => RiskLevel::Medium,
        Some("High") => RiskLevel::High,
        Some("Extreme") => RiskLevel::Extreme,
        _ => RiskLevel::Low,
    };

    Analysis {
        risk_score,
        risk_level,
        the_gist: truncate_chars(&text(value.get("The_Gist"), ""), limits.max_gist_chars),
        red_flags,
        data_rights,
        the_escape,
        confidence,
        disclaimers,
    }
}

/// Reject a report with no usable gist and no evidence-bearing items.
pub fn ensure_meaningful(
    analysis: &Analysis,
    limits: &HardenerConfig,
) -> Result<(), AnalysisError> {
    let gist_usable = analysis.the_gist.trim().chars().count() >= limits.min_gist_chars;
    if !gist_usable && analysis.has_no_evidence_items() {
        return Err(AnalysisError::EmptyAnalysis);
    }
    Ok(())
}
