//! Prompt text for the analysis and repair calls.

use serde_json::Value;

const ANALYSIS_SYSTEM: &[&str] = &[
    "You are ClearTerms AI, a real-time legal risk translator.",
    "Only use the provided policy text. Do not infer or speculate.",
    "Output MUST be valid JSON that matches the schema exactly.",
    "Process: identify each clause type, extract exact verbatim quotes, then explain why it matters.",
    "Quotes must be exact substrings of the policy text. If you cannot quote it, mark as Unclear and leave evidence_quotes empty.",
    "Red_Flags items must include at least one evidence quote. Do not include a red flag without evidence.",
    "Data_Rights and The_Escape should only include items with evidence quotes; otherwise leave arrays empty.",
    "Include the disclaimers: 'Informational only — not legal advice.' and 'Quotes are verbatim from the policy text provided.'",
    "Keep The_Gist to at most two sentences and avoid legal advice.",
    "Be concise. Prefer fewer, higher-confidence items over exhaustive lists.",
];

const REPAIR_SYSTEM: &[&str] = &[
    "You are a JSON repair agent.",
    "Convert the model output into valid JSON that matches the schema exactly.",
    "Return only JSON. No markdown. No code fences. No commentary.",
    "If required fields are missing, use empty arrays or empty strings, but do not invent facts.",
    "Preserve any verbatim quotes that already exist in the output.",
];

const MIDDLE_MARKER: &str = "\n... [TRUNCATED] ...\n";

/// A system instruction plus the user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Keep the first 70% and last 30% of `max_chars` characters when `text`
/// is too long, joined by a visible marker.
pub fn truncate_input(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let head = max_chars * 7 / 10;
    let tail = max_chars - head;
    let head_text: String = text.chars().take(head).collect();
    let tail_text: String = text.chars().skip(total - tail).collect();
    format!("{head_text}{MIDDLE_MARKER}{tail_text}")
}

fn truncate_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

pub fn build_analysis_prompt(url: &str, title: &str, text: &str, max_chars: usize) -> Prompt {
    Prompt {
        system: ANALYSIS_SYSTEM.join(" "),
        user: [
            format!("URL: {url}"),
            format!("Title: {title}"),
            "Policy Text:".to_string(),
            truncate_input(text, max_chars),
        ]
        .join("\n"),
    }
}

/// Prompt asking the model to coerce `raw` into JSON matching `schema`.
/// `raw` is cut to its first `max_chars` characters.
pub fn build_repair_prompt(schema: &Value, raw: &str, max_chars: usize) -> Prompt {
    let schema_text = schema.to_string();
    Prompt {
        system: REPAIR_SYSTEM.join(" "),
        user: [
            "Schema:",
            schema_text.as_str(),
            "",
            "Model Output:",
            truncate_prefix(raw, max_chars),
        ]
        .join("\n"),
    }
}
