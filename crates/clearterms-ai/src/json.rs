//! Pulling a JSON object out of free-form model text.

use serde_json::Value;
use tracing::debug;

use crate::AnalysisError;

/// Remove markdown code-fence markers (```` ``` ```` with an optional
/// language tag and the whitespace that follows it).
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 3..];
        let after = after.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        rest = after.trim_start();
    }
    out.push_str(rest);
    out
}

/// The first complete top-level `{...}` span in `text`.
///
/// If the whole trimmed text is already delimited by braces it is returned
/// as is. Otherwise braces are matched by depth, ignoring braces inside
/// string literals once an object has opened.
pub fn find_json_object(text: &str) -> Option<&str> {
    let cleaned = text.trim();
    if cleaned.starts_with('{') && cleaned.ends_with('}') {
        return Some(cleaned);
    }

    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in cleaned.char_indices() {
        if depth > 0 && in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(s) = start
                {
                    return Some(&cleaned[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Local repairs for near-JSON: NUL bytes dropped, curly quotes
/// straightened, trailing commas before `}`/`]` removed.
pub fn sanitize_candidate(candidate: &str) -> String {
    let normalized: String = candidate
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();

    let mut out = String::with_capacity(normalized.len());
    let mut chars = normalized.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            let mut gap = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    gap.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            match chars.peek() {
                Some('}') | Some(']') => {}
                _ => {
                    out.push(',');
                    out.push_str(&gap);
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Fence stripping, object extraction, a direct parse, then one
/// sanitize-and-retry parse.
pub fn parse_json_candidate(raw: &str) -> Result<Value, AnalysisError> {
    let stripped = strip_code_fences(raw);
    let candidate = find_json_object(&stripped).ok_or(AnalysisError::NoJsonFound)?;

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Ok(value),
        Err(first) => {
            debug!(error = %first, "direct parse failed, retrying sanitized candidate");
            serde_json::from_str::<Value>(&sanitize_candidate(candidate))
                .map_err(|e| AnalysisError::Parse(e.to_string()))
        }
    }
}
