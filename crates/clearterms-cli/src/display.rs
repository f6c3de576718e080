//! Plain-text cards for reports, collected pages, and detector state.

use chrono::SecondsFormat;
use clearterms_core::{
    Analysis, AttemptOutcome, CollectedPage, DetectionLogEntry, DetectorModel, Signal,
};

const MAX_QUOTE_CHARS: usize = 160;

// ── Public API ──

/// Print a risk report grouped by section.
pub fn print_report_card(analysis: &Analysis) {
    println!(
        "=== Risk {} ({}/100) ===",
        analysis.risk_level, analysis.risk_score
    );
    if !analysis.the_gist.is_empty() {
        println!("{}", analysis.the_gist);
    }
    println!("  {:<26} {:.2}", "confidence", analysis.confidence);
    println!();

    if !analysis.red_flags.is_empty() {
        println!("Red Flags");
        for flag in &analysis.red_flags {
            println!("  [{}] {}", flag.clause_type.as_str(), flag.title);
            print_detail(&flag.why_it_matters);
            print_quotes(&flag.evidence_quotes);
        }
        println!();
    }

    if !analysis.data_rights.is_empty() {
        println!("Data Rights");
        for right in &analysis.data_rights {
            println!("  {}", right.right);
            print_detail(&right.details);
            print_quotes(&right.evidence_quotes);
        }
        println!();
    }

    if !analysis.the_escape.is_empty() {
        println!("The Escape");
        for step in &analysis.the_escape {
            println!("  {}", step.step);
            print_detail(&step.details);
            print_quotes(&step.evidence_quotes);
        }
        println!();
    }

    for disclaimer in &analysis.disclaimers {
        println!("* {disclaimer}");
    }
}

/// Print the classification verdict for a collected page.
pub fn print_collected(page: &CollectedPage) {
    println!("=== {} ===", page.url);
    if !page.title.is_empty() {
        println!("{}", page.title);
    }
    println!();
    println!(
        "  {:<26} {}",
        "policy page",
        if page.is_policy_page { "yes" } else { "no" }
    );
    println!("  {:<26} {:.2}", "score", page.score);
    println!("  {:<26} {}", "signals", signal_list(page.signals.iter()));
    println!("  {:<26} {}", "domain", page.domain);
    println!("  {:<26} {}", "text chars", page.text.chars().count());
    println!("  {:<26} {}", "text hash", page.text_hash);
}

pub fn print_detector(model: &DetectorModel) {
    println!("Detector (version {})", model.version());
    for signal in Signal::ALL {
        println!("  {:<26} {:.2}", signal.as_str(), model.weight(signal));
    }
    println!("  {:<26} {:.2}", "threshold", model.threshold());
    println!("  {:<26} {}", "samples", model.samples());
}

/// One line per entry, newest last.
pub fn print_log(entries: &[DetectionLogEntry]) {
    if entries.is_empty() {
        println!("(detection log is empty)");
        return;
    }
    for entry in entries {
        let outcome = match &entry.outcome {
            AttemptOutcome::Success => "success".to_string(),
            AttemptOutcome::Cached => "cached".to_string(),
            AttemptOutcome::NoText => "no_text".to_string(),
            AttemptOutcome::Failed { kind } => format!("failed:{kind}"),
        };
        println!(
            "{}  {:<24} {:<22} policy={:<3} [{}]{}",
            entry.at.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.domain,
            outcome,
            if entry.is_policy_page { "yes" } else { "no" },
            signal_list(entry.signals.iter()),
            entry
                .model
                .as_deref()
                .map(|m| format!(" via {m}"))
                .unwrap_or_default()
        );
    }
}

// ── Helpers ──

fn print_detail(text: &str) {
    if !text.is_empty() {
        println!("    {text}");
    }
}

fn print_quotes(quotes: &[String]) {
    for quote in quotes {
        println!("    \u{201c}{}\u{201d}", clip(quote, MAX_QUOTE_CHARS));
    }
}

fn clip(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

fn signal_list<'a>(signals: impl Iterator<Item = &'a Signal>) -> String {
    signals.map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}
