//! Weighted-signal classifier for legal-policy pages.
//!
//! Six cheap cues are evaluated against fixed keyword and URL lists. The
//! weights of the cues that fire are summed and compared against the
//! adaptive threshold in [`DetectorModel`]. A small set of deterministic
//! override combinations biases the verdict toward recall: a short page with
//! a bare "Privacy Policy" heading is still a policy page.

use std::collections::BTreeSet;

use clearterms_core::config::ClassifierConfig;
use clearterms_core::{ClassificationResult, DetectorModel, Signal};
use regex::RegexSet;
use tracing::debug;

/// Phrases that name a policy document.
pub const POLICY_KEYWORDS: &[&str] = &[
    "terms and conditions",
    "terms & conditions",
    "terms of service",
    "terms of use",
    "user agreement",
    "service agreement",
    "subscription terms",
    "end user license",
    "eula",
    "privacy policy",
    "privacy notice",
    "data policy",
    "data processing",
    "data protection",
    "cookie policy",
    "acceptable use",
    "dpa",
    "legal terms",
];

/// Vocabulary typical of policy bodies. Hits are counted once per term.
pub const LEGAL_TERMS: &[&str] = &[
    "arbitration",
    "class action",
    "governing law",
    "liability",
    "limitation of liability",
    "disclaimer",
    "indemnify",
    "termination",
    "refund",
    "auto-renew",
    "subscription",
    "opt out",
    "personal data",
    "third party",
    "share",
    "sell",
    "cookies",
    "tracking",
    "processing",
    "data protection",
];

/// Case-insensitive URL patterns for legal/policy paths.
pub const URL_PATTERNS: &[&str] = &[
    r"(?i)terms",
    r"(?i)terms-and-conditions",
    r"(?i)terms-conditions",
    r"(?i)termsandconditions",
    r"(?i)user-agreement",
    r"(?i)service-agreement",
    r"(?i)subscription-terms",
    r"(?i)eula",
    r"(?i)privacy",
    r"(?i)cookie",
    r"(?i)policy",
    r"(?i)legal",
    r"(?i)tos",
    r"(?i)dpa",
];

/// What the classifier sees of a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentView {
    pub url: String,
    pub title: String,
    /// Secondary title such as `og:title`.
    pub secondary_title: Option<String>,
    /// Text of all top-level headings, concatenated.
    pub headings: String,
    /// Best-effort extracted body text.
    pub body_text: String,
}

/// Stateless classifier; the adaptive state is passed in per call.
pub struct PageClassifier {
    config: ClassifierConfig,
    url_patterns: RegexSet,
}

impl PageClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            url_patterns: RegexSet::new(URL_PATTERNS)?,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Evaluate every cue and produce a verdict under `model`.
    pub fn classify(&self, view: &DocumentView, model: &DetectorModel) -> ClassificationResult {
        let title = view.title.to_lowercase();
        let secondary = view
            .secondary_title
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let headings = view.headings.to_lowercase();
        let body = view.body_text.to_lowercase();

        let url_match = self.url_patterns.is_match(&view.url);
        let title_match = contains_keyword(&title) || contains_keyword(&secondary);
        let heading_match = contains_keyword(&headings);
        let body_match = contains_keyword(&body);
        let legal_hits = legal_term_hits(&body);
        let legal_match = legal_hits >= self.config.legal_terms_min_hits;
        let longform = body.chars().count() >= self.config.longform_min_chars;

        let signals: BTreeSet<Signal> = [
            (Signal::UrlPattern, url_match),
            (Signal::TitleKeyword, title_match),
            (Signal::HeadingKeyword, heading_match),
            (Signal::BodyKeyword, body_match),
            (Signal::LegalTerms, legal_match),
            (Signal::LongformText, longform),
        ]
        .into_iter()
        .filter_map(|(signal, fired)| fired.then_some(signal))
        .collect();

        let score = model.score(&signals);

        let overridden = (url_match && (title_match || heading_match))
            || (title_match && heading_match)
            || (legal_hits >= self.config.legal_terms_override_hits && longform);
        let is_policy_page = score >= model.threshold() || overridden;

        debug!(
            url = %view.url,
            score,
            threshold = model.threshold(),
            legal_hits,
            overridden,
            is_policy_page,
            "classified page"
        );

        ClassificationResult {
            is_policy_page,
            signals,
            score,
        }
    }
}

fn contains_keyword(haystack: &str) -> bool {
    !haystack.is_empty() && POLICY_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

/// Number of distinct [`LEGAL_TERMS`] present in lowercased `body`.
pub fn legal_term_hits(body: &str) -> usize {
    LEGAL_TERMS.iter().filter(|term| body.contains(*term)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PageClassifier {
        PageClassifier::new(ClassifierConfig::default()).unwrap()
    }

    fn view(url: &str, title: &str, headings: &str, body: &str) -> DocumentView {
        DocumentView {
            url: url.into(),
            title: title.into(),
            secondary_title: None,
            headings: headings.into(),
            body_text: body.into(),
        }
    }

    #[test]
    fn privacy_url_and_title_override_low_score() {
        // Threshold at its ceiling: the weighted score alone cannot reach it.
        let mut model = DetectorModel::default();
        for _ in 0..40 {
            model.nudge_threshold(0.1);
        }
        let result = classifier().classify(
            &view("https://acme.com/privacy", "Privacy Policy — Acme", "", "Short page."),
            &model,
        );
        assert_eq!(
            result.signals,
            [Signal::UrlPattern, Signal::TitleKeyword].into()
        );
        assert!(result.score < model.threshold());
        assert!(result.is_policy_page);
    }

    #[test]
    fn title_and_heading_override() {
        let result = classifier().classify(
            &view(
                "https://acme.com/about",
                "Terms of Service",
                "Terms of Service",
                "",
            ),
            &DetectorModel::default(),
        );
        assert!(!result.signals.contains(&Signal::UrlPattern));
        assert!(result.is_policy_page);
    }

    #[test]
    fn legal_heavy_longform_override() {
        let body = format!(
            "{} {}",
            "arbitration class action governing law liability indemnify termination refund",
            "lorem ipsum ".repeat(300)
        );
        let result = classifier().classify(
            &view("https://acme.com/page", "Welcome", "", &body),
            &DetectorModel::default(),
        );
        assert!(result.signals.contains(&Signal::LegalTerms));
        assert!(result.signals.contains(&Signal::LongformText));
        assert!(result.is_policy_page);
    }

    #[test]
    fn ordinary_page_is_rejected() {
        let result = classifier().classify(
            &view(
                "https://acme.com/blog/launch",
                "We launched!",
                "Our new product",
                "Today we are excited to announce our new product.",
            ),
            &DetectorModel::default(),
        );
        assert!(result.signals.is_empty());
        assert_eq!(result.score, 0.0);
        assert!(!result.is_policy_page);
    }

    #[test]
    fn weighted_score_alone_can_pass() {
        // body keyword (1) + legal terms (2) + longform (1) + url (2) = 6 >= 5,
        // with only 4 legal terms so the legal/longform override does not apply.
        let body = format!(
            "privacy policy arbitration liability refund cookies {}",
            "text ".repeat(700)
        );
        let result = classifier().classify(
            &view("https://acme.com/legal", "Acme", "", &body),
            &DetectorModel::default(),
        );
        assert_eq!(result.score, 6.0);
        assert!(result.is_policy_page);
    }

    #[test]
    fn secondary_title_counts_as_title() {
        let mut v = view("https://acme.com/x", "Acme", "", "");
        v.secondary_title = Some("Cookie Policy".into());
        let result = classifier().classify(&v, &DetectorModel::default());
        assert!(result.signals.contains(&Signal::TitleKeyword));
    }

    #[test]
    fn legal_terms_counted_once_each() {
        assert_eq!(legal_term_hits("refund refund refund"), 1);
        assert_eq!(legal_term_hits("limitation of liability"), 2);
        assert_eq!(legal_term_hits(""), 0);
    }
}
