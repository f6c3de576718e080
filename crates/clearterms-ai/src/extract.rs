//! Policy text extraction from HTML.
//!
//! The page is parsed into a private document tree, so the source is never
//! touched. Structural noise (navigation, footers, forms, scripts, ads,
//! cookie banners) is skipped while collecting text. Extraction falls back
//! in three stages:
//!
//! 1. the largest `main`/`article`/`[role=main]`/`section` container;
//! 2. all paragraph and list-item text, if stage 1 is too short;
//! 3. the whole cleaned body, if stage 2 is still too short.
//!
//! Whitespace is collapsed and overlong text is cut with an explicit marker.

use clearterms_core::config::ExtractionConfig;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::classifier::DocumentView;

const NOISE_SELECTORS: &str = "nav, footer, header, aside, form, button, input, select, textarea, \
     [role='navigation'], [aria-label*='cookie' i], \
     .cookie, .cookies, #cookie, #cookies, .banner, .advert, .ad, script, style, noscript, template";
const CANDIDATE_SELECTORS: &str = "main, article, [role='main'], section";
const BLOCK_SELECTORS: &str = "p, li";
const HEADING_SELECTORS: &str = "h1, h2";

#[derive(Debug, Error)]
#[error("invalid selector {selector:?}: {message}")]
pub struct SelectorError {
    selector: &'static str,
    message: String,
}

fn selector(css: &'static str) -> Result<Selector, SelectorError> {
    Selector::parse(css).map_err(|e| SelectorError {
        selector: css,
        message: e.to_string(),
    })
}

/// Text and metadata pulled from one HTML snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// Raw document title, as shown to the user.
    pub title: String,
    /// Classifier input; `body_text` is the extracted policy text.
    pub view: DocumentView,
}

impl ParsedPage {
    pub fn text(&self) -> &str {
        &self.view.body_text
    }
}

pub struct TextExtractor {
    config: ExtractionConfig,
    noise: Selector,
    candidates: Selector,
    blocks: Selector,
    headings: Selector,
    body: Selector,
    title: Selector,
    og_title: Selector,
}

impl TextExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            config,
            noise: selector(NOISE_SELECTORS)?,
            candidates: selector(CANDIDATE_SELECTORS)?,
            blocks: selector(BLOCK_SELECTORS)?,
            headings: selector(HEADING_SELECTORS)?,
            body: selector("body")?,
            title: selector("title")?,
            og_title: selector("meta[property='og:title']")?,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Parse a snapshot into classifier input plus extracted text.
    pub fn parse(&self, url: &str, html: &str) -> ParsedPage {
        let doc = Html::parse_document(html);

        let title = doc
            .select(&self.title)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();

        let secondary_title = doc
            .select(&self.og_title)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .filter(|t| !t.is_empty());

        let headings = doc
            .select(&self.headings)
            .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let body_text = self.extract_from(&doc);

        ParsedPage {
            title: title.clone(),
            view: DocumentView {
                url: url.to_string(),
                title,
                secondary_title,
                headings,
                body_text,
            },
        }
    }

    /// Extracted policy text only.
    pub fn extract(&self, html: &str) -> String {
        self.extract_from(&Html::parse_document(html))
    }

    fn extract_from(&self, doc: &Html) -> String {
        let root = doc
            .select(&self.body)
            .next()
            .unwrap_or_else(|| doc.root_element());
        let min = self.config.min_candidate_chars;

        let mut text = doc
            .select(&self.candidates)
            .filter(|el| !self.is_noise(el))
            .map(|el| self.clean_text(el))
            .fold(None::<String>, |best, t| match best {
                Some(b) if b.chars().count() >= t.chars().count() => Some(b),
                _ => Some(t),
            })
            .unwrap_or_else(|| self.clean_text(root));

        if text.chars().count() < min {
            text = collapse_whitespace(
                &doc.select(&self.blocks)
                    .filter(|el| !self.is_noise(el))
                    .map(|el| self.clean_text(el))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }

        if text.chars().count() < min {
            let whole = self.clean_text(root);
            if !whole.is_empty() {
                text = whole;
            }
        }

        self.truncate(text)
    }

    fn truncate(&self, text: String) -> String {
        let max = self.config.max_text_chars;
        match text.char_indices().nth(max) {
            Some((cut, _)) => {
                let mut out = text[..cut].to_string();
                out.push_str(&self.config.truncation_marker);
                out
            }
            None => text,
        }
    }

    /// True when the element or any ancestor is structural noise.
    fn is_noise(&self, el: &ElementRef<'_>) -> bool {
        self.noise.matches(el)
            || el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| self.noise.matches(&a))
    }

    /// Visible text under `el` with noise subtrees skipped.
    fn clean_text(&self, el: ElementRef<'_>) -> String {
        let mut out = String::new();
        self.collect_text(el, &mut out);
        collapse_whitespace(&out)
    }

    fn collect_text(&self, el: ElementRef<'_>, out: &mut String) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(text);
                out.push(' ');
            } else if let Some(child_el) = ElementRef::wrap(child)
                && !self.noise.matches(&child_el)
            {
                self.collect_text(child_el, out);
            }
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
