//! Page collection, analysis with model fallback, caching and feedback.
//!
//! Storage is best-effort throughout `analyze`: a failed cache read is a
//! miss, and failed cache, log or detector writes are logged without
//! changing the response.

use std::collections::BTreeSet;

use chrono::Utc;
use clearterms_ai::prompt::build_analysis_prompt;
use clearterms_ai::{
    AnalysisError, CompletionClient, FeedbackOutcome, GenerateRequest, ModelRepair,
    PageClassifier, TextExtractor, harden, update_model,
};
use clearterms_core::schema::policy;
use clearterms_core::{
    Analysis, AnalyzeRequest, AnalyzeResponse, AttemptOutcome, CachedReport, CachedResponse,
    CollectedPage, DetectionLogEntry, ReportMeta, SCHEMA_VERSION, Settings, Signal, content_hash,
    domain_of,
};
use clearterms_store::{DetectionLog, DetectorRepository, KvStore, ReportCache, get_as};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{EngineError, PageSource};

/// Store key holding an API key saved by a settings UI.
pub const API_KEY_STORE_KEY: &str = "gemini_api_key";

pub struct Analyzer<S, C> {
    store: S,
    client: C,
    settings: Settings,
    classifier: PageClassifier,
    extractor: TextExtractor,
    /// Serializes detector read-modify-write cycles.
    detector_lock: Mutex<()>,
}

impl<S: KvStore, C: CompletionClient> Analyzer<S, C> {
    pub fn new(store: S, client: C, settings: Settings) -> Result<Self, EngineError> {
        let classifier = PageClassifier::new(settings.classifier.clone())
            .map_err(|e| EngineError::Setup(e.to_string()))?;
        let extractor = TextExtractor::new(settings.extraction.clone())
            .map_err(|e| EngineError::Setup(e.to_string()))?;
        Ok(Self {
            store,
            client,
            settings,
            classifier,
            extractor,
            detector_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── classify_and_extract ──

    /// Capture the page, re-capturing after each configured delay while the
    /// extracted text stays short, then classify it under the stored
    /// detector model.
    pub async fn classify_and_extract<P>(&self, source: &P) -> Result<CollectedPage, EngineError>
    where
        P: PageSource + ?Sized,
    {
        let min = self.settings.extraction.min_candidate_chars;
        let mut snapshot = source.capture().await?;
        let mut page = self.extractor.parse(&snapshot.url, &snapshot.html);

        for delay in self.settings.extraction.retry_delays() {
            if page.text().chars().count() >= min {
                break;
            }
            debug!(
                url = %snapshot.url,
                chars = page.text().chars().count(),
                delay_ms = delay.as_millis() as u64,
                "extracted text short, re-capturing"
            );
            tokio::time::sleep(delay).await;
            snapshot = source.capture().await?;
            page = self.extractor.parse(&snapshot.url, &snapshot.html);
        }

        let model = DetectorRepository::new(&self.store).load().await;
        let verdict = self.classifier.classify(&page.view, &model);
        let text = page.text().to_string();

        info!(
            url = %snapshot.url,
            is_policy_page = verdict.is_policy_page,
            score = verdict.score,
            chars = text.chars().count(),
            "page collected"
        );

        Ok(CollectedPage {
            domain: domain_of(&snapshot.url),
            text_hash: content_hash(&text),
            url: snapshot.url,
            title: page.title,
            is_policy_page: verdict.is_policy_page,
            signals: verdict.signals,
            score: verdict.score,
            text,
        })
    }

    // ── analyze ──

    /// Produce a report for `req`, or a typed error. Never a partial report.
    pub async fn analyze(&self, req: &AnalyzeRequest) -> AnalyzeResponse {
        let domain = domain_of(&req.url);
        let text_hash = req
            .text_hash
            .clone()
            .unwrap_or_else(|| content_hash(&req.text));

        let chars = req.text.trim().chars().count();
        if chars < self.settings.analyzer.min_text_chars {
            info!(domain = %domain, chars, "text too short to analyze");
            self.feedback(&req.signals, req.is_policy_page, FeedbackOutcome::NoText)
                .await;
            self.record(req, &domain, AttemptOutcome::NoText, None).await;
            return error_response(&AnalysisError::NoText { chars });
        }

        match ReportCache::new(&self.store).get(&domain, &text_hash).await {
            Ok(Some(report)) => {
                info!(domain = %domain, "serving cached report");
                self.record(req, &domain, AttemptOutcome::Cached, None).await;
                return AnalyzeResponse::Report {
                    analysis: report.analysis,
                };
            }
            Ok(None) => {}
            Err(e) => warn!(domain = %domain, error = %e, "cache read failed, treating as miss"),
        }

        let Some(api_key) = self.api_key().await else {
            let err = AnalysisError::NoApiKey;
            self.record(req, &domain, AttemptOutcome::Failed { kind: err.kind() }, None)
                .await;
            return error_response(&err);
        };

        match self.run_models(&api_key, req).await {
            Ok((analysis, model)) => {
                let report = CachedReport {
                    analysis,
                    meta: ReportMeta {
                        url: req.url.clone(),
                        title: req.title.clone(),
                        analyzed_at: Utc::now(),
                        content_hash: text_hash,
                        schema_version: SCHEMA_VERSION,
                    },
                };
                if let Err(e) = ReportCache::new(&self.store).put(&domain, &report).await {
                    warn!(domain = %domain, error = %e, "failed to cache report");
                }
                self.feedback(&req.signals, req.is_policy_page, FeedbackOutcome::Success)
                    .await;
                self.record(req, &domain, AttemptOutcome::Success, Some(model))
                    .await;
                info!(
                    domain = %domain,
                    risk_score = report.analysis.risk_score,
                    risk_level = %report.analysis.risk_level,
                    "analysis complete"
                );
                AnalyzeResponse::Report {
                    analysis: report.analysis,
                }
            }
            Err((err, model)) => {
                warn!(domain = %domain, error = %err, "analysis failed");
                self.record(req, &domain, AttemptOutcome::Failed { kind: err.kind() }, model)
                    .await;
                error_response(&err)
            }
        }
    }

    /// Configured key first, then one saved in the store.
    async fn api_key(&self) -> Option<String> {
        if let Some(key) = self
            .settings
            .analyzer
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        {
            return Some(key.to_string());
        }
        match get_as::<String, _>(&self.store, API_KEY_STORE_KEY).await {
            Ok(key) => key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "stored API key unreadable");
                None
            }
        }
    }

    /// Try each configured model in order; first meaningful report wins.
    /// On failure, the last error and the model that produced it.
    async fn run_models(
        &self,
        api_key: &str,
        req: &AnalyzeRequest,
    ) -> Result<(Analysis, String), (AnalysisError, Option<String>)> {
        let cfg = &self.settings.analyzer;
        let schema = policy::analysis_schema(&self.settings.hardener);
        let prompt = build_analysis_prompt(&req.url, &req.title, &req.text, cfg.max_input_chars);
        let request = GenerateRequest {
            system_prompt: prompt.system,
            user_prompt: prompt.user,
            response_schema: schema.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_output_tokens,
        };

        let mut last: Option<(AnalysisError, Option<String>)> = None;
        for model in &cfg.models {
            match self.attempt(api_key, model, &request, &schema).await {
                Ok(analysis) => {
                    debug!(model = %model, "model produced a report");
                    return Ok((analysis, model.clone()));
                }
                Err(err) => {
                    warn!(model = %model, error = %err, "model attempt failed");
                    let retryable = err.is_retryable();
                    last = Some((err, Some(model.clone())));
                    if !retryable {
                        break;
                    }
                }
            }
        }
        Err(last.unwrap_or((AnalysisError::EmptyResponse, None)))
    }

    async fn attempt(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateRequest,
        schema: &Value,
    ) -> Result<Analysis, AnalysisError> {
        let cfg = &self.settings.analyzer;
        let raw = self.client.generate(api_key, model, request).await?;
        let repair = ModelRepair {
            client: &self.client,
            api_key,
            model,
            temperature: cfg.repair_temperature,
            max_tokens: cfg.max_output_tokens,
            max_input_chars: cfg.max_input_chars,
        };
        harden(&raw, schema, &repair, &self.settings.hardener).await
    }

    async fn feedback(
        &self,
        signals: &BTreeSet<Signal>,
        is_policy_page: bool,
        outcome: FeedbackOutcome,
    ) {
        let _guard = self.detector_lock.lock().await;
        let repo = DetectorRepository::new(&self.store);
        let mut model = repo.load().await;
        update_model(
            &mut model,
            signals,
            is_policy_page,
            outcome,
            &self.settings.adaptation,
        );
        if let Err(e) = repo.save(&model).await {
            warn!(error = %e, "failed to save detector model");
        }
    }

    async fn record(
        &self,
        req: &AnalyzeRequest,
        domain: &str,
        outcome: AttemptOutcome,
        model: Option<String>,
    ) {
        let entry = DetectionLogEntry {
            at: Utc::now(),
            url: req.url.clone(),
            domain: domain.to_string(),
            is_policy_page: req.is_policy_page,
            signals: req.signals.clone(),
            outcome,
            model,
        };
        if let Err(e) = DetectionLog::new(&self.store).append(entry).await {
            warn!(error = %e, "failed to append detection log");
        }
    }

    // ── get_cached ──

    /// The cached report for `domain` if it was built from `text_hash`.
    pub async fn get_cached(&self, domain: &str, text_hash: &str) -> CachedResponse {
        let analysis = match ReportCache::new(&self.store).get(domain, text_hash).await {
            Ok(report) => report.map(|r| r.analysis),
            Err(e) => {
                warn!(domain, error = %e, "cache read failed");
                None
            }
        };
        CachedResponse { analysis }
    }
}

fn error_response(err: &AnalysisError) -> AnalyzeResponse {
    AnalyzeResponse::Error {
        error: err.kind(),
        message: Some(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use clearterms_core::detector::{THRESHOLD_BOUNDS, WEIGHT_BOUNDS};
    use clearterms_core::{ErrorKind, RiskLevel};
    use clearterms_store::{DETECTION_LOG_KEY, MemoryStore};
    use serde_json::json;

    use crate::{PageSnapshot, StaticPage};

    type Call = (String, f32);

    /// Replays canned completions in order and records each call.
    #[derive(Default)]
    struct ScriptedClient {
        replies: StdMutex<VecDeque<Result<String, AnalysisError>>>,
        calls: StdMutex<Vec<Call>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, AnalysisError>>) -> Self {
            Self {
                replies: StdMutex::new(replies.into()),
                calls: StdMutex::default(),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn generate(
            &self,
            _api_key: &str,
            model: &str,
            req: &GenerateRequest,
        ) -> Result<String, AnalysisError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), req.temperature));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AnalysisError::EmptyResponse))
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.analyzer.api_key = Some("test-key".into());
        settings.extraction.retry_delays_ms = vec![1, 1];
        settings
    }

    fn analyzer(
        replies: Vec<Result<String, AnalysisError>>,
    ) -> Analyzer<MemoryStore, ScriptedClient> {
        Analyzer::new(MemoryStore::new(), ScriptedClient::new(replies), settings()).unwrap()
    }

    fn policy_text() -> String {
        "All purchases are final and there are no refunds. ".repeat(12)
    }

    fn request(text: &str, is_policy_page: bool) -> AnalyzeRequest {
        AnalyzeRequest {
            url: "https://acme.com/terms".into(),
            title: "Terms of Service".into(),
            text: text.to_string(),
            text_hash: None,
            is_policy_page,
            signals: [Signal::UrlPattern, Signal::TitleKeyword].into(),
        }
    }

    fn report_json() -> String {
        json!({
            "Risk_Score": 99,
            "Risk_Level": "Extreme",
            "The_Gist": "Purchases are final and refunds are never issued.",
            "Red_Flags": [{
                "clause_type": "no_refunds",
                "title": "No refunds",
                "why_it_matters": "You cannot get money back.",
                "evidence_quotes": ["there are no refunds"]
            }],
            "Data_Rights": [],
            "The_Escape": [],
            "Confidence": 0.8,
            "Disclaimers": ["Informational only — not legal advice."]
        })
        .to_string()
    }

    async fn log_len(store: &MemoryStore) -> usize {
        DetectionLog::new(store).entries().await.unwrap().len()
    }

    #[tokio::test]
    async fn first_model_success_is_cached_and_reinforced() {
        let analyzer = analyzer(vec![Ok(format!("```json\n{}\n```", report_json()))]);
        let response = analyzer.analyze(&request(&policy_text(), true)).await;

        let analysis = response.analysis().unwrap();
        assert_eq!(analysis.risk_score, 8);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert_eq!(analyzer.client.calls(), vec![("gemini-2.5-flash".into(), 0.2)]);

        let cached = analyzer
            .get_cached("acme.com", &content_hash(&policy_text()))
            .await;
        assert_eq!(cached.analysis.as_ref(), Some(analysis));

        let model = DetectorRepository::new(analyzer.store()).load().await;
        assert!(model.weight(Signal::UrlPattern) > 2.0);
        assert_eq!(model.threshold(), 5.0);
        assert_eq!(log_len(analyzer.store()).await, 1);
    }

    #[tokio::test]
    async fn falls_back_to_next_model() {
        let analyzer = analyzer(vec![
            Err(AnalysisError::Upstream {
                status: 503,
                body: "overloaded".into(),
            }),
            Ok(report_json()),
        ]);
        let response = analyzer.analyze(&request(&policy_text(), true)).await;
        assert!(response.analysis().is_some());

        let models: Vec<String> = analyzer.client.calls().into_iter().map(|c| c.0).collect();
        assert_eq!(models, vec!["gemini-2.5-flash", "gemini-2.0-flash"]);

        let entries = DetectionLog::new(analyzer.store()).entries().await.unwrap();
        assert_eq!(entries[0].model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[tokio::test]
    async fn repair_call_runs_at_repair_temperature() {
        let analyzer = analyzer(vec![
            Ok("The policy says {\"The_Gist\": no quotes here}".into()),
            Ok(report_json()),
        ]);
        let response = analyzer.analyze(&request(&policy_text(), true)).await;
        assert_eq!(response.analysis().unwrap().risk_score, 8);
        assert_eq!(
            analyzer.client.calls(),
            vec![
                ("gemini-2.5-flash".into(), 0.2),
                ("gemini-2.5-flash".into(), 0.0)
            ]
        );
    }

    #[tokio::test]
    async fn last_error_surfaces_when_every_model_fails() {
        let analyzer = analyzer(vec![
            Err(AnalysisError::EmptyResponse),
            Ok("{\"The_Gist\": \"ok\"}".into()),
        ]);
        let response = analyzer.analyze(&request(&policy_text(), false)).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::EmptyAnalysis));
        assert!(
            analyzer
                .get_cached("acme.com", &content_hash(&policy_text()))
                .await
                .analysis
                .is_none()
        );
        // Failures do not move the detector.
        let model = DetectorRepository::new(analyzer.store()).load().await;
        assert_eq!(model.samples(), 0);
    }

    #[tokio::test]
    async fn short_text_is_no_text_and_backs_off_detector() {
        let analyzer = analyzer(vec![]);
        let response = analyzer.analyze(&request(&"x".repeat(300), true)).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::NoText));
        assert!(analyzer.client.calls().is_empty());

        let model = DetectorRepository::new(analyzer.store()).load().await;
        assert!((model.weight(Signal::UrlPattern) - 1.9).abs() < 1e-9);
        assert!((model.weight(Signal::TitleKeyword) - 1.9).abs() < 1e-9);
        assert_eq!(model.weight(Signal::LegalTerms), 2.0);
        assert!((model.threshold() - 5.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let mut settings = settings();
        settings.analyzer.api_key = None;
        let analyzer =
            Analyzer::new(MemoryStore::new(), ScriptedClient::new(vec![]), settings).unwrap();
        let response = analyzer.analyze(&request(&policy_text(), true)).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::NoApiKey));
        assert!(analyzer.client.calls().is_empty());
    }

    #[tokio::test]
    async fn stored_key_is_used_when_not_configured() {
        let mut settings = settings();
        settings.analyzer.api_key = None;
        let client = ScriptedClient::new(vec![Ok(report_json())]);
        let analyzer = Analyzer::new(MemoryStore::new(), client, settings).unwrap();
        analyzer
            .store()
            .set(API_KEY_STORE_KEY, json!("saved-key"))
            .await
            .unwrap();
        let response = analyzer.analyze(&request(&policy_text(), true)).await;
        assert!(response.analysis().is_some());
    }

    #[tokio::test]
    async fn cache_hit_skips_model_and_detector() {
        let analyzer = analyzer(vec![Ok(report_json())]);
        let req = request(&policy_text(), true);
        analyzer.analyze(&req).await;
        let before = DetectorRepository::new(analyzer.store()).load().await;

        let again = analyzer.analyze(&req).await;
        assert!(again.analysis().is_some());
        assert_eq!(analyzer.client.calls().len(), 1);
        assert_eq!(DetectorRepository::new(analyzer.store()).load().await, before);

        let entries = DetectionLog::new(analyzer.store()).entries().await.unwrap();
        assert_eq!(entries[1].outcome, AttemptOutcome::Cached);
    }

    #[tokio::test]
    async fn changed_text_misses_cache() {
        let analyzer = analyzer(vec![Ok(report_json()), Ok(report_json())]);
        analyzer.analyze(&request(&policy_text(), true)).await;
        let changed = format!("{} Updated.", policy_text());
        analyzer.analyze(&request(&changed, true)).await;
        assert_eq!(analyzer.client.calls().len(), 2);
        assert!(
            analyzer
                .get_cached("acme.com", &content_hash(&policy_text()))
                .await
                .analysis
                .is_none()
        );
    }

    #[tokio::test]
    async fn detector_stays_bounded_over_many_requests() {
        let replies = (0..40).map(|_| Ok(report_json())).collect();
        let analyzer = analyzer(replies);
        for i in 0..40 {
            let text = if i % 3 == 0 {
                "short".to_string()
            } else {
                format!("{} {i}", policy_text())
            };
            analyzer.analyze(&request(&text, i % 2 == 0)).await;
            let model = DetectorRepository::new(analyzer.store()).load().await;
            for w in model.weights().values() {
                assert!((WEIGHT_BOUNDS.0..=WEIGHT_BOUNDS.1).contains(w));
            }
            assert!((THRESHOLD_BOUNDS.0..=THRESHOLD_BOUNDS.1).contains(&model.threshold()));
        }
        let log = analyzer.store().get(DETECTION_LOG_KEY).await.unwrap().unwrap();
        assert_eq!(log.as_array().unwrap().len(), 40);
    }

    // ── classify_and_extract ──

    /// Serves a sparse page first and the full page on later captures.
    struct SettlingPage {
        captures: StdMutex<usize>,
    }

    #[async_trait]
    impl PageSource for SettlingPage {
        async fn capture(&self) -> Result<PageSnapshot, EngineError> {
            let mut n = self.captures.lock().unwrap();
            *n += 1;
            let body = if *n == 1 {
                "<p>Loading…</p>".to_string()
            } else {
                format!(
                    "<main><h1>Privacy Policy</h1><p>{}</p></main>",
                    policy_text().repeat(2)
                )
            };
            Ok(PageSnapshot {
                url: "https://www.acme.com/privacy".into(),
                html: format!(
                    "<html><head><title>Privacy Policy</title></head><body>{body}</body></html>"
                ),
            })
        }
    }

    #[tokio::test]
    async fn recaptures_until_text_settles() {
        let analyzer = analyzer(vec![]);
        let page = SettlingPage {
            captures: StdMutex::new(0),
        };
        let collected = analyzer.classify_and_extract(&page).await.unwrap();
        assert_eq!(*page.captures.lock().unwrap(), 2);
        assert!(collected.text.starts_with("Privacy Policy All purchases"));
        assert!(collected.is_policy_page);
        assert_eq!(collected.domain, "www.acme.com");
        assert_eq!(collected.text_hash, content_hash(&collected.text));
    }

    #[tokio::test]
    async fn short_page_is_returned_after_retries() {
        let analyzer = analyzer(vec![]);
        let page = StaticPage::new(
            "https://acme.com/blog",
            "<html><head><title>Blog</title></head><body><p>Hello.</p></body></html>",
        );
        let collected = analyzer.classify_and_extract(&page).await.unwrap();
        assert_eq!(collected.text, "Hello.");
        assert!(!collected.is_policy_page);
        assert!(collected.signals.is_empty());

        let response = analyzer.analyze(&collected.to_request()).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::NoText));
    }
}
