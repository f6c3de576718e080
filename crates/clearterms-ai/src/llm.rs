//! Model completion client.
//!
//! [`CompletionClient`] is the seam the engine talks to; [`GeminiClient`] is
//! the HTTP implementation against the `generateContent` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::AnalysisError;
use crate::harden::JsonRepair;
use crate::prompt::build_repair_prompt;

/// One completion call: instruction, user turn, response schema and
/// sampling controls.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub response_schema: Value,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generated text, trimmed. Empty output is `EmptyResponse`.
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        req: &GenerateRequest,
    ) -> Result<String, AnalysisError>;
}

// ── Wire format ──

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Instruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_json_schema: &'a Value,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    #[serde(rename = "system_instruction")]
    system_instruction: Instruction<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig<'a>,
}

impl<'a> GenerateBody<'a> {
    fn new(req: &'a GenerateRequest) -> Self {
        Self {
            system_instruction: Instruction {
                parts: [Part {
                    text: &req.system_prompt,
                }],
            },
            contents: [Content {
                role: "user",
                parts: [Part {
                    text: &req.user_prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: &req.response_schema,
                temperature: req.temperature,
                max_output_tokens: req.max_tokens,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text parts of the first candidate joined by newlines, trimmed.
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

// ── Client ──

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// `base_url` like `https://generativelanguage.googleapis.com` (no
    /// trailing slash needed).
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        req: &GenerateRequest,
    ) -> Result<String, AnalysisError> {
        let url = self.endpoint(model);
        info!(url = %url, model, temperature = req.temperature, "requesting completion");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&GenerateBody::new(req))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(model, status = status.as_u16(), "model endpoint returned an error");
            return Err(AnalysisError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let data: GenerateResponse = resp.json().await?;
        let text = data.text();
        if text.is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        debug!(model, chars = text.len(), "completion received");
        Ok(text)
    }
}

// ── Repair ──

/// [`JsonRepair`] backed by a second completion call.
pub struct ModelRepair<'a, C: ?Sized> {
    pub client: &'a C,
    pub api_key: &'a str,
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_input_chars: usize,
}

#[async_trait]
impl<C> JsonRepair for ModelRepair<'_, C>
where
    C: CompletionClient + ?Sized,
{
    async fn repair(&self, schema: &Value, raw: &str) -> Option<String> {
        let prompt = build_repair_prompt(schema, raw, self.max_input_chars);
        let req = GenerateRequest {
            system_prompt: prompt.system,
            user_prompt: prompt.user,
            response_schema: schema.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        match self.client.generate(self.api_key, self.model, &req).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(model = self.model, error = %e, "repair call failed");
                None
            }
        }
    }
}
