//! Decision logic: page classification, text extraction, the model client,
//! and the hardening pipeline that turns raw model output into a report.

pub mod classifier;
mod error;
pub mod extract;
pub mod feedback;
pub mod harden;
pub mod json;
pub mod llm;
pub mod prompt;
pub mod score;
pub mod shape;

pub use classifier::{DocumentView, PageClassifier};
pub use error::AnalysisError;
pub use extract::{ParsedPage, TextExtractor};
pub use feedback::{FeedbackOutcome, update_model};
pub use harden::{JsonRepair, NoRepair, harden, harden_local};
pub use llm::{CompletionClient, GeminiClient, GenerateRequest, ModelRepair};
pub use score::score;
