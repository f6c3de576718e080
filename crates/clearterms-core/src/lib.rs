//! Core types, analysis schema, and shared configuration.

pub mod analysis;
pub mod config;
pub mod detector;
pub mod hash;
pub mod report;
pub mod schema;
pub mod wire;

pub use analysis::{Analysis, ClauseType, DataRight, EscapeStep, RedFlag, RiskLevel};
pub use config::Settings;
pub use detector::{ClassificationResult, DetectorModel, Signal};
pub use hash::{content_hash, domain_of};
pub use report::{AttemptOutcome, CachedReport, DetectionLogEntry, ReportMeta, SCHEMA_VERSION};
pub use wire::{AnalyzeRequest, AnalyzeResponse, CachedResponse, CollectedPage, ErrorKind};
