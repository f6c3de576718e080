//! The three operations a UI layer calls: collect a page, analyze its
//! text, and look up a cached report.

mod analyzer;
mod error;
mod page;

pub use analyzer::{API_KEY_STORE_KEY, Analyzer};
pub use error::EngineError;
pub use page::{HttpPage, PageSnapshot, PageSource, StaticPage};
