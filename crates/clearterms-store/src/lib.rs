//! Storage layer: a key-value store plus typed repositories for the detector
//! model, cached reports, and the detection log.

mod cache;
mod detector;
mod error;
mod kv;
mod log;

pub use cache::ReportCache;
pub use detector::{DETECTOR_KEY, DetectorRepository};
pub use error::StoreError;
pub use kv::{JsonFileStore, KvStore, MemoryStore, get_as, set_as};
pub use log::{DETECTION_LOG_CAPACITY, DETECTION_LOG_KEY, DetectionLog};
