//! Bounded detection log.

use clearterms_core::DetectionLogEntry;
use tracing::warn;

use crate::{KvStore, StoreError, get_as, set_as};

pub const DETECTION_LOG_KEY: &str = "detection_log";
pub const DETECTION_LOG_CAPACITY: usize = 50;

/// Append-only ring of the most recent attempts; the oldest entry is
/// dropped once the log is full.
pub struct DetectionLog<'a, S: ?Sized> {
    store: &'a S,
    capacity: usize,
}

impl<'a, S: KvStore + ?Sized> DetectionLog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_capacity(store, DETECTION_LOG_CAPACITY)
    }

    pub fn with_capacity(store: &'a S, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    /// Entries oldest first. An unreadable log reads as empty.
    pub async fn entries(&self) -> Result<Vec<DetectionLogEntry>, StoreError> {
        match get_as::<Vec<DetectionLogEntry>, _>(self.store, DETECTION_LOG_KEY).await {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(StoreError::Json(e)) => {
                warn!(error = %e, "detection log unreadable, starting fresh");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn append(&self, entry: DetectionLogEntry) -> Result<(), StoreError> {
        let mut entries = self.entries().await?;
        entries.push(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }
        set_as(self.store, DETECTION_LOG_KEY, &entries).await
    }
}
