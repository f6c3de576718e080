//! Persistence for the adaptive [`DetectorModel`].

use clearterms_core::DetectorModel;
use tracing::{debug, warn};

use crate::{KvStore, StoreError, get_as, set_as};

pub const DETECTOR_KEY: &str = "policy_detector";

/// Loads and saves the detector weight table.
pub struct DetectorRepository<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KvStore + ?Sized> DetectorRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Current model. Missing or corrupt state yields the defaults; whatever
    /// is read back is clamped into bounds.
    pub async fn load(&self) -> DetectorModel {
        match get_as::<DetectorModel, _>(self.store, DETECTOR_KEY).await {
            Ok(Some(model)) => model.sanitized(),
            Ok(None) => {
                debug!("no stored detector model, using defaults");
                DetectorModel::default()
            }
            Err(e) => {
                warn!(error = %e, "stored detector model unreadable, using defaults");
                DetectorModel::default()
            }
        }
    }

    pub async fn save(&self, model: &DetectorModel) -> Result<(), StoreError> {
        set_as(self.store, DETECTOR_KEY, model).await
    }

    /// Drop the stored model so the next load starts from defaults.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.remove(DETECTOR_KEY).await
    }
}
