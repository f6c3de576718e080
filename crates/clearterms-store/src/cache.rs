//! Report cache keyed by `analysis:<domain>`.

use clearterms_core::CachedReport;
use tracing::{debug, info, warn};

use crate::{KvStore, StoreError, get_as, set_as};

/// One cached report per domain, valid only for the content it was built from.
pub struct ReportCache<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KvStore + ?Sized> ReportCache<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn key(domain: &str) -> String {
        format!("analysis:{domain}")
    }

    /// Return the cached report for `domain` if it matches `content_hash`
    /// and the current schema version. Stale or unreadable entries are
    /// removed.
    pub async fn get(
        &self,
        domain: &str,
        content_hash: &str,
    ) -> Result<Option<CachedReport>, StoreError> {
        let key = Self::key(domain);
        let record = match get_as::<CachedReport, _>(self.store, &key).await {
            Ok(record) => record,
            Err(StoreError::Json(e)) => {
                warn!(domain, error = %e, "discarding unreadable cached report");
                self.store.remove(&key).await?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match record {
            Some(report) if report.is_valid_for(content_hash) => {
                debug!(domain, "cache hit");
                Ok(Some(report))
            }
            Some(report) => {
                info!(
                    domain,
                    cached_version = report.meta.schema_version,
                    "discarding stale cached report"
                );
                self.store.remove(&key).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Store a report, replacing whatever the domain had before.
    pub async fn put(&self, domain: &str, report: &CachedReport) -> Result<(), StoreError> {
        set_as(self.store, &Self::key(domain), report).await
    }
}
