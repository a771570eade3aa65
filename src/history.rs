//! Symptom history with a local cache
//!
//! The backend is the source of truth. Every successful fetch refreshes the
//! cached copy, which is what the view falls back to when the backend cannot
//! be reached.

use crate::backend::{BackendError, SessionService, SymptomEntry};
use crate::db::{history_key, LocalStore, StoreResult};

/// Where a page of history came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    Remote,
    Cache,
}

#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// Newest first
    pub entries: Vec<SymptomEntry>,
    pub source: HistorySource,
}

pub struct HistoryView<S> {
    service: S,
    store: LocalStore,
}

impl<S: SessionService> HistoryView<S> {
    pub fn new(service: S, store: LocalStore) -> Self {
        Self { service, store }
    }

    pub async fn load(&self, identity: &str) -> Result<HistoryPage, BackendError> {
        let key = history_key(identity);
        match self.service.fetch_history(identity).await {
            Ok(mut entries) => {
                if let Err(e) = self.store.set(&key, &entries) {
                    tracing::warn!(identity = %identity, error = %e, "Failed to cache history");
                }
                newest_first(&mut entries);
                Ok(HistoryPage {
                    entries,
                    source: HistorySource::Remote,
                })
            }
            Err(e) => {
                let mut cached: Vec<SymptomEntry> = self.store.get(&key, Vec::new());
                if cached.is_empty() {
                    return Err(e);
                }
                tracing::warn!(
                    identity = %identity,
                    error = %e,
                    cached = cached.len(),
                    "Backend unavailable, showing cached history"
                );
                newest_first(&mut cached);
                Ok(HistoryPage {
                    entries: cached,
                    source: HistorySource::Cache,
                })
            }
        }
    }

    /// Add a just-saved entry to the cached copy
    pub fn remember(&self, identity: &str, entry: &SymptomEntry) -> StoreResult<()> {
        let key = history_key(identity);
        let mut cached: Vec<SymptomEntry> = self.store.get(&key, Vec::new());
        cached.push(entry.clone());
        self.store.set(&key, &cached)
    }
}

fn newest_first(entries: &mut [SymptomEntry]) {
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.timestamp()));
}
