use std::collections::HashMap;
use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::ApiError;

/// Per-session memoization of idempotent reference lookups.
///
/// Entries are keyed by logical resource name ("accounts", "categories",
/// "tags"), stored as JSON, and live exactly as long as the session that
/// produced them: the client invalidates everything on every login or
/// session restore. Intentionally unbounded and without per-entry expiry -
/// there are three known resource kinds and nothing evicts individually.
#[derive(Debug, Default)]
pub struct ReferenceDataCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl ReferenceDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `resource`, or run `fetch`, store its
    /// result, and return it.
    pub async fn get<T, F, Fut>(&self, resource: &str, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.entries.lock().await.get(resource) {
            debug!(resource, "Reference cache hit");
            return serde_json::from_value(value.clone()).map_err(|e| {
                ApiError::InvalidResponse(format!("cached {resource} unreadable: {e}"))
            });
        }

        debug!(resource, "Reference cache miss");
        let fetched = fetch().await?;
        let value = serde_json::to_value(&fetched)
            .map_err(|e| ApiError::InvalidResponse(format!("{resource} not cacheable: {e}")))?;
        self.entries
            .lock()
            .await
            .insert(resource.to_string(), value);
        Ok(fetched)
    }

    /// Drop every entry. Called whenever a new session replaces the old.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.lock().await;
        if !entries.is_empty() {
            debug!(count = entries.len(), "Invalidating reference cache");
        }
        entries.clear();
    }

    #[cfg(test)]
    async fn contains(&self, resource: &str) -> bool {
        self.entries.lock().await.contains_key(resource)
    }
}
