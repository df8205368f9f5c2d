use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::error;

use crate::cache::ResultCache;
use crate::models::market::MarketProfile;

/// Process-local cache. Entries live until the process exits.
#[derive(Debug, Default)]
pub struct InMemoryResultCache {
    entries: Mutex<HashMap<String, MarketProfile>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Option<MarketProfile> {
        match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                error!("In-memory cache poisoned on GET: {e}");
                None
            }
        }
    }

    async fn put(&self, key: &str, profile: &MarketProfile) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), profile.clone());
            }
            Err(e) => error!("In-memory cache poisoned on SET: {e}"),
        }
    }
}
