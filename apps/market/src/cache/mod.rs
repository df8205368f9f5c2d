//! Result cache: cache-aside storage for finished `MarketProfile`s.
//!
//! Backends implement `ResultCache` and swallow their own failures: a broken
//! cache degrades to a miss on read and a no-op on write, never to an error
//! for the caller.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::analyzer::{AnalysisRequest, MarketAnalyzer};
use crate::models::market::MarketProfile;
use crate::search::normalize::normalize_text;

pub mod memory;
pub mod redis_store;

pub const KEY_PREFIX: &str = "market:";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Short label for logs ("redis" | "memory").
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Option<MarketProfile>;

    async fn put(&self, key: &str, profile: &MarketProfile);
}

/// `market:<query>|<city>|<province>` lower-cased, trimmed and accent-free,
/// followed by the result view and page budget, so profiles built from a
/// different view or a different number of pages never collide.
pub fn cache_key(request: &AnalysisRequest) -> String {
    let part = |s: &str| normalize_text(s.trim()).to_lowercase();
    let view = if request.by_category {
        "by-category".to_string()
    } else if request.balanced {
        format!("top{}", request.top_n)
    } else {
        format!("top{}-unbalanced", request.top_n)
    };
    format!(
        "{KEY_PREFIX}{}|{}|{}|{view}|p{}",
        part(&request.query),
        part(&request.city),
        part(&request.province),
        request.page_budget
    )
}

/// Cache-aside wrapper around the pipeline.
#[derive(Clone)]
pub struct CachedAnalyzer {
    analyzer: MarketAnalyzer,
    cache: Arc<dyn ResultCache>,
}

impl CachedAnalyzer {
    pub fn new(analyzer: MarketAnalyzer, cache: Arc<dyn ResultCache>) -> Self {
        Self { analyzer, cache }
    }

    /// Returns the cached profile if present, otherwise runs the pipeline and stores the result.
    pub async fn analyze(&self, request: &AnalysisRequest) -> MarketProfile {
        let key = cache_key(request);
        if let Some(profile) = self.cache.get(&key).await {
            info!("Cache HIT ({}): {key}", self.cache.backend());
            return profile;
        }
        info!("Cache MISS ({}): {key}", self.cache.backend());
        self.run_and_store(&key, request).await
    }

    /// Skips the cache read, always runs the pipeline, then stores the fresh result.
    pub async fn refresh(&self, request: &AnalysisRequest) -> MarketProfile {
        let key = cache_key(request);
        self.run_and_store(&key, request).await
    }

    async fn run_and_store(&self, key: &str, request: &AnalysisRequest) -> MarketProfile {
        let profile = self.analyzer.analyze(request).await;
        // Zero-result profiles are usually transient provider trouble
        if !profile.is_empty() {
            self.cache.put(key, &profile).await;
        }
        profile
    }
}
