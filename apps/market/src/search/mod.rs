//! Job search: the provider trait, the JSearch and SerpAPI providers, and
//! ordered fallback between them.
//!
//! Every provider implements `JobProvider`. The orchestrator holds them as
//! `Arc<dyn JobProvider>` in priority order and never surfaces provider errors.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::posting::Posting;

pub mod jsearch;
pub mod normalize;
pub mod orchestrator;
pub mod serpapi;

/// Request timeout shared by the HTTP-backed providers.
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Rate limited by provider")]
    RateLimited,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected payload: {0}")]
    Parse(String),
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited)
    }
}

/// A source of job postings.
///
/// `query` and `location` arrive already diacritic-stripped. `page_budget` is
/// the maximum number of result pages the provider may request.
#[async_trait]
pub trait JobProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &str,
        location: &str,
        page_budget: u32,
    ) -> Result<Vec<Posting>, ProviderError>;
}

/// Maps a non-2xx response to the matching `ProviderError`.
pub(crate) async fn error_for_status(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    if status.as_u16() == 429 {
        return ProviderError::RateLimited;
    }
    let message = response.text().await.unwrap_or_default();
    ProviderError::Api {
        status: status.as_u16(),
        message,
    }
}
