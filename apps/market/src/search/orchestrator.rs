//! Provider fallback: providers are tried strictly in order, moving on after a
//! failure, a rate limit or an empty result. Providers are never raced.

use std::sync::Arc;

use tracing::{info, warn};

use crate::models::posting::Posting;
use crate::search::normalize::normalize_text;
use crate::search::JobProvider;

/// Postings from a search plus the provider that produced them.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    pub postings: Vec<Posting>,
    /// `None` when every provider failed or came back empty.
    pub provider: Option<String>,
}

#[derive(Clone)]
pub struct JobSearchOrchestrator {
    providers: Vec<Arc<dyn JobProvider>>,
}

impl JobSearchOrchestrator {
    /// `providers` in priority order: primary first, then fallbacks.
    pub fn new(providers: Vec<Arc<dyn JobProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Searches each provider in turn until one yields postings.
    ///
    /// Provider-level failures are absorbed: exhausting every provider yields an
    /// empty report rather than an error.
    pub async fn search_postings(
        &self,
        query: &str,
        location: &str,
        page_budget: u32,
    ) -> SearchReport {
        let query = normalize_text(query);
        let location = normalize_text(location);

        for provider in &self.providers {
            let name = provider.name();
            match provider.search(&query, &location, page_budget).await {
                Ok(postings) if !postings.is_empty() => {
                    info!("JobSearch: using {name} ({} postings)", postings.len());
                    return SearchReport {
                        postings,
                        provider: Some(name.to_string()),
                    };
                }
                Ok(_) => {
                    info!("JobSearch: {name} returned no postings, trying next provider");
                }
                Err(e) if e.is_rate_limited() => {
                    warn!("JobSearch: {name} rate limit reached, trying next provider");
                }
                Err(e) => {
                    warn!("JobSearch: {name} failed: {e}, trying next provider");
                }
            }
        }

        warn!(
            "JobSearch: all {} providers exhausted for '{query}' in '{location}'",
            self.providers.len()
        );
        SearchReport::default()
    }
}
