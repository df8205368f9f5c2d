//! JSearch (RapidAPI) provider. Page-numbered pagination.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::posting::Posting;
use crate::search::{error_for_status, JobProvider, ProviderError, PROVIDER_TIMEOUT_SECS};

pub const JSEARCH_URL: &str = "https://jsearch.p.rapidapi.com/search";
const JSEARCH_HOST: &str = "jsearch.p.rapidapi.com";
/// Pages JSearch bundles into one response page.
const PAGES_PER_REQUEST: &str = "3";
const COUNTRY: &str = "ca";
const DATE_POSTED: &str = "month";

#[derive(Debug, Deserialize)]
struct JSearchResponse {
    #[serde(default)]
    data: Vec<JSearchJob>,
}

#[derive(Debug, Deserialize)]
struct JSearchJob {
    job_title: Option<String>,
    job_description: Option<String>,
    employer_name: Option<String>,
    job_city: Option<String>,
    job_country: Option<String>,
}

impl From<JSearchJob> for Posting {
    fn from(job: JSearchJob) -> Self {
        Posting {
            title: job.job_title.unwrap_or_default(),
            description: job.job_description.unwrap_or_default(),
            employer: job.employer_name.unwrap_or_default(),
            city: job.job_city.unwrap_or_default(),
            country: job.job_country.unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct JSearchProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl JSearchProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, JSEARCH_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: base_url.into(),
        }
    }

    async fn fetch_page(&self, query: &str, page: u32) -> Result<Vec<JSearchJob>, ProviderError> {
        let page = page.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", JSEARCH_HOST)
            .query(&[
                ("query", query),
                ("page", page.as_str()),
                ("num_pages", PAGES_PER_REQUEST),
                ("country", COUNTRY),
                ("date_posted", DATE_POSTED),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response.text().await?;
        let parsed: JSearchResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed.data)
    }
}

#[async_trait]
impl JobProvider for JSearchProvider {
    fn name(&self) -> &str {
        "jsearch"
    }

    /// Fetches pages 1..=page_budget, stopping at the first empty page.
    ///
    /// A failure on the first page is a provider failure. A failure after some
    /// pages arrived ends paging and keeps what was collected.
    async fn search(
        &self,
        query: &str,
        location: &str,
        page_budget: u32,
    ) -> Result<Vec<Posting>, ProviderError> {
        let search_query = if location.is_empty() {
            query.to_string()
        } else {
            format!("{query} in {location}")
        };

        let mut postings = Vec::new();
        for page in 1..=page_budget {
            match self.fetch_page(&search_query, page).await {
                Ok(jobs) if jobs.is_empty() => {
                    debug!("JSearch: no more results at page {page}");
                    break;
                }
                Ok(jobs) => postings.extend(jobs.into_iter().map(Posting::from)),
                Err(e) if postings.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        "JSearch: page {page} failed after {} postings: {e}",
                        postings.len()
                    );
                    break;
                }
            }
        }

        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn job(title: &str, description: &str) -> serde_json::Value {
        json!({
            "job_title": title,
            "job_description": description,
            "employer_name": "Acme",
            "job_city": "Toronto",
            "job_country": "CA"
        })
    }

    #[tokio::test]
    async fn test_collects_pages_until_empty() {
        let server = MockServer::start_async().await;
        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search")
                    .query_param("page", "1")
                    .query_param("query", "Developer in Toronto, Ontario, Canada")
                    .header("x-rapidapi-key", "key");
                then.status(200)
                    .json_body(json!({"data": [job("Dev", "Python"), job("Dev 2", "Go")]}));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("page", "2");
                then.status(200).json_body(json!({"data": []}));
            })
            .await;
        let page3 = server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("page", "3");
                then.status(200).json_body(json!({"data": [job("Late", "Rust")]}));
            })
            .await;

        let provider = JSearchProvider::with_base_url("key".to_string(), server.url("/search"));
        let postings = provider
            .search("Developer", "Toronto, Ontario, Canada", 5)
            .await
            .unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].title, "Dev");
        assert_eq!(postings[0].employer, "Acme");
        page1.assert_hits_async(1).await;
        page2.assert_hits_async(1).await;
        page3.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_respects_page_budget() {
        let server = MockServer::start_async().await;
        let pages = server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200).json_body(json!({"data": [job("Dev", "Python")]}));
            })
            .await;

        let provider = JSearchProvider::with_base_url("key".to_string(), server.url("/search"));
        let postings = provider.search("Developer", "", 2).await.unwrap();

        assert_eq!(postings.len(), 2);
        pages.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(429).body("Too many requests");
            })
            .await;

        let provider = JSearchProvider::with_base_url("key".to_string(), server.url("/search"));
        let err = provider.search("Developer", "Toronto", 1).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_server_error_on_first_page_is_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(500).body("boom");
            })
            .await;

        let provider = JSearchProvider::with_base_url("key".to_string(), server.url("/search"));
        let err = provider.search("Developer", "Toronto", 1).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_collected_postings() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("page", "1");
                then.status(200).json_body(json!({"data": [job("Dev", "Python")]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("page", "2");
                then.status(502).body("bad gateway");
            })
            .await;

        let provider = JSearchProvider::with_base_url("key".to_string(), server.url("/search"));
        let postings = provider.search("Developer", "Toronto", 3).await.unwrap();
        assert_eq!(postings.len(), 1);
    }

    #[tokio::test]
    async fn test_null_fields_become_empty_strings() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("page", "1");
                then.status(200)
                    .json_body(json!({"data": [{"job_title": "Dev", "job_description": null}]}));
            })
            .await;

        let provider = JSearchProvider::with_base_url("key".to_string(), server.url("/search"));
        let postings = provider.search("Developer", "", 1).await.unwrap();
        assert_eq!(postings[0].description, "");
        assert!(!postings[0].has_description());
    }
}
