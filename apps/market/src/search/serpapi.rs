//! SerpAPI (Google Jobs) provider. Token-based pagination, roughly ten results per page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::posting::Posting;
use crate::search::{error_for_status, JobProvider, ProviderError, PROVIDER_TIMEOUT_SECS};

pub const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const ENGINE: &str = "google_jobs";
const COUNTRY: &str = "ca";
const RESULTS_PER_PAGE: usize = 10;

#[derive(Debug, Deserialize)]
struct SerpResponse {
    error: Option<String>,
    #[serde(default)]
    jobs_results: Vec<SerpJob>,
    serpapi_pagination: Option<SerpPagination>,
}

#[derive(Debug, Deserialize)]
struct SerpJob {
    title: Option<String>,
    description: Option<String>,
    company_name: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpPagination {
    next_page_token: Option<String>,
}

impl From<SerpJob> for Posting {
    fn from(job: SerpJob) -> Self {
        Posting {
            title: job.title.unwrap_or_default(),
            description: job.description.unwrap_or_default(),
            employer: job.company_name.unwrap_or_default(),
            city: job.location.unwrap_or_default(),
            country: "CA".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SerpApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    /// Google `hl` parameter. A French search with no results is retried in English.
    language: String,
}

impl SerpApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, SERPAPI_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: base_url.into(),
            language: "en".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    async fn fetch_page(
        &self,
        query: &str,
        city: &str,
        language: &str,
        page_token: Option<&str>,
    ) -> Result<SerpResponse, ProviderError> {
        let mut params = vec![
            ("api_key", self.api_key.as_str()),
            ("engine", ENGINE),
            ("q", query),
            ("location", city),
            ("gl", COUNTRY),
            ("hl", language),
        ];
        if let Some(token) = page_token {
            params.push(("next_page_token", token));
        }

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    async fn search_in(
        &self,
        query: &str,
        city: &str,
        page_budget: u32,
        language: &str,
    ) -> Result<Vec<Posting>, ProviderError> {
        let max_results = page_budget as usize * RESULTS_PER_PAGE;
        let mut postings: Vec<Posting> = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=page_budget {
            if postings.len() >= max_results {
                break;
            }
            debug!("SerpAPI: fetching page {page}");

            let data = match self
                .fetch_page(query, city, language, page_token.as_deref())
                .await
            {
                Ok(data) => data,
                Err(e) if postings.is_empty() => return Err(e),
                Err(e) => {
                    warn!("SerpAPI: page {page} failed after {} postings: {e}", postings.len());
                    break;
                }
            };

            if let Some(error) = data.error {
                if postings.is_empty() {
                    return Err(ProviderError::Api {
                        status: 200,
                        message: error,
                    });
                }
                warn!("SerpAPI: page {page} returned error: {error}");
                break;
            }

            if data.jobs_results.is_empty() {
                debug!(
                    "SerpAPI: no more jobs at page {page}, total collected={}",
                    postings.len()
                );
                break;
            }
            postings.extend(data.jobs_results.into_iter().map(Posting::from));

            match data.serpapi_pagination.and_then(|p| p.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        postings.truncate(max_results);
        Ok(postings)
    }
}

#[async_trait]
impl JobProvider for SerpApiProvider {
    fn name(&self) -> &str {
        "serpapi"
    }

    /// Google Jobs wants a bare city, so only the first segment of
    /// "City, Province, Country" is sent.
    async fn search(
        &self,
        query: &str,
        location: &str,
        page_budget: u32,
    ) -> Result<Vec<Posting>, ProviderError> {
        let city = location
            .split(',')
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Canada");

        // Google Jobs reports "no results" as an `error` field, so a failed
        // French search gets the English retry too.
        match self.search_in(query, city, page_budget, &self.language).await {
            Ok(postings) if !postings.is_empty() => Ok(postings),
            result if self.language == "fr" => {
                match result {
                    Ok(_) => info!("SerpAPI: no results in French, trying English"),
                    Err(e) => info!("SerpAPI: French search failed ({e}), trying English"),
                }
                self.search_in(query, city, page_budget, "en").await
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn serp_job(title: &str) -> serde_json::Value {
        json!({
            "title": title,
            "description": "Java and Spring",
            "company_name": "Maple Corp",
            "location": "Toronto, ON"
        })
    }

    #[tokio::test]
    async fn test_maps_jobs_and_sends_city_only() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search.json")
                    .query_param("engine", "google_jobs")
                    .query_param("q", "Developer")
                    .query_param("location", "Toronto")
                    .query_param("hl", "en");
                then.status(200)
                    .json_body(json!({"jobs_results": [serp_job("Backend Dev")]}));
            })
            .await;

        let provider = SerpApiProvider::with_base_url("key".to_string(), server.url("/search.json"));
        let postings = provider
            .search("Developer", "Toronto, Ontario, Canada", 3)
            .await
            .unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Backend Dev");
        assert_eq!(postings[0].employer, "Maple Corp");
        assert_eq!(postings[0].country, "CA");
    }

    #[tokio::test]
    async fn test_stops_at_page_budget_even_with_next_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json");
                then.status(200).json_body(json!({
                    "jobs_results": [serp_job("A"), serp_job("B")],
                    "serpapi_pagination": {"next_page_token": "tok"}
                }));
            })
            .await;

        let provider = SerpApiProvider::with_base_url("key".to_string(), server.url("/search.json"));
        let postings = provider.search("Developer", "Toronto", 1).await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(postings.len(), 2);
    }

    #[tokio::test]
    async fn test_error_field_is_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json");
                then.status(200).json_body(json!({"error": "Invalid API key."}));
            })
            .await;

        let provider = SerpApiProvider::with_base_url("bad".to_string(), server.url("/search.json"));
        let err = provider.search("Developer", "Toronto", 1).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { ref message, .. } if message == "Invalid API key."));
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json");
                then.status(429);
            })
            .await;

        let provider = SerpApiProvider::with_base_url("key".to_string(), server.url("/search.json"));
        let err = provider.search("Developer", "Toronto", 1).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_french_without_results_retries_in_english() {
        let server = MockServer::start_async().await;
        let french = server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json").query_param("hl", "fr");
                then.status(200).json_body(json!({"jobs_results": []}));
            })
            .await;
        let english = server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json").query_param("hl", "en");
                then.status(200).json_body(json!({"jobs_results": [serp_job("Dev")]}));
            })
            .await;

        let provider = SerpApiProvider::with_base_url("key".to_string(), server.url("/search.json"))
            .with_language("fr");
        let postings = provider.search("Developpeur", "Montreal", 1).await.unwrap();

        french.assert_hits_async(1).await;
        english.assert_hits_async(1).await;
        assert_eq!(postings.len(), 1);
    }

    #[tokio::test]
    async fn test_french_no_results_error_retries_in_english() {
        let server = MockServer::start_async().await;
        let french = server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json").query_param("hl", "fr");
                then.status(200).json_body(json!({
                    "error": "Google hasn't returned any results for this query."
                }));
            })
            .await;
        let english = server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json").query_param("hl", "en");
                then.status(200).json_body(json!({"jobs_results": [serp_job("Dev")]}));
            })
            .await;

        let provider = SerpApiProvider::with_base_url("key".to_string(), server.url("/search.json"))
            .with_language("fr");
        let postings = provider.search("Developpeur", "Montreal", 1).await.unwrap();

        french.assert_hits_async(1).await;
        english.assert_hits_async(1).await;
        assert_eq!(postings[0].title, "Dev");
    }

    #[tokio::test]
    async fn test_english_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/search.json");
                then.status(200).json_body(json!({
                    "error": "Google hasn't returned any results for this query."
                }));
            })
            .await;

        let provider = SerpApiProvider::with_base_url("key".to_string(), server.url("/search.json"));
        let err = provider.search("Developer", "Toronto", 1).await.unwrap_err();

        mock.assert_hits_async(1).await;
        assert!(matches!(err, ProviderError::Api { status: 200, .. }));
    }
}
