//! Market analysis pipeline.
//!
//! Flow: build location → search_postings (provider fallback) → drop postings
//!       without a description → extract_all (bounded fan-out) → aggregate.
//!
//! Every recoverable condition ends in a well-formed `MarketProfile`; a search
//! that finds nothing produces the zero-result profile with its advisory.

use tracing::info;

use crate::analysis::{aggregate, aggregate_by_category, empty_profile, AggregationOptions};
use crate::extraction::{SkillExtractor, DEFAULT_MAX_CONCURRENT};
use crate::models::market::MarketProfile;
use crate::search::normalize::normalize_text;
use crate::search::orchestrator::JobSearchOrchestrator;

pub const DEFAULT_PAGE_BUDGET: u32 = 3;

/// One analysis run's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub query: String,
    pub city: String,
    pub province: String,
    pub top_n: usize,
    pub balanced: bool,
    /// Group the result by category instead of the flat diverse ranking.
    pub by_category: bool,
    pub page_budget: u32,
}

impl AnalysisRequest {
    pub fn new(
        query: impl Into<String>,
        city: impl Into<String>,
        province: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            city: city.into(),
            province: province.into(),
            top_n: AggregationOptions::default().top_n,
            balanced: true,
            by_category: false,
            page_budget: DEFAULT_PAGE_BUDGET,
        }
    }

    /// `"<City>, <Province>, Canada"`.
    pub fn location(&self) -> String {
        format!("{}, {}, Canada", self.city.trim(), self.province.trim())
    }
}

#[derive(Clone)]
pub struct MarketAnalyzer {
    orchestrator: JobSearchOrchestrator,
    extractor: SkillExtractor,
    max_concurrent: usize,
    options: AggregationOptions,
}

impl MarketAnalyzer {
    pub fn new(orchestrator: JobSearchOrchestrator, extractor: SkillExtractor) -> Self {
        Self {
            orchestrator,
            extractor,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            options: AggregationOptions::default(),
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> MarketProfile {
        let location = request.location();
        let normalized_location = normalize_text(&location);

        // Step 1: Search with provider fallback
        let report = self
            .orchestrator
            .search_postings(&request.query, &location, request.page_budget)
            .await;

        // Step 2: Only postings with text are analyzed
        let texts: Vec<String> = report
            .postings
            .into_iter()
            .filter(|p| p.has_description())
            .map(|p| p.description)
            .collect();

        if texts.is_empty() {
            info!(
                "Market analysis: no postings for '{}' in {}",
                request.query, normalized_location
            );
            let mut profile = empty_profile(&request.query, &normalized_location);
            if request.by_category {
                profile.skills_by_category = Some(Vec::new());
            }
            return profile;
        }

        // Step 3: Extract skills, one slot per posting
        info!(
            "Market analysis: extracting skills from {} postings via {} (max {} in flight)",
            texts.len(),
            self.extractor.backend(),
            self.max_concurrent
        );
        let extractions = self.extractor.extract_all(&texts, self.max_concurrent).await;

        // Step 4: Aggregate
        let total = u32::try_from(texts.len()).unwrap_or(u32::MAX);
        let options = AggregationOptions {
            top_n: request.top_n,
            balanced: request.balanced,
            ..self.options
        };
        let mut profile = if request.by_category {
            aggregate_by_category(&request.query, &normalized_location, &extractions, total, &options)
        } else {
            aggregate(&request.query, &normalized_location, &extractions, total, &options)
        };
        profile.source_provider = report.provider;

        info!(
            "Market analysis: {} postings, {} skills ranked (source: {})",
            profile.total_postings_analyzed,
            profile.ranked_skills.len(),
            profile.source_provider.as_deref().unwrap_or("none")
        );
        profile
    }
}
