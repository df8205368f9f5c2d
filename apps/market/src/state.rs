use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::analyzer::MarketAnalyzer;
use crate::cache::memory::InMemoryResultCache;
use crate::cache::redis_store::RedisResultCache;
use crate::cache::{CachedAnalyzer, ResultCache};
use crate::config::{Config, ExtractorKind};
use crate::errors::AppError;
use crate::extraction::llm::LlmClassifier;
use crate::extraction::phrase::PhraseClassifier;
use crate::extraction::{RetryPolicy, SkillClassifier, SkillExtractor};
use crate::llm_client::{self, LlmClient};
use crate::search::jsearch::JSearchProvider;
use crate::search::orchestrator::JobSearchOrchestrator;
use crate::search::serpapi::SerpApiProvider;
use crate::search::JobProvider;
use crate::vocabulary::SkillVocabulary;

/// Every long-lived component, built once from `Config` and passed down explicitly.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub vocabulary: Arc<SkillVocabulary>,
    pub extractor: SkillExtractor,
    pub analyzer: CachedAnalyzer,
}

impl AppState {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        // A vocabulary that cannot be loaded is fatal
        let vocabulary = Arc::new(SkillVocabulary::load(&config.skills_path)?);

        let orchestrator = JobSearchOrchestrator::new(build_providers(&config)?);
        info!(
            "Job providers (in order): {}",
            orchestrator.provider_names().join(", ")
        );

        let classifier = build_classifier(&config, &vocabulary)?;
        let retry = RetryPolicy {
            max_attempts: config.extraction_max_attempts.max(1),
            base_delay: Duration::from_secs(config.extraction_backoff_secs),
        };
        let extractor = SkillExtractor::new(classifier, vocabulary.clone(), retry);
        info!(
            "Skill extractor: {} backend, {} attempts, {}s base backoff",
            extractor.backend(),
            retry.max_attempts,
            config.extraction_backoff_secs
        );

        let analyzer = MarketAnalyzer::new(orchestrator, extractor.clone())
            .with_max_concurrent(config.max_concurrent_extractions);

        let cache = build_cache(&config).await;

        Ok(AppState {
            analyzer: CachedAnalyzer::new(analyzer, cache),
            extractor,
            vocabulary,
            config,
        })
    }
}

/// JSearch first when configured, SerpAPI as fallback.
fn build_providers(config: &Config) -> Result<Vec<Arc<dyn JobProvider>>, AppError> {
    let mut providers: Vec<Arc<dyn JobProvider>> = Vec::new();
    if let Some(key) = &config.rapidapi_key {
        providers.push(Arc::new(JSearchProvider::new(key.clone())));
    }
    if let Some(key) = &config.serpapi_key {
        providers.push(Arc::new(
            SerpApiProvider::new(key.clone()).with_language(config.serpapi_language.clone()),
        ));
    }
    if providers.is_empty() {
        return Err(AppError::Config(
            "no job provider configured: set RAPIDAPI_KEY and/or SERPAPI_KEY".to_string(),
        ));
    }
    Ok(providers)
}

fn build_classifier(
    config: &Config,
    vocabulary: &SkillVocabulary,
) -> Result<Arc<dyn SkillClassifier>, AppError> {
    match config.extractor {
        ExtractorKind::Llm => {
            let api_key = config.groq_api_key.clone().ok_or_else(|| {
                AppError::Config("GROQ_API_KEY is required when EXTRACTOR=llm".to_string())
            })?;
            let llm = LlmClient::with_api_url(api_key, config.groq_api_url.clone());
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Ok(Arc::new(LlmClassifier(llm)))
        }
        ExtractorKind::Phrase => Ok(Arc::new(
            PhraseClassifier::new(vocabulary).with_strict_ambiguous(config.strict_ambiguous_skills),
        )),
    }
}

/// Redis when configured and reachable, otherwise a process-local map.
async fn build_cache(config: &Config) -> Arc<dyn ResultCache> {
    if let Some(url) = &config.redis_url {
        match RedisResultCache::connect(url, config.cache_ttl_secs).await {
            Ok(cache) => return Arc::new(cache),
            Err(e) => warn!("Failed to connect to Redis, using in-memory cache: {e}"),
        }
    }
    info!("Result cache: in-memory");
    Arc::new(InMemoryResultCache::new())
}
