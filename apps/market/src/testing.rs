//! Shared fixtures for pipeline-level tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::extraction::phrase::PhraseClassifier;
use crate::extraction::{RetryPolicy, SkillExtractor};
use crate::models::posting::Posting;
use crate::search::{JobProvider, ProviderError};
use crate::vocabulary::SkillVocabulary;

pub const VOCABULARY_JSON: &str = r#"{
    "IT": {
        "programming_languages": [
            {"name": "Python"},
            {"name": "Go", "variants": ["golang"]},
            {"name": "Rust"}
        ],
        "databases": [
            {"name": "PostgreSQL", "variants": ["postgres"]}
        ],
        "devops_tools": [
            {"name": "Docker"},
            {"name": "Kubernetes", "variants": ["k8s"]}
        ]
    }
}"#;

pub fn vocabulary() -> Arc<SkillVocabulary> {
    Arc::new(SkillVocabulary::from_json_str(VOCABULARY_JSON).unwrap())
}

/// Extractor over the fixture vocabulary using local phrase matching.
pub fn phrase_extractor() -> SkillExtractor {
    let vocabulary = vocabulary();
    let classifier = Arc::new(PhraseClassifier::new(&vocabulary));
    SkillExtractor::new(classifier, vocabulary, RetryPolicy::default())
}

/// Provider that always answers with the same postings.
pub struct StaticProvider {
    name: &'static str,
    postings: Vec<Posting>,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new(name: &'static str, descriptions: &[&str]) -> Arc<Self> {
        let postings = descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| Posting {
                title: format!("Job {i}"),
                description: d.to_string(),
                employer: "Acme".to_string(),
                city: "Montreal".to_string(),
                country: "CA".to_string(),
            })
            .collect();
        Arc::new(Self {
            name,
            postings,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(
        &self,
        _query: &str,
        _location: &str,
        _page_budget: u32,
    ) -> Result<Vec<Posting>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.postings.clone())
    }
}
