//! Turns posting text into vocabulary skills.
//!
//! The classification backend is pluggable (`SkillClassifier`): the LLM-backed
//! `LlmClassifier` by default, or the local `PhraseClassifier`. Whatever the
//! backend emits is re-validated against the vocabulary here, so categories
//! always come from the vocabulary and unknown names never leave this module.
//!
//! Batch extraction runs one task per posting behind a counting semaphore. A
//! posting that keeps getting rate limited, or fails outright, yields an empty
//! slot without disturbing its siblings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::models::market::ExtractedSkill;
use crate::vocabulary::SkillVocabulary;

pub mod llm;
pub mod phrase;
pub mod prompts;

/// Posting text beyond this many characters is never sent to a classifier.
pub const MAX_TEXT_CHARS: usize = 3000;
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Classifier rate limited: {0}")]
    RateLimited(String),

    #[error("Classification failed: {0}")]
    Failed(String),
}

/// A backend that picks skill names out of free text.
///
/// Implementations should only emit names from `allowed`; anything else is
/// dropped by the extractor regardless.
#[async_trait]
pub trait SkillClassifier: Send + Sync {
    /// Short label for logs ("llm" | "phrase").
    fn backend(&self) -> &'static str;

    async fn classify(
        &self,
        text: &str,
        allowed: &[String],
    ) -> Result<Vec<String>, ClassifyError>;
}

/// Rate-limit retry policy: attempt `k` that gets rate limited waits `k × base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Clone)]
pub struct SkillExtractor {
    classifier: Arc<dyn SkillClassifier>,
    vocabulary: Arc<SkillVocabulary>,
    allowed: Arc<Vec<String>>,
    retry: RetryPolicy,
}

impl SkillExtractor {
    pub fn new(
        classifier: Arc<dyn SkillClassifier>,
        vocabulary: Arc<SkillVocabulary>,
        retry: RetryPolicy,
    ) -> Self {
        let allowed = Arc::new(vocabulary.names());
        Self {
            classifier,
            vocabulary,
            allowed,
            retry,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.classifier.backend()
    }

    /// Extracts the distinct vocabulary skills mentioned in one posting.
    pub async fn extract(&self, text: &str) -> Vec<ExtractedSkill> {
        self.extract_gated(text, None).await
    }

    /// Extracts every text with at most `max_concurrent` classifier calls in flight.
    ///
    /// Output slot `i` always belongs to `texts[i]`, whatever the completion order.
    pub async fn extract_all(
        &self,
        texts: &[String],
        max_concurrent: usize,
    ) -> Vec<Vec<ExtractedSkill>> {
        let gate = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut tasks = JoinSet::new();

        for (idx, text) in texts.iter().enumerate() {
            let extractor = self.clone();
            let gate = Arc::clone(&gate);
            let text = text.clone();
            tasks.spawn(async move {
                let skills = extractor.extract_gated(&text, Some(gate.as_ref())).await;
                (idx, skills)
            });
        }

        let mut results = vec![Vec::new(); texts.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, skills)) => results[idx] = skills,
                // The slot keeps its empty default
                Err(e) => error!("Extraction task panicked: {e}"),
            }
        }

        debug!(
            "Extracted skills from {} postings ({} non-empty)",
            results.len(),
            results.iter().filter(|r| !r.is_empty()).count()
        );
        results
    }

    /// The permit is held only for the classifier call, never across a backoff sleep.
    async fn extract_gated(&self, text: &str, gate: Option<&Semaphore>) -> Vec<ExtractedSkill> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let text = truncate_chars(text, MAX_TEXT_CHARS);

        for attempt in 1..=self.retry.max_attempts {
            let permit = match gate {
                Some(gate) => gate.acquire().await.ok(),
                None => None,
            };
            let outcome = self.classifier.classify(text, &self.allowed).await;
            drop(permit);

            match outcome {
                Ok(names) => return self.resolve(names),
                Err(ClassifyError::RateLimited(detail)) => {
                    if attempt < self.retry.max_attempts {
                        let delay = self.retry.delay_after(attempt);
                        warn!(
                            "{} classifier rate limited, retry in {}ms (attempt {attempt}/{}): {detail}",
                            self.backend(),
                            delay.as_millis(),
                            self.retry.max_attempts
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!("{} classifier error, skipping posting: {e}", self.backend());
                    return Vec::new();
                }
            }
        }

        warn!(
            "{} classifier: max retries ({}) exceeded, skipping posting",
            self.backend(),
            self.retry.max_attempts
        );
        Vec::new()
    }

    /// Maps emitted names onto canonical vocabulary entries, dropping unknowns and repeats.
    fn resolve(&self, names: Vec<String>) -> Vec<ExtractedSkill> {
        let mut seen = HashSet::new();
        let mut skills = Vec::new();

        for name in names {
            match self.vocabulary.resolve(&name) {
                Some(entry) => {
                    if seen.insert(entry.name.clone()) {
                        skills.push(ExtractedSkill {
                            name: entry.name.clone(),
                            category: entry.category.clone(),
                        });
                    }
                }
                None => debug!("Dropping skill outside vocabulary: {name}"),
            }
        }

        skills
    }
}

/// Longest prefix of `text` holding at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
