//! LLM-backed classifier. All HTTP goes through `LlmClient`.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use crate::extraction::prompts::{build_extraction_prompt, EXTRACTION_SYSTEM};
use crate::extraction::{ClassifyError, SkillClassifier};
use crate::llm_client::{LlmClient, LlmError};

pub struct LlmClassifier(pub LlmClient);

#[async_trait]
impl SkillClassifier for LlmClassifier {
    fn backend(&self) -> &'static str {
        "llm"
    }

    /// Malformed or empty model output counts as "no skills", not as an error.
    async fn classify(
        &self,
        text: &str,
        allowed: &[String],
    ) -> Result<Vec<String>, ClassifyError> {
        let prompt = build_extraction_prompt(text, allowed);

        let names = match self.0.call_json::<Vec<String>>(&prompt, EXTRACTION_SYSTEM).await {
            Ok(names) => names,
            Err(LlmError::RateLimited(detail)) => {
                return Err(ClassifyError::RateLimited(detail));
            }
            Err(LlmError::Parse(e)) => {
                debug!("LLM returned non-parseable skill list: {e}");
                return Ok(Vec::new());
            }
            Err(LlmError::EmptyContent) => return Ok(Vec::new()),
            Err(e) => return Err(ClassifyError::Failed(e.to_string())),
        };

        let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
        Ok(names
            .into_iter()
            .filter(|n| allowed.contains(n.as_str()))
            .collect())
    }
}
