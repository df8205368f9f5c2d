use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vocabulary skill found in one posting. `category` always comes from the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractedSkill {
    pub name: String,
    pub category: String,
}

/// Posting-level occurrence statistics for one canonical skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAggregate {
    pub name: String,
    pub category: String,
    /// Number of postings mentioning the skill (not total mentions).
    pub occurrence_count: u32,
    /// Percentage of analyzed postings, one decimal place.
    pub prevalence: f64,
    /// Position of the skill's first appearance during counting; the rank tie-breaker.
    #[serde(skip)]
    pub first_seen: usize,
}

/// Skills of one category, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub skills: Vec<SkillAggregate>,
}

/// Final output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketProfile {
    pub query: String,
    pub normalized_location: String,
    pub total_postings_analyzed: u32,
    pub ranked_skills: Vec<SkillAggregate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_by_category: Option<Vec<CategoryGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory_message: Option<String>,
    /// Provider that produced the postings, `None` when every provider came back empty.
    #[serde(default)]
    pub source_provider: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl MarketProfile {
    pub fn is_empty(&self) -> bool {
        self.total_postings_analyzed == 0
    }
}
