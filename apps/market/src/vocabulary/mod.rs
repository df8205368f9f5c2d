//! The canonical skill table every extraction is validated against.
//!
//! Loaded once at startup and shared read-only (`Arc<SkillVocabulary>`) by the
//! extraction and aggregation stages. A vocabulary that cannot be loaded is fatal.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub mod categories;

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("Failed to read vocabulary file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid vocabulary document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Skill '{0}' is defined more than once")]
    DuplicateSkill(String),

    #[error("Alias '{alias}' maps to both '{first}' and '{second}'")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Vocabulary contains no skills")]
    Empty,
}

/// A canonical skill and the surface forms that resolve to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillVocabularyEntry {
    pub name: String,
    pub category: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSkill {
    name: String,
    #[serde(default, alias = "variants")]
    aliases: Vec<String>,
}

/// Accepts either `{ "IT": { category: [...] } }` or a bare `{ category: [...] }` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VocabularyDocument {
    Sectioned {
        #[serde(rename = "IT")]
        it: BTreeMap<String, Vec<RawSkill>>,
    },
    Flat(BTreeMap<String, Vec<RawSkill>>),
}

#[derive(Debug, Clone)]
pub struct SkillVocabulary {
    entries: Vec<SkillVocabularyEntry>,
    by_name: HashMap<String, usize>,
    /// Lower-cased canonical names and aliases.
    by_surface: HashMap<String, usize>,
}

impl SkillVocabulary {
    /// Reads and validates the vocabulary document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let vocabulary = Self::from_json_str(&raw)?;
        let categories: HashSet<&str> = vocabulary
            .entries()
            .iter()
            .map(|e| e.category.as_str())
            .collect();
        info!(
            "Skill vocabulary loaded from {}: {} skills in {} categories",
            path.display(),
            vocabulary.len(),
            categories.len()
        );
        Ok(vocabulary)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, VocabularyError> {
        let document: VocabularyDocument = serde_json::from_str(raw)?;
        let by_category = match document {
            VocabularyDocument::Sectioned { it } => it,
            VocabularyDocument::Flat(map) => map,
        };

        let entries = by_category
            .into_iter()
            .flat_map(|(category, skills)| {
                skills.into_iter().map(move |skill| SkillVocabularyEntry {
                    name: skill.name.trim().to_string(),
                    category: category.clone(),
                    aliases: skill
                        .aliases
                        .into_iter()
                        .map(|a| a.trim().to_string())
                        .filter(|a| !a.is_empty())
                        .collect(),
                })
            })
            .collect();

        Self::from_entries(entries)
    }

    /// Builds the lookup tables, rejecting duplicate names and ambiguous aliases.
    pub fn from_entries(entries: Vec<SkillVocabularyEntry>) -> Result<Self, VocabularyError> {
        if entries.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_surface = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            if by_name.insert(entry.name.clone(), idx).is_some() {
                return Err(VocabularyError::DuplicateSkill(entry.name.clone()));
            }

            let surfaces = std::iter::once(&entry.name).chain(entry.aliases.iter());
            for surface in surfaces {
                let key = surface.to_lowercase();
                match by_surface.get(&key) {
                    Some(&other) if other != idx => {
                        let other: &SkillVocabularyEntry = &entries[other];
                        return Err(VocabularyError::DuplicateAlias {
                            alias: surface.clone(),
                            first: other.name.clone(),
                            second: entry.name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        by_surface.insert(key, idx);
                    }
                }
            }
        }

        Ok(Self {
            entries,
            by_name,
            by_surface,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[SkillVocabularyEntry] {
        &self.entries
    }

    /// Canonical names, in vocabulary order. This is the classifier's allowed output set.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Exact canonical-name lookup.
    pub fn get(&self, name: &str) -> Option<&SkillVocabularyEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Resolves a canonical name or any alias, case-insensitively.
    pub fn resolve(&self, surface: &str) -> Option<&SkillVocabularyEntry> {
        self.get(surface).or_else(|| {
            self.by_surface
                .get(&surface.trim().to_lowercase())
                .map(|&idx| &self.entries[idx])
        })
    }

    /// Every lower-cased surface form with its entry, for local phrase matching.
    pub fn surface_forms(&self) -> impl Iterator<Item = (&str, &SkillVocabularyEntry)> {
        self.by_surface
            .iter()
            .map(|(surface, &idx)| (surface.as_str(), &self.entries[idx]))
    }
}
