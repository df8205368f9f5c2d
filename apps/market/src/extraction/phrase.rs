//! Local phrase-matching classifier. No network, deterministic.
//!
//! Canonical names and aliases are tokenized the same way as posting text and
//! matched as case-insensitive token n-grams, longest match first. Symbols that
//! carry meaning in skill names (`C++`, `C#`, `Node.js`, `.NET`) stay inside tokens.
//!
//! With the ambiguous-token filter enabled, bare short names like "Go", "R" or
//! "C" only count when a programming-context word sits nearby.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::extraction::{ClassifyError, SkillClassifier};
use crate::vocabulary::SkillVocabulary;

/// Single-token surface forms that are ordinary words or letters outside a tech context.
const AMBIGUOUS_TOKENS: &[&str] = &["c", "r", "go", "d", "v"];

/// Words that, within `CONTEXT_WINDOW` tokens, confirm an ambiguous match.
const CONTEXT_WORDS: &[&str] = &[
    "programming",
    "language",
    "languages",
    "developer",
    "developers",
    "development",
    "engineer",
    "code",
    "coding",
    "scripting",
    "proficiency",
    "proficient",
    "python",
    "java",
    "c++",
    "c#",
    "rust",
    "sql",
    "scala",
    "kotlin",
    "matlab",
    "julia",
    "sas",
];

const CONTEXT_WINDOW: usize = 3;

pub struct PhraseClassifier {
    phrases: HashMap<Vec<String>, String>,
    max_phrase_len: usize,
    strict_ambiguous: bool,
}

impl PhraseClassifier {
    pub fn new(vocabulary: &SkillVocabulary) -> Self {
        let mut phrases = HashMap::new();
        let mut max_phrase_len = 1;

        for (surface, entry) in vocabulary.surface_forms() {
            let tokens = tokenize(surface);
            if tokens.is_empty() {
                continue;
            }
            max_phrase_len = max_phrase_len.max(tokens.len());
            phrases.insert(tokens, entry.name.clone());
        }

        Self {
            phrases,
            max_phrase_len,
            strict_ambiguous: false,
        }
    }

    /// Enables the ambiguous-token context check.
    pub fn with_strict_ambiguous(mut self, strict: bool) -> Self {
        self.strict_ambiguous = strict;
        self
    }

    /// Canonical names found in `text`, in order of first appearance.
    pub fn match_text(&self, text: &str) -> Vec<String> {
        let tokens = tokenize(text);
        let mut found = Vec::new();
        let mut seen = HashSet::new();

        let mut i = 0;
        while i < tokens.len() {
            let longest = (1..=self.max_phrase_len.min(tokens.len() - i))
                .rev()
                .find_map(|n| self.phrases.get(&tokens[i..i + n]).map(|name| (n, name)));

            match longest {
                Some((n, name)) => {
                    let keep = !(self.strict_ambiguous && n == 1)
                        || !is_ambiguous(&tokens[i])
                        || has_context(&tokens, i);
                    if keep && seen.insert(name.clone()) {
                        found.push(name.clone());
                    }
                    i += n;
                }
                None => i += 1,
            }
        }

        found
    }
}

#[async_trait]
impl SkillClassifier for PhraseClassifier {
    fn backend(&self) -> &'static str {
        "phrase"
    }

    async fn classify(
        &self,
        text: &str,
        allowed: &[String],
    ) -> Result<Vec<String>, ClassifyError> {
        let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
        Ok(self
            .match_text(text)
            .into_iter()
            .filter(|n| allowed.contains(n.as_str()))
            .collect())
    }
}

/// Lower-cased tokens. Trailing dots (sentence ends) are dropped, inner and leading dots kept.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|t| t.trim_end_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_ambiguous(token: &str) -> bool {
    AMBIGUOUS_TOKENS.contains(&token)
}

fn has_context(tokens: &[String], at: usize) -> bool {
    let start = at.saturating_sub(CONTEXT_WINDOW);
    let end = (at + CONTEXT_WINDOW + 1).min(tokens.len());
    (start..end)
        .filter(|&j| j != at)
        .any(|j| CONTEXT_WORDS.contains(&tokens[j].as_str()))
}
