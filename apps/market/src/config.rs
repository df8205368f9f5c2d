use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::cache::redis_store::DEFAULT_TTL_SECS;
use crate::extraction::DEFAULT_MAX_CONCURRENT;
use crate::llm_client::GROQ_API_URL;

/// Which classifier backs skill extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Llm,
    Phrase,
}

impl FromStr for ExtractorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llm" => Ok(ExtractorKind::Llm),
            "phrase" => Ok(ExtractorKind::Phrase),
            other => bail!("EXTRACTOR must be 'llm' or 'phrase', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub skills_path: String,
    pub extractor: ExtractorKind,
    /// Required when `extractor` is `Llm`.
    pub groq_api_key: Option<String>,
    pub groq_api_url: String,
    pub rapidapi_key: Option<String>,
    pub serpapi_key: Option<String>,
    /// Google Jobs `hl` for SerpAPI searches.
    pub serpapi_language: String,
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub max_concurrent_extractions: usize,
    pub extraction_max_attempts: u32,
    pub extraction_backoff_secs: u64,
    pub strict_ambiguous_skills: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let extractor: ExtractorKind = env_or("EXTRACTOR", ExtractorKind::Llm)?;
        let groq_api_key = match extractor {
            ExtractorKind::Llm => Some(require_env("GROQ_API_KEY")?),
            ExtractorKind::Phrase => optional_env("GROQ_API_KEY"),
        };

        Ok(Config {
            skills_path: std::env::var("SKILLS_PATH")
                .unwrap_or_else(|_| "data/skills.json".to_string()),
            extractor,
            groq_api_key,
            groq_api_url: std::env::var("GROQ_API_URL")
                .unwrap_or_else(|_| GROQ_API_URL.to_string()),
            rapidapi_key: optional_env("RAPIDAPI_KEY"),
            serpapi_key: optional_env("SERPAPI_KEY"),
            serpapi_language: optional_env("SERPAPI_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            redis_url: optional_env("REDIS_URL"),
            cache_ttl_secs: env_or("CACHE_TTL_SECS", DEFAULT_TTL_SECS)?,
            max_concurrent_extractions: env_or(
                "MAX_CONCURRENT_EXTRACTIONS",
                DEFAULT_MAX_CONCURRENT,
            )?,
            extraction_max_attempts: env_or("EXTRACTION_MAX_ATTEMPTS", 3)?,
            extraction_backoff_secs: env_or("EXTRACTION_BACKOFF_SECS", 15)?,
            strict_ambiguous_skills: env_or("STRICT_AMBIGUOUS_SKILLS", false)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Set and non-blank, otherwise `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}
