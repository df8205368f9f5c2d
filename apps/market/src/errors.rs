use thiserror::Error;

use crate::vocabulary::VocabularyError;

/// Startup errors that abort the process.
///
/// Everything past startup is recoverable and ends in a `MarketProfile`,
/// so nothing in the pipeline itself returns this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Skill vocabulary unavailable: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("Configuration error: {0}")]
    Config(String),
}
