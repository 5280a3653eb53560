use thiserror::Error;

use crate::config::ConfigError;
use crate::gender::GenderError;
use crate::nlp::{ParseError, SpanError};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Body too large: {length} characters (max: {max})")]
    InputTooLarge { length: usize, max: usize },

    #[error("Parser failure: {0}")]
    Parser(#[from] ParseError),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Malformed span: {0}")]
    MalformedSpan(#[from] SpanError),

    #[error("Gender service unavailable: {0}")]
    GenderServiceUnavailable(#[from] GenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the article should be written back with the skip marker
    /// instead of being reported as a failure.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::InputTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
