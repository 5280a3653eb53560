//! Gender lookup: the value type, the oracle seam the annotator calls, the
//! layered cache behind the gender service and the HTTP clients on both
//! sides of it.

mod client;
mod genderapi;
mod resolver;
mod store;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::GenderServiceClient;
pub use genderapi::{ApiAnswer, ExternalGenderApi, GenderApiClient};
pub use resolver::LayeredGenderResolver;
pub use store::{CacheLayer, GenderStore, MemoryGenderStore, SqliteGenderStore, UpsertOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Unknown,
    Editorial,
}

impl Gender {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Unknown => "unknown",
            Self::Editorial => "editorial",
        }
    }

    /// Female or male.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Female | Self::Male)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = GenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "female" | "f" => Ok(Self::Female),
            "male" | "m" => Ok(Self::Male),
            "unknown" | "" => Ok(Self::Unknown),
            "editorial" => Ok(Self::Editorial),
            other => Err(GenderError::InvalidValue(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gender service returned status {0}")]
    Status(u16),
    #[error("Gender service returned an empty response")]
    EmptyResponse,
    #[error("Invalid gender value: {0}")]
    InvalidValue(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Cache error: {0}")]
    Cache(#[from] sqlx::Error),
    #[error("External API token is not configured")]
    MissingToken,
}

pub type GenderResult<T> = Result<T, GenderError>;

/// Answers a batch of names with one gender each. Names missing from the
/// answer are treated as unknown by callers.
#[async_trait::async_trait]
pub trait GenderOracle: Send + Sync {
    async fn genders(&self, names: &[String]) -> GenderResult<HashMap<String, Gender>>;
}

const MIN_NAME_WORDS: usize = 2;
const MAX_NAME_WORDS: usize = 5;

/// Decisions that need no lookup: pronouns, editorial bylines and names of
/// implausible length.
#[must_use]
pub fn hard_rule(name: &str) -> Option<Gender> {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "he" => return Some(Gender::Male),
        "she" => return Some(Gender::Female),
        _ => {}
    }
    if lower.contains("editorial") {
        return Some(Gender::Editorial);
    }
    let words = lower.split_whitespace().count();
    (!(MIN_NAME_WORDS..=MAX_NAME_WORDS).contains(&words)).then_some(Gender::Unknown)
}

/// First word of a name, lowercased, as used for first-name caches.
#[must_use]
pub fn first_name(name: &str) -> Option<String> {
    name.split_whitespace().next().map(str::to_lowercase)
}
