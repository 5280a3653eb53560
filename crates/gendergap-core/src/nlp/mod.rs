mod document;
mod parser;
mod preprocess;
mod relation;
mod span;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};

pub use document::{
    CorefChain, Document, NamedEntity, RawDocument, RawEntity, RawSpan, RawToken, Token,
};
pub use parser::{
    apply_name_patterns, DocumentParser, HttpDocumentParser, ParseError, ParseResult,
    PatternParser,
};
pub use preprocess::{preprocess, preprocess_with, PreprocessOptions, PreprocessedText};
pub use relation::{Pos, Relation};
pub use span::{index_or_empty, CharSpan, SpanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "fr")]
    French,
}

impl Language {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::French => "fr",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = crate::config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "fr" | "french" => Ok(Self::French),
            _ => Err(crate::config::ConfigError::UnknownLanguage(s.to_string())),
        }
    }
}
