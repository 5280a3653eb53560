//! Word lists consumed by the extractors and the author cleaner.
//!
//! Each list has a built-in default and can be replaced by a file named in
//! the configuration.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::config::ConfigError;
use crate::nlp::{Language, Token};

const QUOTE_VERBS_EN: &str = include_str!("../resources/quote_verbs_en.txt");
const QUOTE_VERBS_FR: &str = include_str!("../resources/quote_verbs_fr.txt");
const AUTHOR_BLOCKLIST: &str = include_str!("../resources/author_blocklist.txt");

fn read_list(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn lines(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_lowercase)
}

/// Lowercased reporting verbs.
#[derive(Debug, Clone, Default)]
pub struct QuoteVerbs {
    verbs: HashSet<String>,
}

impl QuoteVerbs {
    #[must_use]
    pub fn builtin(language: Language) -> Self {
        let content = match language {
            Language::English => QUOTE_VERBS_EN,
            Language::French => QUOTE_VERBS_FR,
        };
        Self::parse(content)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::parse(&read_list(path)?))
    }

    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self {
            verbs: lines(content).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.verbs.contains(&word.to_lowercase())
    }

    /// Lemma or lowercased surface form is a reporting verb.
    #[must_use]
    pub fn matches(&self, token: &Token) -> bool {
        self.verbs.contains(&token.lemma_lower()) || self.verbs.contains(&token.lower())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}

/// Author strings that are outlets or desks rather than people. Entries match
/// case-insensitively as whole-word phrases.
#[derive(Debug, Clone, Default)]
pub struct AuthorBlocklist {
    pattern: Option<Regex>,
}

impl AuthorBlocklist {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(AUTHOR_BLOCKLIST)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse(&read_list(path)?)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let phrases: Vec<String> = lines(content)
            .map(|l| {
                l.split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .filter(|p| !p.is_empty())
            .collect();
        if phrases.is_empty() {
            return Ok(Self::default());
        }
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", phrases.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    #[must_use]
    pub fn is_blocked(&self, author: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(author))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PatternSpec {
    Phrase(String),
    Tokens(Vec<TokenSpec>),
}

#[derive(Debug, Deserialize)]
struct TokenSpec {
    #[serde(alias = "LOWER", alias = "ORTH", alias = "TEXT")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawNamePattern {
    label: String,
    pattern: PatternSpec,
}

/// A custom entity pattern matched case-insensitively against token text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    pub label: String,
    words: Vec<String>,
}

impl NamePattern {
    #[must_use]
    pub fn person(phrase: &str) -> Self {
        Self {
            label: "PERSON".to_string(),
            words: phrase.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }
}

impl From<RawNamePattern> for NamePattern {
    fn from(raw: RawNamePattern) -> Self {
        let words = match raw.pattern {
            PatternSpec::Phrase(p) => p.split_whitespace().map(str::to_lowercase).collect(),
            PatternSpec::Tokens(t) => t.into_iter().map(|s| s.value.to_lowercase()).collect(),
        };
        Self {
            label: raw.label,
            words,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamePatterns {
    patterns: Vec<NamePattern>,
}

impl NamePatterns {
    #[must_use]
    pub fn from_patterns(patterns: Vec<NamePattern>) -> Self {
        Self { patterns }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse_jsonl(&read_list(path)?)
    }

    /// One JSON object per line: `{"label": "PERSON", "pattern": "Jean Marais"}`
    /// or with a token list `[{"LOWER": "jean"}, {"LOWER": "marais"}]`.
    pub fn parse_jsonl(content: &str) -> Result<Self, ConfigError> {
        let mut patterns = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let raw: RawNamePattern =
                serde_json::from_str(line).map_err(|source| ConfigError::NamePattern {
                    line: lineno + 1,
                    source,
                })?;
            patterns.push(NamePattern::from(raw));
        }
        Ok(Self { patterns })
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamePattern> {
        self.patterns.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
