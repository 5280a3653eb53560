use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::document::{Document, NamedEntity, RawDocument};
use super::preprocess::PreprocessedText;
use super::span::SpanError;
use crate::lexicon::NamePatterns;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parser service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parser service returned status {0}")]
    Status(u16),
    #[error("Parser returned text that differs from its input")]
    TextMismatch,
    #[error("Token {token} has out-of-range head {head}")]
    InvalidHead { token: usize, head: usize },
    #[error("Invalid token range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
    #[error("Malformed span: {0}")]
    MalformedSpan(#[from] SpanError),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Produces a parsed [`Document`] from preprocessed text. The parser is the
/// only slow step of the per-article pipeline.
#[async_trait::async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, text: &PreprocessedText) -> ParseResult<Document>;
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
    lang: &'a str,
}

/// Client for a parser service that answers `POST {url}` with a
/// [`RawDocument`].
pub struct HttpDocumentParser {
    client: reqwest::Client,
    url: String,
}

impl HttpDocumentParser {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ParseResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl DocumentParser for HttpDocumentParser {
    async fn parse(&self, text: &PreprocessedText) -> ParseResult<Document> {
        let response = self
            .client
            .post(&self.url)
            .json(&ParseRequest {
                text: &text.text,
                lang: text.language.code(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParseError::Status(status.as_u16()));
        }

        let raw: RawDocument = response.json().await?;
        Document::from_raw(raw, text)
    }
}

/// Wraps another parser and adds PERSON entities for configured name
/// patterns, replacing any overlapping entity the model produced.
pub struct PatternParser {
    inner: Box<dyn DocumentParser>,
    patterns: NamePatterns,
}

impl PatternParser {
    #[must_use]
    pub fn new(inner: Box<dyn DocumentParser>, patterns: NamePatterns) -> Self {
        Self { inner, patterns }
    }
}

#[async_trait::async_trait]
impl DocumentParser for PatternParser {
    async fn parse(&self, text: &PreprocessedText) -> ParseResult<Document> {
        let mut doc = self.inner.parse(text).await?;
        apply_name_patterns(&mut doc, &self.patterns);
        Ok(doc)
    }
}

pub fn apply_name_patterns(doc: &mut Document, patterns: &NamePatterns) {
    if patterns.is_empty() {
        return;
    }

    let lowered: Vec<String> = doc.tokens().iter().map(super::Token::lower).collect();
    let mut added: Vec<NamedEntity> = Vec::new();

    for pattern in patterns.iter() {
        let words = pattern.words();
        if words.is_empty() || words.len() > lowered.len() {
            continue;
        }
        for start in 0..=lowered.len() - words.len() {
            let end = start + words.len();
            let matches = lowered[start..end].iter().zip(words).all(|(a, b)| a == b);
            let taken = added.iter().any(|e| e.start < end && start < e.end);
            if matches && !taken {
                added.push(NamedEntity {
                    start,
                    end,
                    label: pattern.label.clone(),
                });
            }
        }
    }

    if added.is_empty() {
        return;
    }

    tracing::debug!(count = added.len(), "name patterns matched");
    let mut ents: Vec<NamedEntity> = doc
        .ents()
        .iter()
        .filter(|e| !added.iter().any(|a| a.start < e.end && e.start < a.end))
        .cloned()
        .collect();
    ents.extend(added);
    ents.sort_by_key(|e| (e.start, e.end));
    doc.set_ents(ents);
}
