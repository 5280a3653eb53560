//! Article records as read from and written back to the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::quotes::Quote;

pub const MODIFIER_ANNOTATOR: &str = "entity_gender_annotator";
pub const MODIFIER_TOO_LARGE: &str = "max_body_len";

/// Keys written by the annotator. Removed from a record before it is
/// re-annotated or skipped.
pub const ANALYTIC_FIELDS: &[&str] = &[
    "authorsAll",
    "authorsFemale",
    "authorsMale",
    "authorsUnknown",
    "authorsEditorial",
    "authorsFemaleCount",
    "authorsMaleCount",
    "authorsUnknownCount",
    "authorsEditorialCount",
    "people",
    "peopleFemale",
    "peopleMale",
    "peopleUnknown",
    "peopleEditorial",
    "peopleCount",
    "peopleFemaleCount",
    "peopleMaleCount",
    "peopleUnknownCount",
    "peopleEditorialCount",
    "sources",
    "sourcesFemale",
    "sourcesMale",
    "sourcesUnknown",
    "sourcesEditorial",
    "sourcesCount",
    "sourcesFemaleCount",
    "sourcesMaleCount",
    "sourcesUnknownCount",
    "sourcesEditorialCount",
    "quotesUpdated",
    "quoteCount",
    "speakersNotCountedInSources",
    "lastModifier",
    "lastModified",
];

/// An article as scraped. Fields the pipeline does not read are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, rename = "publishedAt", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    #[must_use]
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            authors: Vec::new(),
            published_at: None,
            outlet: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    #[must_use]
    pub fn with_outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }

    #[must_use]
    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Modifier of the last annotation run, if any.
    #[must_use]
    pub fn last_modifier(&self) -> Option<&str> {
        self.extra.get("lastModifier").and_then(Value::as_str)
    }

    pub fn clear_analysis(&mut self) {
        for field in ANALYTIC_FIELDS {
            self.extra.remove(*field);
        }
    }
}

/// A list of names and its gendered partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenderSplit {
    pub all: Vec<String>,
    pub female: Vec<String>,
    pub male: Vec<String>,
    pub unknown: Vec<String>,
    pub editorial: Vec<String>,
}

/// Analytic fields of an annotated article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub authors_all: Vec<String>,
    pub authors_female: Vec<String>,
    pub authors_male: Vec<String>,
    pub authors_unknown: Vec<String>,
    pub authors_editorial: Vec<String>,
    pub authors_female_count: usize,
    pub authors_male_count: usize,
    pub authors_unknown_count: usize,
    pub authors_editorial_count: usize,

    pub people: Vec<String>,
    pub people_female: Vec<String>,
    pub people_male: Vec<String>,
    pub people_unknown: Vec<String>,
    pub people_editorial: Vec<String>,
    pub people_count: usize,
    pub people_female_count: usize,
    pub people_male_count: usize,
    pub people_unknown_count: usize,
    pub people_editorial_count: usize,

    pub sources: Vec<String>,
    pub sources_female: Vec<String>,
    pub sources_male: Vec<String>,
    pub sources_unknown: Vec<String>,
    pub sources_editorial: Vec<String>,
    pub sources_count: usize,
    pub sources_female_count: usize,
    pub sources_male_count: usize,
    pub sources_unknown_count: usize,
    pub sources_editorial_count: usize,

    pub quotes_updated: Vec<Quote>,
    pub quote_count: usize,
    pub speakers_not_counted_in_sources: usize,
}

impl Annotation {
    /// Fill every list and count from the three partitions.
    #[must_use]
    pub fn build(
        authors: GenderSplit,
        people_split: GenderSplit,
        sources_split: GenderSplit,
        quotes: Vec<Quote>,
        speakers_not_counted_in_sources: usize,
    ) -> Self {
        Self {
            authors_all: authors.all,
            authors_female_count: authors.female.len(),
            authors_male_count: authors.male.len(),
            authors_unknown_count: authors.unknown.len(),
            authors_editorial_count: authors.editorial.len(),
            authors_female: authors.female,
            authors_male: authors.male,
            authors_unknown: authors.unknown,
            authors_editorial: authors.editorial,

            people_count: people_split.all.len(),
            people: people_split.all,
            people_female_count: people_split.female.len(),
            people_male_count: people_split.male.len(),
            people_unknown_count: people_split.unknown.len(),
            people_editorial_count: people_split.editorial.len(),
            people_female: people_split.female,
            people_male: people_split.male,
            people_unknown: people_split.unknown,
            people_editorial: people_split.editorial,

            sources_count: sources_split.all.len(),
            sources: sources_split.all,
            sources_female_count: sources_split.female.len(),
            sources_male_count: sources_split.male.len(),
            sources_unknown_count: sources_split.unknown.len(),
            sources_editorial_count: sources_split.editorial.len(),
            sources_female: sources_split.female,
            sources_male: sources_split.male,
            sources_unknown: sources_split.unknown,
            sources_editorial: sources_split.editorial,

            quote_count: quotes.len(),
            quotes_updated: quotes,
            speakers_not_counted_in_sources,
        }
    }
}

/// The record handed back for writeback. A skipped article carries no
/// annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedArticle {
    #[serde(flatten)]
    pub article: Article,
    #[serde(flatten)]
    pub annotation: Option<Annotation>,
    #[serde(rename = "lastModifier")]
    pub last_modifier: String,
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
}

impl AnnotatedArticle {
    #[must_use]
    pub fn annotated(mut article: Article, annotation: Annotation) -> Self {
        article.clear_analysis();
        Self {
            article,
            annotation: Some(annotation),
            last_modifier: MODIFIER_ANNOTATOR.to_string(),
            last_modified: Utc::now(),
        }
    }

    #[must_use]
    pub fn skipped(mut article: Article) -> Self {
        article.clear_analysis();
        Self {
            article,
            annotation: None,
            last_modifier: MODIFIER_TOO_LARGE.to_string(),
            last_modified: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.last_modifier == MODIFIER_TOO_LARGE
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.article.id
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
