//! Speaker resolution: links each quote's speaker span to the merged entity
//! whose mentions cover it.

use strsim::levenshtein;

use crate::entities::{name_head, EntityMap};
use crate::gender::Gender;
use crate::nlp::{CharSpan, Document, Language, Relation};
use crate::quotes::Quote;
use crate::titles::TitleTaxonomy;

const INDEFINITE_ARTICLES: &[&str] = &["un", "une", "des", "a", "an"];

/// Largest edit distance at which a speaker string is taken to be an entity
/// representative outright.
const SELF_EVIDENT_DISTANCE: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct QuoteMerger {
    titles: TitleTaxonomy,
}

impl QuoteMerger {
    #[must_use]
    pub fn new(titles: TitleTaxonomy) -> Self {
        Self { titles }
    }

    /// Set `reference` (and, for French, `speaker_titles`) on every quote.
    /// Quotes already marked with an unknown speaker gender are dropped.
    #[must_use]
    pub fn merge(&self, doc: &Document, quotes: Vec<Quote>, entities: &EntityMap) -> Vec<Quote> {
        let total = quotes.len();
        let merged: Vec<Quote> = quotes
            .into_iter()
            .filter(|q| q.speaker_gender != Some(Gender::Unknown))
            .map(|q| self.resolve(doc, q, entities))
            .collect();
        tracing::debug!(
            quotes = total,
            kept = merged.len(),
            resolved = merged.iter().filter(|q| !q.reference.is_empty()).count(),
            "quote merge"
        );
        merged
    }

    fn resolve(&self, doc: &Document, mut quote: Quote, entities: &EntityMap) -> Quote {
        if doc.language() == Language::French {
            quote.speaker_titles.get_or_insert_with(Vec::new);
        }
        let speaker = match quote.speaker_span() {
            Ok(Some(span)) if !span.is_empty() => span,
            Ok(_) => {
                // Inherited floating references are names as written; prefer
                // the canonical form when it is obvious.
                if !quote.reference.is_empty() {
                    if let Some(rep) = self_evident(&quote.reference, entities) {
                        quote.reference = rep;
                    }
                }
                return quote;
            }
            Err(e) => {
                tracing::warn!(index = %quote.speaker_index, error = %e, "unparseable speaker index");
                return quote;
            }
        };

        let Some((head, heads)) = self.speaker_heads(doc, speaker) else {
            return quote;
        };

        if let Some(entity) = entities.iter().find(|e| e.covers(&heads)) {
            quote.reference.clone_from(&entity.representative);
            if doc.language() == Language::French {
                quote.speaker_titles = Some(entity.titles.iter().map(|t| capitalize(t)).collect());
            }
            return quote;
        }

        quote.reference = if is_indefinite(doc, head) {
            quote.speaker.clone()
        } else {
            self_evident(&quote.speaker, entities).unwrap_or_default()
        };
        quote
    }

    /// Head token of the speaker and the head spans to match: the head plus
    /// coordinated siblings inside the speaker span.
    fn speaker_heads(&self, doc: &Document, speaker: CharSpan) -> Option<(usize, Vec<CharSpan>)> {
        let range = doc.token_range(speaker);
        if range.is_empty() {
            return None;
        }
        let head = name_head(doc, range.clone(), &self.titles);
        let mut heads = vec![doc.token(head).span()];
        heads.extend(
            doc.children_with(head, Relation::Conjunct)
                .filter(|c| range.contains(c))
                .map(|c| doc.token(c).span()),
        );
        Some((head, heads))
    }
}

fn is_indefinite(doc: &Document, head: usize) -> bool {
    doc.children_with(head, Relation::Determiner).any(|d| {
        let tok = doc.token(d);
        INDEFINITE_ARTICLES.contains(&tok.lower().as_str())
            || tok.morph_value("Definite") == Some("Ind")
    })
}

fn self_evident(text: &str, entities: &EntityMap) -> Option<String> {
    let lower = text.to_lowercase();
    entities
        .representatives()
        .find(|rep| levenshtein(&rep.to_lowercase(), &lower) <= SELF_EVIDENT_DISTANCE)
        .map(String::from)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
