//! Quote extraction: record types shared by the English and French
//! extractors, quote-type labelling and deduplication.

mod english;
mod french;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::gender::Gender;
use crate::nlp::{index_or_empty, CharSpan, Document, Language, SpanError};

pub use english::EnglishQuoteExtractor;
pub use french::FrenchQuoteExtractor;

/// Quote-type labels that are not position codes.
pub mod kind {
    pub const ACCORDING_TO: &str = "AccordingTo";
    pub const HEURISTIC: &str = "Heuristic";
    pub const FLOATING: &str = "QCQ";
    pub const INDIRECT: &str = "Indirect";
    pub const SELON: &str = "selon";
    pub const DIRECT: &str = "Direct";
    pub const ONE_SIDED: &str = "OneSided";
}

/// Position codes of a well-formed quote with explicit speaker and verb; the
/// sentence after such a quote may open a floating quote.
pub const FLOATING_ANCHORS: &[&str] = &["QCQSV", "QCQVS", "CSV"];

/// Quote record in its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub speaker: String,
    pub speaker_index: String,
    pub quote: String,
    pub quote_index: String,
    pub verb: String,
    pub verb_index: String,
    pub quote_token_count: usize,
    pub quote_type: String,
    pub is_floating_quote: bool,
    #[serde(default)]
    pub reference: String,
    /// French only. An empty list travels as `""`.
    #[serde(default, with = "titles_field", skip_serializing_if = "Option::is_none")]
    pub speaker_titles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_gender: Option<Gender>,
}

mod titles_field {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Titles(Vec<String>),
        Empty(String),
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(titles: &Option<Vec<String>>, s: S) -> Result<S::Ok, S::Error> {
        match titles {
            Some(t) if !t.is_empty() => t.serialize(s),
            _ => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        match Option::<Wire>::deserialize(d)? {
            None => Ok(None),
            Some(Wire::Titles(t)) => Ok(Some(t)),
            Some(Wire::Empty(s)) if s.is_empty() => Ok(Some(Vec::new())),
            Some(Wire::Empty(s)) => Err(D::Error::custom(format!(
                "speaker_titles must be a list or \"\", got {s:?}"
            ))),
        }
    }
}

impl Quote {
    pub fn quote_span(&self) -> Result<CharSpan, SpanError> {
        CharSpan::parse_index(&self.quote_index)
    }

    pub fn speaker_span(&self) -> Result<Option<CharSpan>, SpanError> {
        parse_optional(&self.speaker_index)
    }

    pub fn verb_span(&self) -> Result<Option<CharSpan>, SpanError> {
        parse_optional(&self.verb_index)
    }

    /// Check every index against the text length. The quote index must be
    /// non-empty and the speaker must not overlap the quote.
    pub fn validate(&self, text_len: usize) -> Result<(), SpanError> {
        let quote = self.quote_span()?;
        CharSpan::checked(quote.start, quote.end, text_len)?;
        if quote.is_empty() {
            return Err(SpanError::Unparseable(self.quote_index.clone()));
        }
        if let Some(speaker) = self.speaker_span()? {
            CharSpan::checked(speaker.start, speaker.end, text_len)?;
            if speaker.overlaps(&quote) {
                return Err(SpanError::Unparseable(self.speaker_index.clone()));
            }
        }
        if let Some(verb) = self.verb_span()? {
            CharSpan::checked(verb.start, verb.end, text_len)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn has_speaker(&self) -> bool {
        !self.speaker_index.is_empty()
    }
}

fn parse_optional(index: &str) -> Result<Option<CharSpan>, SpanError> {
    if index.is_empty() {
        Ok(None)
    } else {
        CharSpan::parse_index(index).map(Some)
    }
}

/// A quote as found by an extractor pass, before rendering to text.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub quote: CharSpan,
    pub speaker: Option<CharSpan>,
    pub verb: Option<CharSpan>,
    pub quote_type: String,
    pub floating: bool,
    pub token_count: usize,
    pub verb_text: Option<String>,
    pub speaker_text: Option<String>,
    pub reference: Option<String>,
    pub speaker_gender: Option<Gender>,
}

impl Candidate {
    pub fn new(quote: CharSpan, quote_type: impl Into<String>) -> Self {
        Self {
            quote,
            speaker: None,
            verb: None,
            quote_type: quote_type.into(),
            floating: false,
            token_count: 0,
            verb_text: None,
            speaker_text: None,
            reference: None,
            speaker_gender: None,
        }
    }

    #[must_use]
    pub fn with_speaker(mut self, speaker: Option<CharSpan>) -> Self {
        self.speaker = speaker;
        self
    }

    #[must_use]
    pub fn with_verb(mut self, verb: Option<CharSpan>) -> Self {
        self.verb = verb;
        self
    }

    #[must_use]
    pub fn floating(mut self) -> Self {
        self.floating = true;
        self
    }

    pub fn render(self, doc: &Document) -> Quote {
        let token_count = if self.token_count > 0 {
            self.token_count
        } else {
            doc.token_range(self.quote).len()
        };
        Quote {
            speaker: self.speaker_text.unwrap_or_else(|| text_of(doc, self.speaker)),
            speaker_index: index_or_empty(self.speaker),
            quote: doc.slice(self.quote).to_string(),
            quote_index: self.quote.to_index(),
            verb: self.verb_text.unwrap_or_else(|| text_of(doc, self.verb)),
            verb_index: index_or_empty(self.verb),
            quote_token_count: token_count,
            quote_type: self.quote_type,
            is_floating_quote: self.floating,
            reference: self.reference.unwrap_or_default(),
            speaker_titles: None,
            speaker_gender: self.speaker_gender,
        }
    }
}

/// Drop punctuation from both ends of a token range. With `keep_terminal`, a
/// final sentence terminal right after a word survives.
pub(crate) fn trim_punct(
    doc: &Document,
    range: Range<usize>,
    keep_terminal: bool,
) -> Range<usize> {
    let (mut start, mut end) = (range.start, range.end);
    while start < end && doc.token(start).is_punct() {
        start += 1;
    }
    while end > start {
        let last = doc.token(end - 1);
        if !last.is_punct() {
            break;
        }
        if keep_terminal
            && last.is_sentence_terminal()
            && end - 1 > start
            && !doc.token(end - 2).is_punct()
        {
            break;
        }
        end -= 1;
    }
    start..end
}

fn text_of(doc: &Document, span: Option<CharSpan>) -> String {
    span.map(|s| doc.slice(s).to_string()).unwrap_or_default()
}

/// Relative-position code: the letters Q (quote marks), C (content),
/// V (verb) and S (speaker) sorted by the midpoint of what they label.
/// Without both quote marks only C, V and S take part.
#[must_use]
pub fn position_code(
    marks: Option<(CharSpan, CharSpan)>,
    content: CharSpan,
    verb: Option<CharSpan>,
    speaker: Option<CharSpan>,
) -> String {
    let mut letters: Vec<(f64, char)> = vec![(content.midpoint(), 'C')];
    if let Some((open, close)) = marks {
        letters.push((open.midpoint(), 'Q'));
        letters.push((close.midpoint(), 'Q'));
    }
    if let Some(v) = verb {
        letters.push((v.midpoint(), 'V'));
    }
    if let Some(s) = speaker {
        letters.push((s.midpoint(), 'S'));
    }
    letters.sort_by(|a, b| a.0.total_cmp(&b.0));
    letters.into_iter().map(|(_, c)| c).collect()
}

/// Codes opening and closing on a quote mark belong to floating quotes.
#[must_use]
pub fn is_enclosed_code(code: &str) -> bool {
    code.len() > 1 && code.starts_with('Q') && code.ends_with('Q')
}

/// Global English deduplication. Heuristic and floating quotes need at least
/// [`MIN_UNATTRIBUTED_WORDS`] words; then, in insertion order, a quote is
/// kept only if it overlaps no quote kept before it. The result is sorted by
/// position.
#[must_use]
pub fn dedupe(quotes: Vec<Quote>) -> Vec<Quote> {
    let mut kept: Vec<(CharSpan, Quote)> = Vec::with_capacity(quotes.len());
    for quote in quotes {
        let Ok(span) = quote.quote_span() else {
            continue;
        };
        if needs_word_minimum(&quote)
            && quote.quote.split_whitespace().count() < MIN_UNATTRIBUTED_WORDS
        {
            continue;
        }
        if kept.iter().any(|(k, _)| k.overlaps(&span)) {
            continue;
        }
        kept.push((span, quote));
    }
    kept.sort_by_key(|(span, _)| *span);
    kept.into_iter().map(|(_, q)| q).collect()
}

pub const MIN_UNATTRIBUTED_WORDS: usize = 4;

/// Syntactically attributed quotes are exempt from the word minimum.
fn needs_word_minimum(quote: &Quote) -> bool {
    quote.quote_type == kind::HEURISTIC || quote.is_floating_quote
}

/// Quote extraction for one language.
pub trait QuoteExtractor: Send + Sync {
    fn language(&self) -> Language;

    /// Quotes of a parsed document, in document order, non-overlapping.
    fn extract(&self, doc: &Document) -> Vec<Quote>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(index: (usize, usize), text: &str, ty: &str, speaker: bool) -> Quote {
        Quote {
            speaker: if speaker { "Jane".into() } else { String::new() },
            speaker_index: if speaker { "(100,104)".into() } else { String::new() },
            quote: text.into(),
            quote_index: CharSpan::new(index.0, index.1).to_index(),
            verb: String::new(),
            verb_index: String::new(),
            quote_token_count: text.split_whitespace().count(),
            quote_type: ty.into(),
            is_floating_quote: false,
            reference: String::new(),
            speaker_titles: None,
            speaker_gender: None,
        }
    }

    #[test]
    fn test_position_code_orders_by_midpoint() {
        let content = CharSpan::new(18, 41);
        let verb = Some(CharSpan::new(13, 17));
        let speaker = Some(CharSpan::new(0, 12));
        assert_eq!(position_code(None, content, verb, speaker), "SVC");

        let marks = Some((CharSpan::new(0, 1), CharSpan::new(13, 14)));
        let code = position_code(
            marks,
            CharSpan::new(1, 12),
            Some(CharSpan::new(15, 19)),
            Some(CharSpan::new(20, 30)),
        );
        assert_eq!(code, "QCQVS");
        assert!(!is_enclosed_code(&code));
        assert!(is_enclosed_code("QCQ"));
        assert!(!is_enclosed_code("Q"));
    }

    #[test]
    fn test_dedupe_keeps_first_of_overlapping() {
        let quotes = vec![
            quote((10, 40), "first quote with words", "SVC", true),
            quote((30, 60), "second overlapping quote here", "CSV", true),
            quote((0, 8), "early one is kept", "SVC", true),
        ];
        let kept = dedupe(quotes);
        let spans: Vec<&str> = kept.iter().map(|q| q.quote_index.as_str()).collect();
        assert_eq!(spans, vec!["(0,8)", "(10,40)"]);
    }

    #[test]
    fn test_dedupe_word_minimum_only_for_unattributed() {
        let quotes = vec![
            quote((0, 11), "We will act", "QCQVS", true),
            quote((20, 35), "too short now", kind::HEURISTIC, false),
        ];
        let kept = dedupe(quotes);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].quote, "We will act");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let quotes = vec![
            quote((10, 40), "first quote with words", "SVC", true),
            quote((30, 60), "second overlapping quote here", "CSV", true),
            quote((70, 90), "a b c", kind::HEURISTIC, false),
        ];
        let once = dedupe(quotes);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_validate_rejects_bad_indexes() {
        let mut q = quote((0, 10), "0123456789", "SVC", false);
        assert!(q.validate(10).is_ok());
        assert!(q.validate(5).is_err());
        q.speaker_index = "(5,12)".into();
        assert!(q.validate(20).is_err());
        q.speaker_index = "(12,15)".into();
        assert!(q.validate(20).is_ok());
        q.quote_index = String::new();
        assert!(q.validate(20).is_err());
    }

    #[test]
    fn test_speaker_titles_wire_form() {
        let mut q = quote((0, 10), "0123456789", "SVC", true);
        let json = serde_json::to_value(&q).unwrap();
        assert!(json.get("speaker_titles").is_none());

        q.speaker_titles = Some(Vec::new());
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["speaker_titles"], "");
        let back: Quote = serde_json::from_value(json).unwrap();
        assert_eq!(back.speaker_titles, Some(Vec::new()));

        q.speaker_titles = Some(vec!["Mme".into()]);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["speaker_titles"], serde_json::json!(["Mme"]));
        let back: Quote = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, q);

        let mut bad = json;
        bad["speaker_titles"] = "Mme".into();
        assert!(serde_json::from_value::<Quote>(bad).is_err());
    }
}
