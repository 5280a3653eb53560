use std::ops::Range;

use super::{
    dedupe, is_enclosed_code, kind, position_code, trim_punct, Candidate, Quote,
    QuoteExtractor, FLOATING_ANCHORS,
};
use crate::lexicon::QuoteVerbs;
use crate::nlp::{CharSpan, Document, Language, Pos, Relation};

pub const DEFAULT_HEURISTIC_WINDOW: usize = 4;

/// Enclosed spans shorter or longer than this are not heuristic quotes.
const HEURISTIC_TOKENS: Range<usize> = 7..100;

/// Sentences after the opening one a floating quote may run over.
const FLOATING_LOOKAHEAD: usize = 4;

const REJECTED_SPEAKERS: &[&str] = &["i", "we"];

/// Three passes, unioned then deduplicated: syntactic quotes (clausal
/// complements of reporting verbs and "according to"), floating quotes that
/// continue an attributed quote, and quote-mark heuristics.
#[derive(Debug, Clone)]
pub struct EnglishQuoteExtractor {
    verbs: QuoteVerbs,
    heuristic_window: usize,
}

impl Default for EnglishQuoteExtractor {
    fn default() -> Self {
        Self::new(QuoteVerbs::builtin(Language::English))
    }
}

impl EnglishQuoteExtractor {
    #[must_use]
    pub fn new(verbs: QuoteVerbs) -> Self {
        Self {
            verbs,
            heuristic_window: DEFAULT_HEURISTIC_WINDOW,
        }
    }

    #[must_use]
    pub fn with_heuristic_window(mut self, window: usize) -> Self {
        self.heuristic_window = window;
        self
    }

    fn syntactic_quotes(&self, doc: &Document) -> Vec<Candidate> {
        let mut found = Vec::new();
        for tok in doc.tokens() {
            if !tok.is(Relation::ClausalComplement) || tok.is_root() {
                continue;
            }
            let verb = doc.token(tok.head);
            if !matches!(verb.pos, Pos::Verb | Pos::Aux) || !self.verbs.matches(verb) {
                continue;
            }
            let content_range = trim_punct(doc, doc.subtree(tok.i), true);
            if content_range.is_empty() {
                continue;
            }
            let content_range = with_trailing_terminal(doc, content_range);
            let content = doc.char_span(content_range.clone());

            let Some(subject) = find_subject(doc, verb.i, &content_range) else {
                continue;
            };
            let speaker = doc.char_span(doc.subtree(subject));
            if speaker.overlaps(&content) {
                continue;
            }

            let marks = enclosing_marks(doc, &content_range);
            let code = position_code(marks, content, Some(verb.span()), Some(speaker));
            if is_enclosed_code(&code) {
                continue;
            }
            found.push(
                Candidate::new(content, code)
                    .with_speaker(Some(speaker))
                    .with_verb(Some(verb.span())),
            );
        }
        found
    }

    fn according_to_quotes(doc: &Document) -> Vec<Candidate> {
        let mut found = Vec::new();
        for tok in doc.tokens() {
            if !tok.is(Relation::Preposition) || tok.is_root() || tok.lower() != "to" {
                continue;
            }
            let according = doc.token(tok.head);
            if according.lower() != "according" {
                continue;
            }
            let Some(object) = doc.children_with(tok.i, Relation::PrepositionObject).next()
            else {
                continue;
            };
            let speaker = doc.char_span(doc.subtree(object));
            let phrase = doc.subtree(according.i);
            let clause = if according.is_root() {
                doc.sentence_of(according.i)
            } else {
                doc.subtree(according.head)
            };

            let before = clause.start..phrase.start.max(clause.start);
            let after = phrase.end.min(clause.end)..clause.end;
            let side = if after.len() >= before.len() { after } else { before };
            let content_range = trim_punct(doc, side, true);
            if content_range.is_empty() {
                continue;
            }
            let content = doc.char_span(content_range);
            if speaker.overlaps(&content) {
                continue;
            }

            let mut candidate = Candidate::new(content, kind::ACCORDING_TO)
                .with_speaker(Some(speaker))
                .with_verb(Some(CharSpan::new(according.idx, tok.end_char())));
            candidate.verb_text = Some("according to".to_string());
            found.push(candidate);
        }
        found
    }

    /// A sentence opening on a quote mark right after a well-formed attributed
    /// quote continues that speaker's speech until a closing `."`.
    fn floating_quotes(doc: &Document, attributed: &[Candidate]) -> Vec<Candidate> {
        let anchors: Vec<&Candidate> = attributed
            .iter()
            .filter(|c| FLOATING_ANCHORS.contains(&c.quote_type.as_str()))
            .collect();
        let sents = doc.sentences();
        let mut found = Vec::new();

        let mut k = 1;
        while k < sents.len() {
            let previous = doc.char_span(sents[k - 1].clone());
            let anchor = anchors.iter().rev().find(|c| previous.overlaps(&c.quote));
            let opens = !sents[k].is_empty() && doc.token(sents[k].start).is_quote_mark();
            let (Some(anchor), true) = (anchor, opens) else {
                k += 1;
                continue;
            };

            let last = (k + FLOATING_LOOKAHEAD + 1).min(sents.len());
            let Some(j) = (k..last).find(|&j| closes_quote(doc, &sents[j])) else {
                k += 1;
                continue;
            };

            let inner = sents[k].start + 1..sents[j].end - 1;
            if !inner.is_empty() {
                let content = doc.char_span(inner);
                found.push(
                    Candidate::new(content, kind::FLOATING)
                        .with_speaker(anchor.speaker)
                        .floating(),
                );
            }
            k = j + 1;
        }
        found
    }

    fn heuristic_quotes(&self, doc: &Document) -> Vec<Candidate> {
        let marks: Vec<usize> = doc
            .tokens()
            .iter()
            .filter(|t| t.is_quote_mark())
            .map(|t| t.i)
            .collect();

        let mut found = Vec::new();
        for pair in marks.chunks_exact(2) {
            let (open, close) = (pair[0], pair[1]);
            let inner = open + 1..close;
            if !HEURISTIC_TOKENS.contains(&inner.len()) {
                continue;
            }
            let content = doc.char_span(inner);

            let verb = self.closest_verb(doc, open, close);
            let speaker = verb
                .and_then(|v| doc.children_with(v, Relation::NominalSubject).next())
                .map(|s| doc.char_span(doc.subtree(s)))
                .filter(|s| !s.overlaps(&content));

            found.push(
                Candidate::new(content, kind::HEURISTIC)
                    .with_speaker(speaker)
                    .with_verb(verb.map(|v| doc.token(v).span())),
            );
        }
        found
    }

    fn closest_verb(&self, doc: &Document, open: usize, close: usize) -> Option<usize> {
        let before = open.saturating_sub(self.heuristic_window)..open;
        let after = close + 1..(close + 1 + self.heuristic_window).min(doc.len());
        before
            .map(|i| (open - i, i))
            .chain(after.map(|i| (i - close, i)))
            .filter(|&(_, i)| {
                let t = doc.token(i);
                t.pos == Pos::Verb && t.lemma_lower() != "be"
            })
            .min()
            .map(|(_, i)| i)
    }
}

impl QuoteExtractor for EnglishQuoteExtractor {
    fn language(&self) -> Language {
        Language::English
    }

    fn extract(&self, doc: &Document) -> Vec<Quote> {
        let mut candidates = self.syntactic_quotes(doc);
        candidates.extend(Self::according_to_quotes(doc));
        let syntactic = candidates.len();

        let floating = Self::floating_quotes(doc, &candidates);
        let floating_count = floating.len();
        candidates.extend(floating);
        candidates.extend(self.heuristic_quotes(doc));

        let quotes: Vec<Quote> = candidates
            .into_iter()
            .filter(|c| !c.quote.is_empty())
            .map(|c| c.render(doc))
            .filter(|q| !REJECTED_SPEAKERS.contains(&q.speaker.to_lowercase().as_str()))
            .collect();
        let total = quotes.len();
        let quotes = dedupe(quotes);

        tracing::debug!(
            syntactic,
            floating = floating_count,
            candidates = total,
            kept = quotes.len(),
            "english quote extraction"
        );
        quotes
    }
}

/// Nominal subject among the verb's children, then among its head's
/// children, never inside the quoted content.
fn find_subject(doc: &Document, verb: usize, content: &Range<usize>) -> Option<usize> {
    let outside = |&i: &usize| !content.contains(&i);
    doc.children_with(verb, Relation::NominalSubject)
        .find(outside)
        .or_else(|| {
            let head = doc.token(verb).head;
            (head != verb)
                .then(|| doc.children_with(head, Relation::NominalSubject).find(outside))
                .flatten()
        })
}

/// Include a sentence-final period that directly follows the content.
fn with_trailing_terminal(doc: &Document, range: Range<usize>) -> Range<usize> {
    let last = doc.token(range.end - 1);
    match doc.get(range.end) {
        Some(next)
            if next.is_sentence_terminal()
                && !last.is_sentence_terminal()
                && next.idx == last.end_char() =>
        {
            range.start..range.end + 1
        }
        _ => range,
    }
}

/// Nearest quote marks on either side of the content within its sentence.
/// When the reporting clause itself sits between them the code opens and
/// closes on `Q`.
fn enclosing_marks(doc: &Document, content: &Range<usize>) -> Option<(CharSpan, CharSpan)> {
    let sent = doc.sentence_of(content.start);
    let open = (sent.start..content.start)
        .rev()
        .map(|i| doc.token(i))
        .find(|t| t.is_quote_mark())?;
    let close = (content.end..sent.end)
        .map(|i| doc.token(i))
        .find(|t| t.is_quote_mark())?;
    Some((open.span(), close.span()))
}

fn closes_quote(doc: &Document, sent: &Range<usize>) -> bool {
    if sent.len() < 2 {
        return false;
    }
    doc.token(sent.end - 1).is_quote_mark() && doc.token(sent.end - 2).is_sentence_terminal()
}
