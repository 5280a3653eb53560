//! Sentence windows and speaker selection shared by the French passes.

use std::ops::Range;

use crate::gender::Gender;
use crate::nlp::{CharSpan, Document, Pos, Relation, Token};
use crate::quotes::trim_punct;

const MAX_SENTENCE_TOKENS: usize = 100;

/// Subject clitics, including the ones that arrive hyphenated (`-elle`).
pub const SUBJECT_PRONOUNS: &[&str] = &[
    "il", "elle", "ils", "elles", "on", "je", "j'", "nous", "vous", "tu",
];

/// Third-person subject pronouns, never inherited by floating quotes.
pub const WEAK_PRONOUNS: &[&str] = &["il", "elle", "ils", "elles", "on"];

const FIRST_SECOND_PERSON: &[&str] = &["je", "j'", "nous", "vous", "tu", "moi", "toi"];

const NOT_SPEAKERS: &[&str] = &[
    "ne", "n'", "pas", "jamais", "plus", "-t", "t", "ça", "ca", "cela", "ce", "c'", "on", "se",
    "s'",
];

/// Sentence around token `i`, at most a hundred tokens either way. A sentence
/// terminal directly followed by a closing guillemet does not end it; the
/// guillemet does, unless an attribution (`», a dit…`) follows.
pub fn expanded_sentence(doc: &Document, i: usize) -> Range<usize> {
    let mut start = i;
    while start > 0 && i - start < MAX_SENTENCE_TOKENS && !ends_sentence(doc, start - 1) {
        start -= 1;
    }
    let mut end = i + 1;
    while end < doc.len() && end - i < MAX_SENTENCE_TOKENS && !ends_sentence(doc, end - 1) {
        end += 1;
    }
    start..end
}

fn ends_sentence(doc: &Document, j: usize) -> bool {
    let tok = doc.token(j);
    if tok.contains_newline() {
        return true;
    }
    if tok.is_sentence_terminal() {
        return !closes_guillemet(doc, j + 1);
    }
    if closes_guillemet(doc, j) && j > 0 && doc.token(j - 1).is_sentence_terminal() {
        return doc.get(j + 1).is_none_or(|next| !continues_sentence(next));
    }
    false
}

fn closes_guillemet(doc: &Document, i: usize) -> bool {
    doc.get(i)
        .is_some_and(|t| t.is_quote_mark() && doc.is_end_guillemet(t.idx))
}

fn continues_sentence(tok: &Token) -> bool {
    tok.text == "," || tok.text.chars().next().is_some_and(char::is_lowercase)
}

/// Pronoun text without inversion hyphens: `-t-elle` and `-elle` give `elle`.
pub fn bare_pronoun(text: &str) -> &str {
    let text = text.strip_prefix('-').unwrap_or(text);
    text.strip_prefix("t-").unwrap_or(text)
}

#[must_use]
pub fn is_inverted_pronoun(tok: &Token) -> bool {
    tok.text.starts_with('-') && SUBJECT_PRONOUNS.contains(&bare_pronoun(&tok.lower()))
}

/// Character span of a pronoun token, excluding the inversion hyphens.
pub fn pronoun_span(tok: &Token) -> CharSpan {
    let bare = bare_pronoun(&tok.text).chars().count();
    CharSpan::new(tok.end_char() - bare, tok.end_char())
}

pub fn is_valid_speaker(tok: &Token) -> bool {
    let lower = tok.lower();
    !tok.is_punct() && !NOT_SPEAKERS.contains(&bare_pronoun(&lower))
}

/// A name or noun phrase headed at `i`, cut so it stays inside `window` and
/// clear of `quote`.
pub fn phrase_span(
    doc: &Document,
    i: usize,
    window: &Range<usize>,
    quote: &Range<usize>,
) -> Option<CharSpan> {
    let tok = doc.token(i);
    if tok.text.starts_with('-') {
        return Some(pronoun_span(tok));
    }
    let subtree = doc.subtree(i);
    let mut start = subtree.start.max(window.start);
    let mut end = subtree.end.min(window.end);
    if quote.start < end && start < quote.end {
        if i < quote.start {
            end = end.min(quote.start);
        } else {
            start = start.max(quote.end);
        }
    }
    // Appositions and relative clauses stop at the first comma after the head.
    if let Some(comma) = (i + 1..end).find(|&j| doc.token(j).text == ",") {
        end = comma;
    }
    let range = trim_punct(doc, start..end, false);
    (!range.is_empty()).then(|| doc.char_span(range))
}

/// Contiguous flat-name chain containing token `i`.
pub fn name_span(doc: &Document, i: usize) -> CharSpan {
    let mut root = i;
    while doc.token(root).is(Relation::FlatName) && !doc.token(root).is_root() {
        root = doc.token(root).head;
    }
    let mut start = root;
    let mut end = root + 1;
    let in_chain = |t: &Token| t.is(Relation::FlatName) && t.head == root;
    while start > 0 && in_chain(doc.token(start - 1)) {
        start -= 1;
    }
    while end < doc.len() && in_chain(doc.token(end)) {
        end += 1;
    }
    doc.char_span(start..end)
}

/// Speaker of a reporting verb: nominal subject, then subject pronoun, then
/// proper noun, then apposition, then noun object. Children inside the quote
/// are ignored.
pub fn speaker_among_children(
    doc: &Document,
    verb: usize,
    window: &Range<usize>,
    quote: &Range<usize>,
) -> Option<CharSpan> {
    let children: Vec<&Token> = doc
        .children(verb)
        .iter()
        .map(|&c| doc.token(c))
        .filter(|t| window.contains(&t.i) && !quote.contains(&t.i) && is_valid_speaker(t))
        .collect();

    let preferences: [&dyn Fn(&Token) -> bool; 5] = [
        &|t: &Token| t.is(Relation::NominalSubject),
        &|t: &Token| t.pos == Pos::Pron && SUBJECT_PRONOUNS.contains(&bare_pronoun(&t.lower())),
        &|t: &Token| t.pos == Pos::Propn,
        &|t: &Token| t.is(Relation::Apposition),
        &|t: &Token| t.pos == Pos::Noun && (t.is(Relation::Object) || t.i > verb),
    ];
    preferences
        .iter()
        .find_map(|pick| children.iter().find(|t| pick(t)))
        .and_then(|t| phrase_span(doc, t.i, window, quote))
}

/// Fallback: the closest proper noun before the verb in the sentence.
pub fn proper_noun_before(
    doc: &Document,
    verb: usize,
    window: &Range<usize>,
    quote: &Range<usize>,
) -> Option<CharSpan> {
    (window.start..verb)
        .rev()
        .filter(|j| !quote.contains(j))
        .find(|&j| doc.token(j).pos == Pos::Propn && is_valid_speaker(doc.token(j)))
        .map(|j| name_span(doc, j))
}

/// Speaker sought after the verb: its subject, else the first name or noun.
pub fn speaker_after(
    doc: &Document,
    verb: usize,
    window: &Range<usize>,
    quote: &Range<usize>,
) -> Option<CharSpan> {
    let after = verb + 1..window.end;
    doc.children_with(verb, Relation::NominalSubject)
        .find(|c| after.contains(c) && is_valid_speaker(doc.token(*c)))
        .or_else(|| {
            after.clone().find(|&j| {
                let t = doc.token(j);
                matches!(t.pos, Pos::Propn | Pos::Noun) && is_valid_speaker(t)
            })
        })
        .and_then(|j| {
            let t = doc.token(j);
            if t.pos == Pos::Propn {
                Some(name_span(doc, j))
            } else {
                phrase_span(doc, j, window, quote)
            }
        })
}

/// Gender carried by a pronoun speaker. First and second person speakers are
/// `Unknown`; names and nouns carry none.
pub fn pronoun_gender(doc: &Document, speaker: CharSpan) -> Option<Gender> {
    let range = doc.token_range(speaker);
    if range.len() != 1 {
        return None;
    }
    let tok = doc.token(range.start);
    let bare = bare_pronoun(&tok.lower()).to_string();
    if FIRST_SECOND_PERSON.contains(&bare.as_str())
        || matches!(tok.morph_value("Person"), Some("1" | "2"))
    {
        return Some(Gender::Unknown);
    }
    if tok.pos != Pos::Pron && !tok.text.starts_with('-') {
        return None;
    }
    match (bare.as_str(), tok.morph_value("Gender")) {
        ("elle" | "elles", _) | (_, Some("Fem")) => Some(Gender::Female),
        ("il" | "ils", _) | (_, Some("Masc")) => Some(Gender::Male),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::testing::DocBuilder;

    #[test]
    fn test_bare_pronoun() {
        assert_eq!(bare_pronoun("-t-elle"), "elle");
        assert_eq!(bare_pronoun("-il"), "il");
        assert_eq!(bare_pronoun("elle"), "elle");
    }

    #[test]
    fn test_expanded_sentence_crosses_closing_guillemet() {
        let doc = DocBuilder::french("Avant. « Nous partons. », a dit Léa. Après.")
            .tokens(&[
                "Avant avant ADV ROOT 0",
                ". . PUNCT punct 0",
                "\" \" PUNCT punct 3",
                "Nous nous PRON nsubj 3",
                "partons partir VERB ccomp 8",
                ". . PUNCT punct 3",
                "\" \" PUNCT punct 3",
                ", , PUNCT punct 8",
                "a avoir AUX aux 8",
                "dit dire VERB ROOT 8",
                "Léa Léa PROPN nsubj 8",
                ". . PUNCT punct 8",
                "Après après ADV ROOT 12",
                ". . PUNCT punct 12",
            ])
            .build();
        assert_eq!(expanded_sentence(&doc, 9), 2..12);
        assert_eq!(expanded_sentence(&doc, 3), 2..12);
        assert_eq!(expanded_sentence(&doc, 0), 0..2);
    }

    #[test]
    fn test_pronoun_gender() {
        let doc = DocBuilder::french("Elle a dit, a-t-il ajouté, nous partons.")
            .tokens(&[
                "Elle il PRON nsubj 2 Gender=Fem|Person=3",
                "a avoir AUX aux 2",
                "dit dire VERB ROOT 2",
                ", , PUNCT punct 6",
                "a avoir AUX aux 6",
                "-t-il il PRON nsubj 6",
                "ajouté ajouter VERB parataxis 2",
                ", , PUNCT punct 6",
                "nous nous PRON nsubj 9 Person=1",
                "partons partir VERB ccomp 2",
                ". . PUNCT punct 2",
            ])
            .build();
        let span = |i: usize| doc.token(i).span();
        assert_eq!(pronoun_gender(&doc, span(0)), Some(Gender::Female));
        assert_eq!(pronoun_gender(&doc, pronoun_span(doc.token(5))), Some(Gender::Male));
        assert_eq!(doc.slice(pronoun_span(doc.token(5))), "il");
        assert_eq!(pronoun_gender(&doc, span(8)), Some(Gender::Unknown));
        assert_eq!(pronoun_gender(&doc, span(2)), None);
    }
}
