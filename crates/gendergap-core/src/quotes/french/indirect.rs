//! Indirect speech: a reporting verb whose reported clause is not between
//! guillemets, e.g. `La mairesse a déclaré que le budget serait adopté.`

use std::ops::Range;

use super::speaker::{
    expanded_sentence, is_inverted_pronoun, pronoun_span, proper_noun_before, speaker_after,
    speaker_among_children,
};
use super::MIN_INDIRECT_TOKENS;
use crate::lexicon::QuoteVerbs;
use crate::nlp::{CharSpan, Document, Pos, Relation};
use crate::quotes::{kind, trim_punct, Candidate};

/// Surfaces of reporting verbs that are nearly always adjectival or nominal.
const FALSE_POSITIVE_SURFACES: &[&str] = &[
    "dite", "dites", "dits", "entendu", "entendue", "prévu", "prévue", "reconnu", "reconnue",
    "annoncée", "rappel",
];

const NEGATIONS: &[&str] = &["ne", "n'", "pas", "jamais", "guère"];

/// Verbs whose object clause follows them without a complementizer.
const SPECIAL_VERBS: &[&str] = &["estimer", "juger", "croire", "penser", "trouver"];

/// Tokens after the verb within which `que` still introduces its complement.
const QUE_WINDOW: usize = 7;

struct Match {
    quote: Range<usize>,
    speaker: Option<CharSpan>,
}

pub(super) fn indirect_quotes(doc: &Document, verbs: &QuoteVerbs) -> Vec<Candidate> {
    doc.tokens()
        .iter()
        .filter(|t| t.pos == Pos::Verb && verbs.matches(t))
        .filter_map(|t| indirect_quote(doc, t.i))
        .collect()
}

fn indirect_quote(doc: &Document, verb: usize) -> Option<Candidate> {
    let tok = doc.token(verb);
    let lower = tok.lower();
    if FALSE_POSITIVE_SURFACES.contains(&lower.as_str()) || is_il_faut(doc, verb) {
        return None;
    }
    if is_negated(doc, verb) {
        return None;
    }

    let sent = expanded_sentence(doc, verb);
    if doc.has_guillemet_pair_within(doc.char_span(sent.clone())) || has_selon(doc, &sent) {
        return None;
    }

    let found = inverted(doc, verb, &sent)
        .or_else(|| que_clause(doc, verb, &sent))
        .or_else(|| de_clause(doc, verb, &sent))
        .or_else(|| comma_before(doc, verb, &sent))
        .or_else(|| clausal_complement(doc, verb, &sent))
        .or_else(|| compound_past(doc, verb, &sent))
        .or_else(|| special_verb(doc, verb, &sent))?;

    if len_with_terminal(doc, &found.quote) < MIN_INDIRECT_TOKENS {
        return None;
    }
    let quote_range = trim_punct(doc, found.quote, false);
    if quote_range.is_empty() {
        return None;
    }
    let quote = doc.char_span(quote_range);
    let speaker = found.speaker.filter(|s| !s.overlaps(&quote))?;

    let mut candidate = Candidate::new(quote, kind::INDIRECT)
        .with_speaker(Some(speaker))
        .with_verb(Some(tok.span()));
    candidate.token_count = doc.token_range(quote).len();
    Some(candidate)
}

fn is_il_faut(doc: &Document, verb: usize) -> bool {
    let tok = doc.token(verb);
    tok.lemma_lower() == "falloir"
        || (tok.lower() == "faut" && verb > 0 && doc.token(verb - 1).lower() == "il")
}

fn is_negated(doc: &Document, verb: usize) -> bool {
    let negator = |i: usize| NEGATIONS.contains(&doc.token(i).lower().as_str());
    doc.children(verb).iter().any(|&c| negator(c))
        || (verb.saturating_sub(3)..verb)
            .rev()
            .take_while(|&j| !doc.token(j).is_punct())
            .any(negator)
}

fn has_selon(doc: &Document, sent: &Range<usize>) -> bool {
    sent.clone().any(|i| {
        let lower = doc.token(i).lower();
        lower == "selon" || (lower == "après" && i > 0 && doc.token(i - 1).lower() == "d'")
    })
}

/// Token count of a range plus a sentence terminal directly after it.
fn len_with_terminal(doc: &Document, range: &Range<usize>) -> usize {
    let terminal = doc.get(range.end).is_some_and(|t| t.is_sentence_terminal());
    range.len() + usize::from(terminal)
}

fn speaker_for(
    doc: &Document,
    verb: usize,
    sent: &Range<usize>,
    quote: &Range<usize>,
) -> Option<CharSpan> {
    speaker_among_children(doc, verb, sent, quote)
        .or_else(|| proper_noun_before(doc, verb, sent, quote))
}

/// `Le budget sera adopté, a-t-elle déclaré.` The quote runs up to the
/// inverted construction and the pronoun is the speaker.
fn inverted(doc: &Document, verb: usize, sent: &Range<usize>) -> Option<Match> {
    let pron = (verb.saturating_sub(2)..=verb + 1)
        .filter(|&j| j != verb && sent.contains(&j))
        .find(|&j| is_inverted_pronoun(doc.token(j)))?;
    let mut construct = pron.min(verb);
    if construct > sent.start && doc.token(construct - 1).pos == Pos::Aux {
        construct -= 1;
    }
    Some(Match {
        quote: sent.start..construct,
        speaker: Some(pronoun_span(doc.token(pron))),
    })
}

fn que_clause(doc: &Document, verb: usize, sent: &Range<usize>) -> Option<Match> {
    let que = (verb + 1..=verb + QUE_WINDOW)
        .take_while(|j| *j < sent.end)
        .find(|&j| matches!(doc.token(j).lower().as_str(), "que" | "qu'"))?;
    let complement = doc.token(que).head;
    let end = if complement > que {
        (doc.right_edge(complement) + 1).min(sent.end)
    } else {
        sent.end
    };
    let quote = que + 1..end.max(que + 1);
    let speaker = speaker_for(doc, verb, sent, &quote);
    Some(Match { quote, speaker })
}

fn de_clause(doc: &Document, verb: usize, sent: &Range<usize>) -> Option<Match> {
    let next = doc.get(verb + 1).filter(|t| sent.contains(&t.i))?;
    if !matches!(next.lower().as_str(), "de" | "des" | "d'") {
        return None;
    }
    let quote = verb + 1..sent.end;
    let speaker = speaker_for(doc, verb, sent, &quote);
    Some(Match { quote, speaker })
}

/// `Le projet avance, note Pierre Durand.`
fn comma_before(doc: &Document, verb: usize, sent: &Range<usize>) -> Option<Match> {
    if verb == 0 || verb - 1 < sent.start || doc.token(verb - 1).text != "," {
        return None;
    }
    let quote = sent.start..verb - 1;
    let speaker = speaker_after(doc, verb, sent, &quote);
    Some(Match { quote, speaker })
}

fn clausal_complement(doc: &Document, verb: usize, sent: &Range<usize>) -> Option<Match> {
    let complement = doc.children(verb).iter().copied().find(|&c| {
        let t = doc.token(c);
        c > verb
            && (t.is(Relation::ClausalComplement) || t.is(Relation::OpenComplement))
            && matches!(t.pos, Pos::Verb | Pos::Aux | Pos::Adj)
    })?;
    let subtree = doc.subtree(complement);
    let quote = subtree.start.max(verb + 1)..subtree.end.min(sent.end);
    let speaker = speaker_for(doc, verb, sent, &quote);
    Some(Match { quote, speaker })
}

/// `La réforme passera, a déclaré le ministre.`
fn compound_past(doc: &Document, verb: usize, sent: &Range<usize>) -> Option<Match> {
    if verb < sent.start + 2 {
        return None;
    }
    let aux = doc.token(verb - 1);
    if !matches!(aux.lower().as_str(), "a" | "ont") || doc.token(verb - 2).text != "," {
        return None;
    }
    let quote = sent.start..verb - 2;
    let speaker = speaker_after(doc, verb, sent, &quote);
    Some(Match { quote, speaker })
}

fn special_verb(doc: &Document, verb: usize, sent: &Range<usize>) -> Option<Match> {
    if !SPECIAL_VERBS.contains(&doc.token(verb).lemma_lower().as_str()) {
        return None;
    }
    let quote = verb + 1..sent.end;
    let speaker = speaker_for(doc, verb, sent, &quote);
    Some(Match { quote, speaker })
}
