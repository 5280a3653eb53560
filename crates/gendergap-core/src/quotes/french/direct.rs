//! Direct speech between guillemets, and one-sided quotes whose closing
//! guillemet never comes before the end of the paragraph.

use std::ops::Range;

use super::speaker::{
    expanded_sentence, is_inverted_pronoun, name_span, pronoun_span, speaker_among_children,
};
use super::QuoteSet;
use crate::lexicon::QuoteVerbs;
use crate::nlp::{CharSpan, Document, Pos, Relation};
use crate::quotes::{kind, Candidate};

/// Character spans of `"…"` on a single line, marks included.
fn quoted_spans(text: &str) -> Vec<CharSpan> {
    let mut spans = Vec::new();
    let mut open = None;
    for (i, c) in text.chars().enumerate() {
        match c {
            '\n' => open = None,
            '"' => match open.take() {
                Some(start) => spans.push(CharSpan::new(start, i + 1)),
                None => open = Some(i),
            },
            _ => {}
        }
    }
    spans
}

/// Quoted spans opened by a `«` and closed by a `»` in the original text.
fn guillemet_pairs(doc: &Document) -> Vec<CharSpan> {
    quoted_spans(doc.text())
        .into_iter()
        .filter(|s| doc.is_start_guillemet(s.start) && doc.is_end_guillemet(s.end - 1))
        .collect()
}

/// `, dit-il, ` between two quoted halves.
fn is_interruption(between: &str) -> bool {
    let Some(inner) = between
        .trim()
        .strip_prefix(',')
        .and_then(|s| s.strip_suffix(','))
    else {
        return false;
    };
    !inner.trim().is_empty() && !inner.contains(['"', '.', '!', '?', '\n'])
}

pub(super) fn direct_quotes(doc: &Document, verbs: &QuoteVerbs, found: &mut QuoteSet) {
    let pairs = guillemet_pairs(doc);
    let mut k = 0;
    while k < pairs.len() {
        let pair = pairs[k];
        let interrupted = pairs.get(k + 1).filter(|next| {
            is_interruption(doc.slice(CharSpan::new(pair.end, next.start)))
        });
        if let Some(&next) = interrupted {
            if interrupted_quotes(doc, verbs, pair, next, found) {
                k += 2;
                continue;
            }
        }
        direct_quote(doc, verbs, pair, found);
        k += 1;
    }
}

fn direct_quote(doc: &Document, verbs: &QuoteVerbs, pair: CharSpan, found: &mut QuoteSet) {
    if found.seen_before(pair) || found.overlaps(pair) {
        return;
    }
    let inside = doc.token_range(pair);
    if inside.is_empty() {
        return;
    }
    let sent = expanded_sentence(doc, inside.start);

    if is_floating(doc, &sent, pair) {
        found.push_floating(doc, Candidate::new(pair, kind::DIRECT));
        return;
    }
    if inner_split(doc, verbs, pair, &inside, found) {
        return;
    }

    let verb = find_verb(doc, verbs, &sent, &inside);
    let speaker = verb.and_then(|v| verb_speaker(doc, v, &sent, &inside));
    found.push(
        Candidate::new(pair, kind::DIRECT)
            .with_verb(verb.map(|v| doc.token(v).span()))
            .with_speaker(speaker),
    );
}

/// No word outside the marks: the sentence is the quote.
fn is_floating(doc: &Document, sent: &Range<usize>, pair: CharSpan) -> bool {
    let sent_span = doc.char_span(sent.clone());
    let before = doc.slice(CharSpan::new(sent_span.start.min(pair.start), pair.start));
    let after = doc.slice(CharSpan::new(pair.end, sent_span.end.max(pair.end)));
    !before.chars().chain(after.chars()).any(char::is_alphanumeric)
}

/// Reporting verb near the quote, searched before it (closest first) then
/// after it: lexicon verbs tagged VERB, then any lexicon match, then any VERB.
fn find_verb(
    doc: &Document,
    verbs: &QuoteVerbs,
    sent: &Range<usize>,
    quote: &Range<usize>,
) -> Option<usize> {
    let order: Vec<usize> = (sent.start..quote.start.max(sent.start))
        .rev()
        .chain(quote.end.max(sent.start)..sent.end)
        .collect();
    let tiers: [&dyn Fn(usize) -> bool; 3] = [
        &|i| doc.token(i).pos == Pos::Verb && verbs.matches(doc.token(i)),
        &|i| verbs.matches(doc.token(i)),
        &|i| doc.token(i).pos == Pos::Verb,
    ];
    tiers
        .iter()
        .find_map(|tier| order.iter().copied().find(|&i| tier(i)))
        .map(|i| climb_open_complements(doc, i))
}

/// From an `xcomp` or auxiliary up to the verb that governs it.
fn climb_open_complements(doc: &Document, mut i: usize) -> usize {
    for _ in 0..doc.len() {
        let tok = doc.token(i);
        let climb = tok.is(Relation::OpenComplement) || tok.pos == Pos::Aux;
        if !climb || tok.is_root() {
            break;
        }
        i = tok.head;
    }
    i
}

fn verb_speaker(
    doc: &Document,
    verb: usize,
    sent: &Range<usize>,
    quote: &Range<usize>,
) -> Option<CharSpan> {
    speaker_among_children(doc, verb, sent, quote).or_else(|| {
        let head = doc.token(verb).head;
        (head != verb && !quote.contains(&head))
            .then(|| speaker_among_children(doc, head, sent, quote))
            .flatten()
    })
}

/// `«q1», dit-il, «q2»`: both halves share the attribution between them.
fn interrupted_quotes(
    doc: &Document,
    verbs: &QuoteVerbs,
    first: CharSpan,
    second: CharSpan,
    found: &mut QuoteSet,
) -> bool {
    if [first, second]
        .iter()
        .any(|&p| found.seen_before(p) || found.overlaps(p))
    {
        return false;
    }
    let middle = doc.token_range(first).end..doc.token_range(second).start;
    let Some(verb) = middle.clone().find(|&i| verbs.matches(doc.token(i))) else {
        return false;
    };
    let speaker = middle
        .clone()
        .find(|&i| is_inverted_pronoun(doc.token(i)))
        .map(|i| pronoun_span(doc.token(i)))
        .or_else(|| {
            middle
                .clone()
                .find(|&i| doc.token(i).pos == Pos::Propn)
                .map(|i| name_span(doc, i))
        })
        .or_else(|| speaker_among_children(doc, verb, &middle, &(0..0)));

    for half in [first, second] {
        found.push(
            Candidate::new(half, kind::DIRECT)
                .with_verb(Some(doc.token(verb).span()))
                .with_speaker(speaker),
        );
    }
    true
}

/// `«q1, a-t-il dit. q2»`: verb and speaker sit inside the marks. The two
/// halves become separate quotes sharing that attribution.
fn inner_split(
    doc: &Document,
    verbs: &QuoteVerbs,
    pair: CharSpan,
    inside: &Range<usize>,
    found: &mut QuoteSet,
) -> bool {
    let Some(pron) = inside
        .clone()
        .find(|&i| is_inverted_pronoun(doc.token(i)))
    else {
        return false;
    };
    let Some(verb) = [pron.checked_sub(1), Some(pron + 1)]
        .into_iter()
        .flatten()
        .filter(|i| inside.contains(i))
        .find(|&i| verbs.matches(doc.token(i)))
    else {
        return false;
    };

    let mut construct = pron.min(verb);
    if construct > inside.start && doc.token(construct - 1).pos == Pos::Aux {
        construct -= 1;
    }
    let Some(comma) = construct
        .checked_sub(1)
        .filter(|&c| c > inside.start && doc.token(c).text == ",")
    else {
        return false;
    };
    let Some(pause) = (pron.max(verb) + 1..inside.end).find(|&i| {
        let t = doc.token(i);
        t.is_sentence_terminal() || t.text == ","
    }) else {
        return false;
    };
    let resume = pause + 1;
    if !(resume..inside.end).any(|i| !doc.token(i).is_punct()) {
        return false;
    }

    let halves = [
        CharSpan::new(pair.start, doc.token(comma).idx),
        CharSpan::new(doc.token(resume).idx, pair.end),
    ];
    let speaker = Some(pronoun_span(doc.token(pron)));
    for half in halves {
        found.push(
            Candidate::new(half, kind::DIRECT)
                .with_verb(Some(doc.token(verb).span()))
                .with_speaker(speaker),
        );
    }
    true
}

/// `«text` running to the end of its line with no closing mark.
pub(super) fn one_sided_quotes(doc: &Document, found: &mut QuoteSet) {
    let chars: Vec<char> = doc.text().chars().collect();
    for start in (0..chars.len()).filter(|&i| doc.is_start_guillemet(i)) {
        if found.covers_offset(start) {
            continue;
        }
        let mut end = start + 1;
        while end < chars.len() && chars[end] != '\n' && chars[end] != '"' {
            end += 1;
        }
        if chars.get(end) == Some(&'"') {
            continue;
        }
        while end > start + 1 && chars[end - 1].is_whitespace() {
            end -= 1;
        }
        let span = CharSpan::new(start, end);
        if !chars[start + 1..end].iter().any(|c| c.is_alphanumeric()) || found.overlaps(span) {
            continue;
        }
        found.push_floating(doc, Candidate::new(span, kind::ONE_SIDED));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_spans_stay_on_one_line() {
        assert_eq!(
            quoted_spans("\"a\" b \"c\nd\" \"e\""),
            vec![CharSpan::new(0, 3), CharSpan::new(10, 13)]
        );
    }

    #[test]
    fn test_interruption() {
        assert!(is_interruption(", dit-il, "));
        assert!(is_interruption(" , a déclaré la ministre ,"));
        assert!(!is_interruption(". Puis, "));
        assert!(!is_interruption(", "));
        assert!(!is_interruption(" et "));
    }
}
