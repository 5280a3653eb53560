//! Attribution by preposition: `Selon Jean Dupont, la réforme est
//! nécessaire.` and the same with `d'après`. There is no reporting verb.

use std::ops::Range;

use super::speaker::expanded_sentence;
use crate::nlp::Document;
use crate::quotes::{kind, trim_punct, Candidate};

/// `selon moi` and friends give an opinion, not a source.
const SELF_REFERENCES: &[&str] = &["moi", "toi", "nous", "vous", "lui", "eux", "elle", "elles"];

const MIN_SELON_TOKENS: usize = 4;

/// Token range of the attribution marker ending at `i`, if any.
fn marker(doc: &Document, i: usize) -> Option<Range<usize>> {
    match doc.token(i).lower().as_str() {
        "selon" => Some(i..i + 1),
        "après" if i > 0 && doc.token(i - 1).lower() == "d'" => Some(i - 1..i + 1),
        _ => None,
    }
}

pub(super) fn selon_quotes(doc: &Document) -> Vec<Candidate> {
    (0..doc.len())
        .filter_map(|i| marker(doc, i).and_then(|m| selon_quote(doc, &m)))
        .collect()
}

fn selon_quote(doc: &Document, marker: &Range<usize>) -> Option<Candidate> {
    let anchor = doc.root_of(marker.clone());
    let head = doc.token(anchor).head;
    if head < marker.end || doc.token(anchor).is_root() {
        return None;
    }

    let speaker_range = trim_punct(doc, marker.end..doc.right_edge(head) + 1, false);
    if speaker_range.is_empty() {
        return None;
    }
    let speaker_text = doc.span_text(speaker_range.clone()).to_lowercase();
    if SELF_REFERENCES.contains(&speaker_text.as_str()) {
        return None;
    }

    let gov = doc.token(head).head;
    if gov == head {
        return None;
    }
    let sent = expanded_sentence(doc, anchor);
    let quote_range = if head < gov {
        speaker_range.end..(doc.right_edge(gov) + 1).min(sent.end)
    } else {
        doc.left_edge(gov).max(sent.start)..marker.start
    };
    let quote_range = trim_punct(doc, quote_range, false);
    if quote_range.len() < MIN_SELON_TOKENS {
        return None;
    }

    let quote = doc.char_span(quote_range);
    let speaker = doc.char_span(speaker_range);
    if speaker.overlaps(&quote) {
        return None;
    }
    let mut candidate = Candidate::new(quote, kind::SELON).with_speaker(Some(speaker));
    candidate.token_count = doc.token_range(quote).len();
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::testing::DocBuilder;

    fn speaker_of(doc: &Document, candidate: &Candidate) -> Option<String> {
        candidate.speaker.map(|s| doc.slice(s).to_string())
    }

    #[test]
    fn test_selon_before_clause() {
        let doc = DocBuilder::french("Selon Jean Dupont, la réforme est nécessaire.")
            .tokens(&[
                "Selon selon ADP case 1",
                "Jean Jean PROPN obl:mod 7",
                "Dupont Dupont PROPN flat:name 1",
                ", , PUNCT punct 1",
                "la le DET det 5",
                "réforme réforme NOUN nsubj 7",
                "est être AUX cop 7",
                "nécessaire nécessaire ADJ ROOT 7",
                ". . PUNCT punct 7",
            ])
            .build();
        let found = selon_quotes(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(doc.slice(found[0].quote), "la réforme est nécessaire");
        assert_eq!(speaker_of(&doc, &found[0]).as_deref(), Some("Jean Dupont"));
        assert_eq!(found[0].verb, None);
        assert_eq!(found[0].quote_type, kind::SELON);
    }

    #[test]
    fn test_d_apres_after_clause() {
        let doc = DocBuilder::french("Les prix vont encore monter, d'après Marie Martin.")
            .tokens(&[
                "Les le DET det 1",
                "prix prix NOUN nsubj 4",
                "vont aller AUX aux 4",
                "encore encore ADV advmod 4",
                "monter monter VERB ROOT 4",
                ", , PUNCT punct 8",
                "d' de ADP case 8",
                "après après ADP fixed 6",
                "Marie Marie PROPN obl:mod 4",
                "Martin Martin PROPN flat:name 8",
                ". . PUNCT punct 4",
            ])
            .build();
        let found = selon_quotes(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(doc.slice(found[0].quote), "Les prix vont encore monter");
        assert_eq!(speaker_of(&doc, &found[0]).as_deref(), Some("Marie Martin"));
    }

    #[test]
    fn test_selon_moi_ignored() {
        let doc = DocBuilder::french("Selon moi, la réforme est nécessaire.")
            .tokens(&[
                "Selon selon ADP case 1",
                "moi moi PRON obl:mod 6",
                ", , PUNCT punct 1",
                "la le DET det 4",
                "réforme réforme NOUN nsubj 6",
                "est être AUX cop 6",
                "nécessaire nécessaire ADJ ROOT 6",
                ". . PUNCT punct 6",
            ])
            .build();
        assert!(selon_quotes(&doc).is_empty());
    }
}
