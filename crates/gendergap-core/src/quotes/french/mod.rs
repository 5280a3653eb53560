//! French quote extraction. Four passes share one quote set so that each
//! pass sees what the earlier ones claimed:
//!
//! 1. indirect speech around a reporting verb,
//! 2. `selon` / `d'après` attributions,
//! 3. direct speech between guillemets,
//! 4. one-sided quotes whose closing guillemet is missing.

mod direct;
mod indirect;
mod selon;
mod speaker;

use super::{Candidate, Quote, QuoteExtractor};
use crate::lexicon::QuoteVerbs;
use crate::nlp::{CharSpan, Document, Language};

use speaker::{bare_pronoun, pronoun_gender, WEAK_PRONOUNS};

/// Indirect quotes shorter than this, counting a closing terminal, are noise.
pub(super) const MIN_INDIRECT_TOKENS: usize = 5;

/// Endpoints closer than this are the same quote found twice.
const SEEN_TOLERANCE: usize = 3;

#[derive(Debug, Clone)]
pub struct FrenchQuoteExtractor {
    verbs: QuoteVerbs,
}

impl Default for FrenchQuoteExtractor {
    fn default() -> Self {
        Self::new(QuoteVerbs::builtin(Language::French))
    }
}

impl FrenchQuoteExtractor {
    #[must_use]
    pub fn new(verbs: QuoteVerbs) -> Self {
        Self { verbs }
    }
}

impl QuoteExtractor for FrenchQuoteExtractor {
    fn language(&self) -> Language {
        Language::French
    }

    fn extract(&self, doc: &Document) -> Vec<Quote> {
        let mut found = QuoteSet::default();

        for candidate in indirect::indirect_quotes(doc, &self.verbs) {
            found.push_unless_overlapping(candidate);
        }
        let indirect = found.len();

        for candidate in selon::selon_quotes(doc) {
            found.push_unless_overlapping(candidate);
        }
        let selon = found.len() - indirect;

        direct::direct_quotes(doc, &self.verbs, &mut found);
        let direct = found.len() - indirect - selon;

        direct::one_sided_quotes(doc, &mut found);
        let one_sided = found.len() - indirect - selon - direct;

        let quotes: Vec<Quote> = found
            .into_sorted()
            .into_iter()
            .map(|mut c| {
                c.speaker_gender = c.speaker.and_then(|s| pronoun_gender(doc, s));
                c.render(doc)
            })
            .collect();

        tracing::debug!(indirect, selon, direct, one_sided, "french quote extraction");
        quotes
    }
}

/// Quotes claimed so far, in the order the passes found them.
#[derive(Debug, Default)]
pub(super) struct QuoteSet {
    candidates: Vec<Candidate>,
}

impl QuoteSet {
    fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    fn push_unless_overlapping(&mut self, candidate: Candidate) {
        if !self.overlaps(candidate.quote) {
            self.push(candidate);
        }
    }

    /// Push a quote with no attached speaker; it inherits the reference of
    /// the closest attributed quote before it.
    pub fn push_floating(&mut self, doc: &Document, candidate: Candidate) {
        let mut candidate = candidate.floating();
        candidate.reference = self.inherited_reference(doc, candidate.quote.start);
        self.push(candidate);
    }

    pub fn overlaps(&self, span: CharSpan) -> bool {
        self.candidates.iter().any(|c| c.quote.overlaps(&span))
    }

    pub fn seen_before(&self, span: CharSpan) -> bool {
        self.candidates
            .iter()
            .any(|c| c.quote.roughly_equals(&span, SEEN_TOLERANCE))
    }

    pub fn covers_offset(&self, offset: usize) -> bool {
        self.candidates.iter().any(|c| c.quote.contains_offset(offset))
    }

    /// Speaker text or reference of the closest quote starting before
    /// `offset`. Third-person pronouns are passed over.
    pub fn inherited_reference(&self, doc: &Document, offset: usize) -> Option<String> {
        let mut prior: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.quote.start < offset)
            .collect();
        prior.sort_by_key(|c| std::cmp::Reverse(c.quote.start));
        prior.into_iter().find_map(|c| {
            let text = c
                .reference
                .clone()
                .filter(|r| !r.is_empty())
                .or_else(|| c.speaker.map(|s| doc.slice(s).to_string()))?;
            let lower = text.to_lowercase();
            (!WEAK_PRONOUNS.contains(&bare_pronoun(&lower))).then_some(text)
        })
    }

    fn into_sorted(mut self) -> Vec<Candidate> {
        self.candidates.sort_by_key(|c| c.quote);
        self.candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gender::Gender;
    use crate::nlp::testing::DocBuilder;
    use crate::quotes::kind;

    fn extract(doc: &Document) -> Vec<Quote> {
        FrenchQuoteExtractor::default().extract(doc)
    }

    #[test]
    fn test_direct_quote_with_attribution_after() {
        let doc = DocBuilder::french("\u{ab} Nous devons agir \u{bb}, a dit Marie Martin.")
            .tokens(&[
                "\" \" PUNCT punct 2",
                "Nous nous PRON nsubj 2 Person=1",
                "devons devoir VERB ccomp 7",
                "agir agir VERB xcomp 2",
                "\" \" PUNCT punct 2",
                ", , PUNCT punct 7",
                "a avoir AUX aux 7",
                "dit dire VERB ROOT 7",
                "Marie Marie PROPN nsubj 7",
                "Martin Martin PROPN flat:name 8",
                ". . PUNCT punct 7",
            ])
            .build();
        let quotes = extract(&doc);
        assert_eq!(quotes.len(), 1);
        let q = &quotes[0];
        assert_eq!(q.quote_index, "(0,20)");
        assert_eq!(q.quote, "\" Nous devons agir \"");
        assert_eq!(q.speaker, "Marie Martin");
        assert_eq!(q.verb, "dit");
        assert_eq!(q.quote_type, kind::DIRECT);
        assert!(!q.is_floating_quote);
        assert_eq!(q.speaker_gender, None);
    }

    #[test]
    fn test_floating_quote_inherits_speaker() {
        let doc = DocBuilder::french(
            "Marie Martin a déclaré : \u{ab} Il faut agir. \u{bb} \u{ab} Nous commencerons demain. \u{bb}",
        )
        .tokens(&[
            "Marie Marie PROPN nsubj 3",
            "Martin Martin PROPN flat:name 0",
            "a avoir AUX aux 3",
            "déclaré déclarer VERB ROOT 3",
            ": : PUNCT punct 3",
            "\" \" PUNCT punct 7",
            "Il il PRON expl:subj 7",
            "faut falloir VERB ccomp 3",
            "agir agir VERB xcomp 7",
            ". . PUNCT punct 7",
            "\" \" PUNCT punct 7",
            "\" \" PUNCT punct 13",
            "Nous nous PRON nsubj 13 Person=1",
            "commencerons commencer VERB ROOT 13",
            "demain demain ADV advmod 13",
            ". . PUNCT punct 13",
            "\" \" PUNCT punct 13",
        ])
        .build();
        let quotes = extract(&doc);
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].speaker, "Marie Martin");
        assert_eq!(quotes[0].verb, "déclaré");
        assert!(!quotes[0].is_floating_quote);

        assert!(quotes[1].is_floating_quote);
        assert_eq!(quotes[1].speaker_index, "");
        assert_eq!(quotes[1].reference, "Marie Martin");
        assert_eq!(quotes[1].quote_type, kind::DIRECT);
    }

    #[test]
    fn test_inherited_reference_skips_weak_pronouns() {
        let doc = DocBuilder::french("Paul Roy parle. Elle parle. Ensuite.").build();
        let mut found = QuoteSet::default();
        found.push(
            Candidate::new(CharSpan::new(9, 14), kind::DIRECT)
                .with_speaker(Some(CharSpan::new(0, 8))),
        );
        found.push(
            Candidate::new(CharSpan::new(21, 26), kind::DIRECT)
                .with_speaker(Some(CharSpan::new(16, 20))),
        );
        assert_eq!(found.inherited_reference(&doc, 28).as_deref(), Some("Paul Roy"));
        assert_eq!(found.inherited_reference(&doc, 5), None);
    }

    #[test]
    fn test_seen_before_tolerance() {
        let mut found = QuoteSet::default();
        found.push(Candidate::new(CharSpan::new(10, 40), kind::INDIRECT));
        assert!(found.seen_before(CharSpan::new(12, 38)));
        assert!(!found.seen_before(CharSpan::new(5, 40)));
        assert!(found.covers_offset(10));
        assert!(!found.covers_offset(40));
    }

    #[test]
    fn test_interrupted_quote_emits_two() {
        let doc = DocBuilder::french(
            "\u{ab} Le budget \u{bb}, dit-elle, \u{ab} sera adopté demain \u{bb}.",
        )
        .tokens(&[
            "\" \" PUNCT punct 2",
            "Le le DET det 2",
            "budget budget NOUN nsubj 6",
            "\" \" PUNCT punct 2",
            ", , PUNCT punct 5",
            "dit dire VERB parataxis 8",
            "-elle il PRON nsubj 5 Gender=Fem|Person=3",
            ", , PUNCT punct 5",
            "\" \" PUNCT punct 8",
            "sera être AUX aux:pass 10",
            "adopté adopter VERB ROOT 10",
            "demain demain ADV advmod 10",
            "\" \" PUNCT punct 10",
            ". . PUNCT punct 10",
        ])
        .build();
        let quotes = extract(&doc);
        assert_eq!(quotes.len(), 2);
        for q in &quotes {
            assert_eq!(q.speaker, "elle");
            assert_eq!(q.verb, "dit");
            assert_eq!(q.speaker_gender, Some(Gender::Female));
        }
        assert!(quotes[0].quote.contains("budget"));
        assert!(quotes[1].quote.contains("adopté"));
    }

    #[test]
    fn test_one_sided_quote_runs_to_end_of_line() {
        let doc = DocBuilder::french(
            "Paul Roy a déclaré que la réforme était urgente.\n\u{ab} Il faudra aller vite",
        )
        .tokens(&[
            "Paul Paul PROPN nsubj 3",
            "Roy Roy PROPN flat:name 0",
            "a avoir AUX aux 3",
            "déclaré déclarer VERB ROOT 3",
            "que que SCONJ mark 8",
            "la le DET det 6",
            "réforme réforme NOUN nsubj 8",
            "était être AUX cop 8",
            "urgente urgent ADJ ccomp 3",
            ". . PUNCT punct 3",
            "\" \" PUNCT punct 13",
            "Il il PRON expl:subj 12",
            "faudra falloir VERB ROOT 12",
            "aller aller VERB xcomp 12",
            "vite vite ADV advmod 13",
        ])
        .build();
        let quotes = extract(&doc);
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].quote_type, kind::INDIRECT);
        assert_eq!(quotes[0].quote, "la réforme était urgente");
        let one_sided = &quotes[1];
        assert_eq!(one_sided.quote_type, kind::ONE_SIDED);
        assert!(one_sided.is_floating_quote);
        assert_eq!(one_sided.quote, "\" Il faudra aller vite");
        assert_eq!(one_sided.reference, "Paul Roy");
    }

    #[test]
    fn test_speaker_gender_unknown_for_first_person() {
        let doc = DocBuilder::french("\u{ab} Nous partons \u{bb}, ai-je dit.")
            .tokens(&[
                "\" \" PUNCT punct 2",
                "Nous nous PRON nsubj 2",
                "partons partir VERB ccomp 7",
                "\" \" PUNCT punct 2",
                ", , PUNCT punct 7",
                "ai avoir AUX aux 7",
                "-je je PRON nsubj 7 Person=1",
                "dit dire VERB ROOT 7",
                ". . PUNCT punct 7",
            ])
            .build();
        let quotes = extract(&doc);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].speaker, "je");
        assert_eq!(quotes[0].speaker_gender, Some(Gender::Unknown));
    }
}
