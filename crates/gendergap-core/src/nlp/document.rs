use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::parser::{ParseError, ParseResult};
use super::preprocess::PreprocessedText;
use super::relation::{Pos, Relation};
use super::span::CharSpan;
use super::Language;

const SENTENCE_TERMINALS: &[&str] = &[".", "!", "?", "...", "\u{2026}"];

/// Wire form of a parsed token, as produced by the parser service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawToken {
    pub text: String,
    #[serde(default)]
    pub lemma: String,
    pub pos: Pos,
    #[serde(default)]
    pub tag: String,
    pub dep: String,
    pub head: usize,
    #[serde(default)]
    pub morph: String,
    /// Character offset of the token in the document text.
    pub idx: usize,
}

/// Token range, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntity {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    pub text: String,
    pub tokens: Vec<RawToken>,
    #[serde(default)]
    pub sents: Vec<RawSpan>,
    #[serde(default)]
    pub ents: Vec<RawEntity>,
    /// chain -> mention -> head token indices
    #[serde(default)]
    pub coref_chains: Vec<Vec<Vec<usize>>>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub i: usize,
    pub text: String,
    pub lemma: String,
    pub pos: Pos,
    pub tag: String,
    pub dep: String,
    pub head: usize,
    pub morph: String,
    pub idx: usize,
    pub rel: Relation,
    char_len: usize,
}

impl Token {
    #[must_use]
    pub const fn span(&self) -> CharSpan {
        CharSpan::new(self.idx, self.idx + self.char_len)
    }

    #[must_use]
    pub const fn end_char(&self) -> usize {
        self.idx + self.char_len
    }

    #[must_use]
    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }

    #[must_use]
    pub fn lemma_lower(&self) -> String {
        self.lemma.to_lowercase()
    }

    #[must_use]
    pub fn is(&self, rel: Relation) -> bool {
        self.rel == rel
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.head == self.i
    }

    #[must_use]
    pub fn is_punct(&self) -> bool {
        self.pos == Pos::Punct || self.rel == Relation::Punctuation
    }

    #[must_use]
    pub fn is_quote_mark(&self) -> bool {
        self.text == "\""
    }

    #[must_use]
    pub fn is_sentence_terminal(&self) -> bool {
        SENTENCE_TERMINALS.contains(&self.text.as_str())
    }

    #[must_use]
    pub fn contains_newline(&self) -> bool {
        self.text.contains('\n')
    }

    /// First letter uppercase, rest lowercase, alphabetic.
    #[must_use]
    pub fn is_title_case(&self) -> bool {
        let mut chars = self.text.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        first.is_uppercase()
            && self.text.chars().all(char::is_alphabetic)
            && chars.all(|c| !c.is_uppercase())
    }

    #[must_use]
    pub fn morph_value(&self, key: &str) -> Option<&str> {
        self.morph
            .split('|')
            .filter_map(|feat| feat.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntity {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

impl NamedEntity {
    #[must_use]
    pub fn is_person(&self) -> bool {
        matches!(self.label.as_str(), "PERSON" | "PER")
    }

    #[must_use]
    pub const fn tokens(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Mentions asserted by the parser to co-refer. Each mention is the list of
/// its head token indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorefChain {
    pub mentions: Vec<Vec<usize>>,
}

/// A parsed article: tokens, dependency tree, sentences, entities and
/// coreference chains, with character offsets into the preprocessed text.
#[derive(Debug, Clone)]
pub struct Document {
    language: Language,
    text: String,
    char_to_byte: Vec<usize>,
    tokens: Vec<Token>,
    children: Vec<Vec<usize>>,
    left_edge: Vec<usize>,
    right_edge: Vec<usize>,
    sents: Vec<Range<usize>>,
    sent_of: Vec<usize>,
    ents: Vec<NamedEntity>,
    coref_chains: Vec<CorefChain>,
    start_guillemets: BTreeSet<usize>,
    end_guillemets: BTreeSet<usize>,
}

impl Document {
    /// Validate a parser response against the text it was computed from and
    /// derive the tree structure the extractors query.
    pub fn from_raw(raw: RawDocument, pre: &PreprocessedText) -> ParseResult<Self> {
        if raw.text != pre.text {
            return Err(ParseError::TextMismatch);
        }

        let char_to_byte: Vec<usize> = raw
            .text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(raw.text.len()))
            .collect();
        let char_len = char_to_byte.len() - 1;
        let n = raw.tokens.len();

        let mut tokens = Vec::with_capacity(n);
        for (i, rt) in raw.tokens.into_iter().enumerate() {
            let len = rt.text.chars().count();
            CharSpan::checked(rt.idx, rt.idx + len, char_len)?;
            if rt.head >= n {
                return Err(ParseError::InvalidHead { token: i, head: rt.head });
            }
            tokens.push(Token {
                i,
                rel: Relation::from_label(pre.language, &rt.dep),
                text: rt.text,
                lemma: rt.lemma,
                pos: rt.pos,
                tag: rt.tag,
                dep: rt.dep,
                head: rt.head,
                morph: rt.morph,
                idx: rt.idx,
                char_len: len,
            });
        }

        let mut children = vec![Vec::new(); n];
        for tok in &tokens {
            if tok.head != tok.i {
                children[tok.head].push(tok.i);
            }
        }

        let (left_edge, right_edge) = subtree_edges(&tokens, &children);

        let sents = if raw.sents.is_empty() {
            derive_sentences(&tokens)
        } else {
            validated_ranges(raw.sents.iter().map(|s| s.start..s.end), n)?
        };
        let mut sent_of = vec![0; n];
        for (si, range) in sents.iter().enumerate() {
            for slot in &mut sent_of[range.clone()] {
                *slot = si;
            }
        }

        let mut ents = Vec::with_capacity(raw.ents.len());
        for ent in raw.ents {
            validated_ranges(std::iter::once(ent.start..ent.end), n)?;
            ents.push(NamedEntity {
                start: ent.start,
                end: ent.end,
                label: ent.label,
            });
        }

        let mut coref_chains = Vec::with_capacity(raw.coref_chains.len());
        for chain in raw.coref_chains {
            if let Some(&bad) = chain.iter().flatten().find(|&&t| t >= n) {
                return Err(ParseError::InvalidHead { token: bad, head: bad });
            }
            coref_chains.push(CorefChain { mentions: chain });
        }

        Ok(Self {
            language: pre.language,
            text: raw.text,
            char_to_byte,
            tokens,
            children,
            left_edge,
            right_edge,
            sents,
            sent_of,
            ents,
            coref_chains,
            start_guillemets: pre.start_guillemets.clone(),
            end_guillemets: pre.end_guillemets.clone(),
        })
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        self.char_to_byte.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn token(&self, i: usize) -> &Token {
        &self.tokens[i]
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Token> {
        self.tokens.get(i)
    }

    #[must_use]
    pub fn children(&self, i: usize) -> &[usize] {
        &self.children[i]
    }

    pub fn children_with(&self, i: usize, rel: Relation) -> impl Iterator<Item = usize> + '_ {
        self.children[i]
            .iter()
            .copied()
            .filter(move |&c| self.tokens[c].rel == rel)
    }

    /// Token range covered by the subtree rooted at `i`.
    #[must_use]
    pub fn subtree(&self, i: usize) -> Range<usize> {
        self.left_edge[i]..self.right_edge[i] + 1
    }

    #[must_use]
    pub fn right_edge(&self, i: usize) -> usize {
        self.right_edge[i]
    }

    #[must_use]
    pub fn left_edge(&self, i: usize) -> usize {
        self.left_edge[i]
    }

    /// Whether `ancestor` dominates `i` in the dependency tree.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: usize, i: usize) -> bool {
        let mut cur = i;
        for _ in 0..self.tokens.len() {
            let head = self.tokens[cur].head;
            if head == cur {
                return false;
            }
            if head == ancestor {
                return true;
            }
            cur = head;
        }
        false
    }

    #[must_use]
    pub fn sentences(&self) -> &[Range<usize>] {
        &self.sents
    }

    #[must_use]
    pub fn sentence_index(&self, i: usize) -> usize {
        self.sent_of[i]
    }

    #[must_use]
    pub fn sentence_of(&self, i: usize) -> Range<usize> {
        self.sents[self.sent_of[i]].clone()
    }

    #[must_use]
    pub fn ents(&self) -> &[NamedEntity] {
        &self.ents
    }

    pub fn person_entities(&self) -> impl Iterator<Item = &NamedEntity> {
        self.ents.iter().filter(|e| e.is_person())
    }

    /// Replace the entity layer, e.g. after applying custom name patterns.
    pub fn set_ents(&mut self, ents: Vec<NamedEntity>) {
        self.ents = ents;
    }

    #[must_use]
    pub fn coref_chains(&self) -> &[CorefChain] {
        &self.coref_chains
    }

    #[must_use]
    pub fn is_start_guillemet(&self, offset: usize) -> bool {
        self.start_guillemets.contains(&offset)
    }

    #[must_use]
    pub fn is_end_guillemet(&self, offset: usize) -> bool {
        self.end_guillemets.contains(&offset)
    }

    #[must_use]
    pub fn has_guillemet_pair_within(&self, span: CharSpan) -> bool {
        let Some(&open) = self.start_guillemets.range(span.start..span.end).next() else {
            return false;
        };
        self.end_guillemets.range(open + 1..span.end).next().is_some()
    }

    /// Character span of a token range. Empty ranges yield an empty span at
    /// the start token.
    #[must_use]
    pub fn char_span(&self, range: Range<usize>) -> CharSpan {
        if range.is_empty() {
            let at = self
                .tokens
                .get(range.start)
                .map_or_else(|| self.char_len(), |t| t.idx);
            return CharSpan::new(at, at);
        }
        CharSpan::new(self.tokens[range.start].idx, self.tokens[range.end - 1].end_char())
    }

    #[must_use]
    pub fn slice(&self, span: CharSpan) -> &str {
        let len = self.char_len();
        let start = self.char_to_byte[span.start.min(len)];
        let end = self.char_to_byte[span.end.min(len)];
        &self.text[start..end]
    }

    /// Character offset of a byte offset into [`Document::text`], e.g. a regex
    /// match boundary.
    #[must_use]
    pub fn char_at_byte(&self, byte: usize) -> usize {
        self.char_to_byte.partition_point(|&b| b < byte)
    }

    #[must_use]
    pub fn span_text(&self, range: Range<usize>) -> &str {
        self.slice(self.char_span(range))
    }

    /// Tokens overlapping the character span.
    #[must_use]
    pub fn token_range(&self, span: CharSpan) -> Range<usize> {
        let start = self
            .tokens
            .iter()
            .position(|t| t.end_char() > span.start)
            .unwrap_or(self.tokens.len());
        let end = self.tokens[start..]
            .iter()
            .position(|t| t.idx >= span.end)
            .map_or(self.tokens.len(), |p| start + p);
        start..end.max(start)
    }

    #[must_use]
    pub fn token_at_char(&self, offset: usize) -> Option<usize> {
        self.tokens
            .iter()
            .position(|t| t.idx <= offset && offset < t.end_char())
    }

    /// Syntactic head of a token range: the leftmost non-punctuation token
    /// whose head lies outside the range, falling back to any such token.
    #[must_use]
    pub fn root_of(&self, range: Range<usize>) -> usize {
        let outside = |t: &Token| t.is_root() || !range.contains(&t.head);
        let candidates = &self.tokens[range.clone()];
        candidates
            .iter()
            .find(|t| outside(t) && !t.is_punct())
            .or_else(|| candidates.iter().find(|t| outside(t)))
            .map_or(range.start, |t| t.i)
    }
}

fn validated_ranges(
    ranges: impl Iterator<Item = Range<usize>>,
    n: usize,
) -> ParseResult<Vec<Range<usize>>> {
    ranges
        .map(|r| {
            if r.start > r.end || r.end > n {
                Err(ParseError::InvalidRange { start: r.start, end: r.end })
            } else {
                Ok(r)
            }
        })
        .collect()
}

/// Split on terminal punctuation and newlines when the parser sent no
/// sentence boundaries.
fn derive_sentences(tokens: &[Token]) -> Vec<Range<usize>> {
    let mut sents = Vec::new();
    let mut start = 0;
    // A closing mark hugs the punctuation before it: `end."` vs `end. "Next`.
    let attached = |a: &Token, b: &Token| a.end_char() == b.idx;
    for (i, tok) in tokens.iter().enumerate() {
        let next_is_closer = tokens
            .get(i + 1)
            .is_some_and(|t| (t.is_quote_mark() || t.text == ")") && attached(tok, t));
        if (tok.is_sentence_terminal() && !next_is_closer) || tok.contains_newline() {
            sents.push(start..i + 1);
            start = i + 1;
        } else if tok.is_quote_mark()
            && i > 0
            && tokens[i - 1].is_sentence_terminal()
            && attached(&tokens[i - 1], tok)
        {
            sents.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < tokens.len() {
        sents.push(start..tokens.len());
    }
    sents
}

/// Leftmost and rightmost token of every subtree. Tokens caught in a head
/// cycle keep themselves as both edges.
fn subtree_edges(tokens: &[Token], children: &[Vec<usize>]) -> (Vec<usize>, Vec<usize>) {
    let n = tokens.len();
    let mut left: Vec<usize> = (0..n).collect();
    let mut right: Vec<usize> = (0..n).collect();
    let mut order = Vec::with_capacity(n);
    let mut stack: Vec<(usize, bool)> = tokens
        .iter()
        .filter(|t| t.is_root())
        .map(|t| (t.i, false))
        .collect();
    let mut seen = vec![false; n];

    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            order.push(i);
            continue;
        }
        if seen[i] {
            continue;
        }
        seen[i] = true;
        stack.push((i, true));
        for &c in &children[i] {
            stack.push((c, false));
        }
    }

    for &i in &order {
        for &c in &children[i] {
            left[i] = left[i].min(left[c]);
            right[i] = right[i].max(right[c]);
        }
    }
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::testing::DocBuilder;

    fn minister() -> Document {
        DocBuilder::english("The minister said the policy was working.")
            .tokens(&[
                "The the DET det 1",
                "minister minister NOUN nsubj 2",
                "said say VERB ROOT 2",
                "the the DET det 4",
                "policy policy NOUN nsubj 6",
                "was be AUX aux 6",
                "working work VERB ccomp 2",
                ". . PUNCT punct 2",
            ])
            .build()
    }

    #[test]
    fn test_subtree_and_root() {
        let doc = minister();
        assert_eq!(doc.subtree(6), 3..7);
        assert_eq!(doc.subtree(2), 0..8);
        assert_eq!(doc.root_of(0..2), 1);
        assert_eq!(doc.span_text(doc.subtree(6)), "the policy was working");
    }

    #[test]
    fn test_char_span_and_token_range() {
        let doc = minister();
        let span = doc.char_span(3..7);
        assert_eq!(span, CharSpan::new(18, 40));
        assert_eq!(doc.token_range(span), 3..7);
        assert_eq!(doc.token_at_char(5), Some(1));
    }

    #[test]
    fn test_derived_sentences() {
        let doc = DocBuilder::english("One two. Three four.")
            .tokens(&[
                "One one NUM nsubj 1",
                "two two NUM ROOT 1",
                ". . PUNCT punct 1",
                "Three three NUM nsubj 4",
                "four four NUM ROOT 4",
                ". . PUNCT punct 4",
            ])
            .build();
        assert_eq!(doc.sentences(), &[0..3, 3..6]);
        assert_eq!(doc.sentence_of(4), 3..6);
    }

    #[test]
    fn test_rejects_out_of_bounds_token() {
        let pre = crate::nlp::preprocess("Hi", Language::English);
        let raw = RawDocument {
            text: "Hi".into(),
            tokens: vec![RawToken {
                text: "Hello".into(),
                lemma: String::new(),
                pos: Pos::Intj,
                tag: String::new(),
                dep: "ROOT".into(),
                head: 0,
                morph: String::new(),
                idx: 0,
            }],
            ..Default::default()
        };
        assert!(matches!(
            Document::from_raw(raw, &pre),
            Err(ParseError::MalformedSpan(_))
        ));
    }

    #[test]
    fn test_morph_and_case() {
        let doc = DocBuilder::french("Elle parle.")
            .tokens(&[
                "Elle il PRON nsubj 1 Gender=Fem|Number=Sing|Person=3",
                "parle parler VERB ROOT 1",
                ". . PUNCT punct 1",
            ])
            .build();
        assert_eq!(doc.token(0).morph_value("Gender"), Some("Fem"));
        assert_eq!(doc.token(0).morph_value("Definite"), None);
        assert!(doc.token(0).is_title_case());
        assert!(doc.token(0).is(Relation::NominalSubject));
    }
}
