//! Hand-built parses for unit tests.

use super::document::{Document, RawDocument, RawEntity, RawSpan, RawToken};
use super::preprocess::{preprocess, PreprocessedText};
use super::relation::Pos;
use super::Language;

pub struct DocBuilder {
    pre: PreprocessedText,
    chars: Vec<char>,
    cursor: usize,
    raw: RawDocument,
}

impl DocBuilder {
    pub fn new(pre: PreprocessedText) -> Self {
        let chars = pre.text.chars().collect();
        let raw = RawDocument {
            text: pre.text.clone(),
            ..Default::default()
        };
        Self {
            pre,
            chars,
            cursor: 0,
            raw,
        }
    }

    pub fn english(raw_text: &str) -> Self {
        Self::new(preprocess(raw_text, Language::English))
    }

    pub fn french(raw_text: &str) -> Self {
        Self::new(preprocess(raw_text, Language::French))
    }

    /// Each line is `text lemma POS dep head [morph]`, head being an absolute
    /// token index. Offsets are found by scanning the text left to right.
    pub fn tokens(mut self, lines: &[&str]) -> Self {
        for line in lines {
            let fields: Vec<&str> = line.split_whitespace().collect();
            assert!(fields.len() >= 5, "bad token line: {line}");
            let text = fields[0];
            let idx = self.locate(text);
            let pos: Pos = serde_json::from_value(serde_json::Value::String(fields[2].into()))
                .expect("pos tag");
            self.raw.tokens.push(RawToken {
                text: text.to_string(),
                lemma: fields[1].to_string(),
                pos,
                tag: String::new(),
                dep: fields[3].to_string(),
                head: fields[4].parse().expect("head index"),
                morph: fields.get(5).copied().unwrap_or_default().to_string(),
                idx,
            });
        }
        self
    }

    pub fn ent(mut self, start: usize, end: usize, label: &str) -> Self {
        self.raw.ents.push(RawEntity {
            start,
            end,
            label: label.to_string(),
        });
        self
    }

    pub fn chain(mut self, mentions: &[&[usize]]) -> Self {
        self.raw
            .coref_chains
            .push(mentions.iter().map(|m| m.to_vec()).collect());
        self
    }

    pub fn sents(mut self, ranges: &[(usize, usize)]) -> Self {
        self.raw.sents = ranges
            .iter()
            .map(|&(start, end)| RawSpan { start, end })
            .collect();
        self
    }

    pub fn build(self) -> Document {
        Document::from_raw(self.raw, &self.pre).expect("valid test document")
    }

    fn locate(&mut self, text: &str) -> usize {
        let needle: Vec<char> = text.chars().collect();
        let found = (self.cursor..=self.chars.len().saturating_sub(needle.len()))
            .find(|&i| self.chars[i..i + needle.len()] == needle[..])
            .unwrap_or_else(|| panic!("token {text:?} not found after offset {}", self.cursor));
        self.cursor = found + needle.len();
        found
    }
}
