use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Language;

/// Characters normalized to a plain space. Every one maps 1:1 so offsets hold.
/// The soft hyphen is not among them: it sits inside words.
const SPACE_LIKE: &[char] = &[
    '\u{a0}',  // no-break space
    '\u{202f}', // narrow no-break space (French typography)
    '\u{2007}', // figure space
    '\u{2009}', // thin space
    '\u{feff}', // stray BOM
];

const DOUBLE_QUOTE_LIKE: &[char] = &[
    '\u{201c}', '\u{201d}', '\u{201e}', '\u{201f}', '\u{ab}', '\u{bb}', '\u{301d}', '\u{301e}',
    '\u{ff02}', '\u{300c}', '\u{300d}', '\u{300e}', '\u{300f}',
];

const SINGLE_QUOTE_LIKE: &[char] = &['\u{2018}', '\u{2019}', '\u{201a}', '\u{201b}'];

const OPEN_GUILLEMET: char = '\u{ab}';
const CLOSE_GUILLEMET: char = '\u{bb}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Force a sentence break at every newline by inserting a period.
    pub period_before_newline: bool,
    /// Collapse runs of spaces. Shifts offsets, so it is off unless the
    /// downstream consumer re-derives every offset from the output.
    pub collapse_spaces: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            period_before_newline: true,
            collapse_spaces: false,
        }
    }
}

/// Preprocessed article body plus the out-of-band guillemet memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessedText {
    pub language: Language,
    pub text: String,
    /// Character offsets (in `text`) that held an opening `«`.
    pub start_guillemets: BTreeSet<usize>,
    /// Character offsets (in `text`) that held a closing `»`.
    pub end_guillemets: BTreeSet<usize>,
}

impl PreprocessedText {
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    #[must_use]
    pub fn is_start_guillemet(&self, offset: usize) -> bool {
        self.start_guillemets.contains(&offset)
    }

    #[must_use]
    pub fn is_end_guillemet(&self, offset: usize) -> bool {
        self.end_guillemets.contains(&offset)
    }
}

pub fn preprocess(raw: &str, language: Language) -> PreprocessedText {
    preprocess_with(raw, language, PreprocessOptions::default())
}

pub fn preprocess_with(raw: &str, language: Language, options: PreprocessOptions) -> PreprocessedText {
    let mut chars: Vec<char> = raw
        .chars()
        .map(|c| if SPACE_LIKE.contains(&c) { ' ' } else { c })
        .collect();

    if options.period_before_newline {
        chars = insert_periods(&chars);
    }

    if options.collapse_spaces {
        chars.dedup_by(|a, b| *a == ' ' && *b == ' ');
    }

    let mut start_guillemets = BTreeSet::new();
    let mut end_guillemets = BTreeSet::new();

    let text = chars
        .iter()
        .enumerate()
        .map(|(offset, &c)| {
            if language == Language::French {
                if c == OPEN_GUILLEMET {
                    start_guillemets.insert(offset);
                } else if c == CLOSE_GUILLEMET {
                    end_guillemets.insert(offset);
                }
            }
            unify_quote(c)
        })
        .collect();

    PreprocessedText {
        language,
        text,
        start_guillemets,
        end_guillemets,
    }
}

/// `"end\n"` becomes `"end.\n"`; an existing period is not doubled.
fn insert_periods(chars: &[char]) -> Vec<char> {
    let mut out = Vec::with_capacity(chars.len() + chars.len() / 16);
    for &c in chars {
        if c == '\n' && out.last() != Some(&'.') {
            out.push('.');
        }
        out.push(c);
    }
    out
}

fn unify_quote(c: char) -> char {
    if DOUBLE_QUOTE_LIKE.contains(&c) {
        '"'
    } else if SINGLE_QUOTE_LIKE.contains(&c) {
        '\''
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unifies_quote_marks() {
        let out = preprocess("\u{201c}Hi\u{201d} and \u{ab}salut\u{bb}", Language::English);
        assert_eq!(out.text, "\"Hi\" and \"salut\"");
        assert!(out.start_guillemets.is_empty());
    }

    #[test]
    fn test_records_guillemets_for_french() {
        let raw = "\u{ab}\u{a0}Nous devons agir\u{a0}\u{bb}, a dit Marie.";
        let out = preprocess(raw, Language::French);
        assert_eq!(out.text, "\" Nous devons agir \", a dit Marie.");
        assert_eq!(out.start_guillemets.iter().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(out.end_guillemets.iter().copied().collect::<Vec<_>>(), vec![19]);
    }

    #[test]
    fn test_guillemet_offsets_follow_period_insertion() {
        let raw = "Titre\n\u{ab}Oui\u{bb}";
        let out = preprocess(raw, Language::French);
        assert_eq!(out.text, "Titre.\n\"Oui\"");
        assert!(out.is_start_guillemet(7));
        assert!(out.is_end_guillemet(11));
    }

    #[test]
    fn test_period_before_newline() {
        let out = preprocess("One\nTwo.\nThree\n\nFour", Language::English);
        assert_eq!(out.text, "One.\nTwo.\nThree.\n.\nFour");
    }

    #[test]
    fn test_length_preserved_without_newlines() {
        let raw = "A\u{a0}b \u{2019}c\u{2019} \u{201c}d\u{201d}...";
        let out = preprocess(raw, Language::English);
        assert_eq!(out.char_len(), raw.chars().count());
        assert!(out.text.ends_with("..."));
    }

    #[test]
    fn test_only_inserts() {
        let raw = "a\nb.\nc\n";
        let out = preprocess(raw, Language::English);
        let inserted = raw.matches('\n').count() - 1;
        assert_eq!(out.char_len(), raw.chars().count() + inserted);
    }

    #[test]
    fn test_soft_hyphen_kept_inside_words() {
        let raw = "Jean\u{ad}Pierre\u{a0}Roy";
        let out = preprocess(raw, Language::French);
        assert_eq!(out.text, "Jean\u{ad}Pierre Roy");
        assert_eq!(out.text.split_whitespace().count(), 2);
        assert_eq!(out.char_len(), raw.chars().count());
    }

    #[test]
    fn test_collapse_spaces_option() {
        let options = PreprocessOptions {
            period_before_newline: false,
            collapse_spaces: true,
        };
        let out = preprocess_with("a  b\u{a0} c", Language::English, options);
        assert_eq!(out.text, "a b c");
    }
}
