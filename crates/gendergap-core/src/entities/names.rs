//! Person-name decomposition, compatibility and representative choice.

use std::collections::BTreeSet;

use strsim::levenshtein;

use crate::titles::{TitleGender, TitleTaxonomy};

/// Lowercase particles that open a surname (`de Montreuil`, `van Gogh`).
const PARTICLES: &[&str] = &["de", "des", "du", "d'", "van", "von", "der", "le", "la", "di", "da"];

/// A name split into first, middle and last parts, lowercased. A one-word
/// name is a last name only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first: Option<String>,
    pub middle: Vec<String>,
    pub last: Option<String>,
}

impl NameParts {
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
        match words.len() {
            0 => Self {
                first: None,
                middle: Vec::new(),
                last: None,
            },
            1 => Self {
                first: None,
                middle: Vec::new(),
                last: Some(words[0].clone()),
            },
            n => {
                let last_start = (1..n)
                    .find(|&i| i < n - 1 && PARTICLES.contains(&words[i].as_str()))
                    .unwrap_or(n - 1);
                Self {
                    first: Some(words[0].clone()),
                    middle: words[1..last_start].to_vec(),
                    last: Some(words[last_start..].join(" ")),
                }
            }
        }
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        usize::from(self.first.is_some())
            + self.middle.len()
            + self.last.as_ref().map_or(0, |l| l.split(' ').count())
    }
}

fn almost_equal(a: &str, b: &str) -> bool {
    levenshtein(a, b) <= 1
}

fn words(name: &str) -> BTreeSet<String> {
    name.split_whitespace().map(str::to_lowercase).collect()
}

/// Whether two cleaned person names can denote the same person.
#[must_use]
pub fn names_compatible(a: &str, b: &str) -> bool {
    let (la, lb) = (a.to_lowercase(), b.to_lowercase());
    if almost_equal(&la, &lb) {
        return true;
    }

    let (pa, pb) = (NameParts::parse(a), NameParts::parse(b));
    let (Some(last_a), Some(last_b)) = (&pa.last, &pb.last) else {
        return false;
    };

    if almost_equal(last_a, last_b) && (pa.first.is_some() || pb.first.is_some()) {
        return match (&pa.first, &pb.first) {
            (Some(fa), Some(fb)) => fa == fb || is_initial_of(fa, fb) || is_initial_of(fb, fa),
            _ => true,
        };
    }

    let (wa, wb) = (words(a), words(b));
    if (wa.is_subset(&wb) || wb.is_subset(&wa)) && !wa.is_empty() && !wb.is_empty() {
        return true;
    }

    pa.middle.iter().any(|m| m == last_b) || pb.middle.iter().any(|m| m == last_a)
}

/// `j.` or `j` is an initial of `jane`.
fn is_initial_of(initial: &str, full: &str) -> bool {
    let stem = initial.trim_end_matches('.');
    stem.chars().count() == 1 && full.starts_with(stem) && full.chars().count() > 1
}

/// Strictly female-titled against strictly male-titled never merge.
#[must_use]
pub fn titles_compatible(
    taxonomy: &TitleTaxonomy,
    a: &BTreeSet<String>,
    b: &BTreeSet<String>,
) -> bool {
    !matches!(
        (taxonomy.implied_gender(a), taxonomy.implied_gender(b)),
        (Some(TitleGender::Female), Some(TitleGender::Male))
            | (Some(TitleGender::Male), Some(TitleGender::Female))
    )
}

/// Ordering key for representative choice: first and last name over a
/// single word, then more middle names.
fn rank(name: &str) -> (bool, usize) {
    let parts = NameParts::parse(name);
    (
        parts.first.is_some() && parts.last.is_some(),
        parts.middle.len(),
    )
}

/// Whether `candidate` should replace `current` as representative. Ties
/// keep the current one.
#[must_use]
pub fn is_better_representative(taxonomy: &TitleTaxonomy, current: &str, candidate: &str) -> bool {
    rank(&taxonomy.strip_titles(candidate)) > rank(&taxonomy.strip_titles(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parts() {
        let p = NameParts::parse("Gabriel García Márquez");
        assert_eq!(p.first.as_deref(), Some("gabriel"));
        assert_eq!(p.middle, vec!["garcía"]);
        assert_eq!(p.last.as_deref(), Some("márquez"));

        let p = NameParts::parse("Jean Marais de Montreuil");
        assert_eq!(p.middle, vec!["marais"]);
        assert_eq!(p.last.as_deref(), Some("de montreuil"));
        assert_eq!(p.word_count(), 4);

        let p = NameParts::parse("Smith");
        assert_eq!(p.first, None);
        assert_eq!(p.last.as_deref(), Some("smith"));
    }

    #[test]
    fn test_compatible_names() {
        assert!(names_compatible("Jane Smith", "Smith"));
        assert!(names_compatible("Jane Smith", "Jane Smyth"));
        assert!(names_compatible("J. Smith", "Jane Smith"));
        assert!(names_compatible("Marie Martin", "Marie Claire Martin"));
        assert!(names_compatible("Gabriel García Márquez", "García"));
        assert!(!names_compatible("Jane Smith", "John Smith"));
        assert!(!names_compatible("Jane Smith", "Pierre Durand"));
    }

    #[test]
    fn test_titles_block_merge() {
        let taxonomy = TitleTaxonomy::default();
        let set = |w: &[&str]| w.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>();
        assert!(!titles_compatible(&taxonomy, &set(&["mme"]), &set(&["m"])));
        assert!(titles_compatible(&taxonomy, &set(&["mme"]), &set(&["dr"])));
        assert!(titles_compatible(&taxonomy, &set(&[]), &set(&["m"])));
    }

    #[test]
    fn test_representative_choice() {
        let taxonomy = TitleTaxonomy::default();
        assert!(is_better_representative(&taxonomy, "Smith", "Jane Smith"));
        assert!(!is_better_representative(&taxonomy, "Jane Smith", "Smith"));
        assert!(!is_better_representative(&taxonomy, "Jane Smith", "John Doe"));
        assert!(is_better_representative(&taxonomy, "Jane Smith", "Jane Ann Smith"));
        assert!(!is_better_representative(&taxonomy, "Mme Martin", "Dr Martin"));
    }
}
