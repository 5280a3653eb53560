use crate::lexicon::AuthorBlocklist;
use crate::titles::TitleTaxonomy;

const SEPARATORS: &[&str] = &[", ", " and ", " & ", " et "];

const MIN_AUTHOR_WORDS: usize = 2;

/// Turns raw byline strings into person names.
#[derive(Debug, Clone, Default)]
pub struct AuthorCleaner {
    blocklist: AuthorBlocklist,
    titles: TitleTaxonomy,
}

impl AuthorCleaner {
    #[must_use]
    pub fn new(blocklist: AuthorBlocklist, titles: TitleTaxonomy) -> Self {
        Self { blocklist, titles }
    }

    /// Blocklisted bylines go first, then the rest are split on separators,
    /// title-stripped, and kept when they look like a full name. Order is
    /// preserved and duplicates dropped.
    #[must_use]
    pub fn clean(&self, authors: &[String]) -> Vec<String> {
        let mut cleaned: Vec<String> = Vec::new();
        for author in authors {
            if self.blocklist.is_blocked(author) {
                continue;
            }
            for part in split_authors(author) {
                if self.blocklist.is_blocked(&part) {
                    continue;
                }
                let name = self.titles.strip_titles(&part);
                if name.chars().any(|c| c.is_ascii_digit())
                    || name.split_whitespace().count() < MIN_AUTHOR_WORDS
                {
                    continue;
                }
                if !cleaned.contains(&name) {
                    cleaned.push(name);
                }
            }
        }
        cleaned
    }
}

fn split_authors(author: &str) -> Vec<String> {
    let mut parts = vec![author.to_string()];
    for sep in SEPARATORS {
        parts = parts
            .iter()
            .flat_map(|p| p.split(sep))
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|p| !p.is_empty())
            .collect();
    }
    parts
}
