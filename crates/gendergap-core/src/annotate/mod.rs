//! Gender annotation of an article's authors, people and sources.

mod authors;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::article::{Annotation, GenderSplit};
use crate::entities::EntityMap;
use crate::gender::{hard_rule, Gender, GenderOracle};
use crate::quotes::Quote;
use crate::titles::{TitleGender, TitleTaxonomy};

pub use authors::AuthorCleaner;

/// Resolves every name of an article with at most one oracle call and
/// aggregates the result.
pub struct GenderAnnotator {
    oracle: Arc<dyn GenderOracle>,
    authors: AuthorCleaner,
    titles: TitleTaxonomy,
}

impl GenderAnnotator {
    #[must_use]
    pub fn new(oracle: Arc<dyn GenderOracle>) -> Self {
        Self {
            oracle,
            authors: AuthorCleaner::default(),
            titles: TitleTaxonomy::default(),
        }
    }

    #[must_use]
    pub fn with_author_cleaner(mut self, authors: AuthorCleaner) -> Self {
        self.authors = authors;
        self
    }

    #[must_use]
    pub fn with_titles(mut self, titles: TitleTaxonomy) -> Self {
        self.titles = titles;
        self
    }

    /// An unreachable oracle is a warning: the names it would have answered
    /// stay unknown and the record is still produced.
    pub async fn annotate(
        &self,
        raw_authors: &[String],
        entities: &EntityMap,
        quotes: Vec<Quote>,
    ) -> Annotation {
        let authors = self.authors.clean(raw_authors);
        let people: Vec<String> = entities.representatives().map(String::from).collect();

        let referenced: HashSet<&str> = quotes.iter().map(|q| q.reference.as_str()).collect();
        let sources: Vec<String> = people
            .iter()
            .filter(|p| referenced.contains(p.as_str()))
            .cloned()
            .collect();
        let source_set: HashSet<&str> = sources.iter().map(String::as_str).collect();
        let speakers_not_counted_in_sources = quotes
            .iter()
            .filter(|q| !source_set.contains(q.reference.as_str()))
            .count();

        let mut genders: HashMap<String, Gender> = HashMap::new();
        for entity in entities.people() {
            if let Some(gender) = self.title_rule(entity.titles.iter()) {
                genders.insert(entity.representative.clone(), gender);
            }
        }
        let mut pending: Vec<String> = Vec::new();
        for name in authors.iter().chain(&people) {
            if genders.contains_key(name) {
                continue;
            }
            match hard_rule(name) {
                Some(gender) => {
                    genders.insert(name.clone(), gender);
                }
                None if !pending.contains(name) => pending.push(name.clone()),
                None => {}
            }
        }
        genders.extend(self.lookup(&pending).await);

        tracing::debug!(
            authors = authors.len(),
            people = people.len(),
            sources = sources.len(),
            looked_up = pending.len(),
            "gender annotation"
        );

        Annotation::build(
            split(authors, &genders),
            split(people, &genders),
            split(sources, &genders),
            quotes,
            speakers_not_counted_in_sources,
        )
    }

    fn title_rule<'a>(&self, titles: impl IntoIterator<Item = &'a String>) -> Option<Gender> {
        match self.titles.implied_gender(titles)? {
            TitleGender::Female => Some(Gender::Female),
            TitleGender::Male => Some(Gender::Male),
            TitleGender::Mixed => None,
        }
    }

    async fn lookup(&self, names: &[String]) -> HashMap<String, Gender> {
        if names.is_empty() {
            return HashMap::new();
        }
        match self.oracle.genders(names).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(names = names.len(), error = %e, "gender service unavailable");
                HashMap::new()
            }
        }
    }
}

fn split(names: Vec<String>, genders: &HashMap<String, Gender>) -> GenderSplit {
    let mut out = GenderSplit::default();
    for name in &names {
        let bucket = match genders.get(name).copied().unwrap_or(Gender::Unknown) {
            Gender::Female => &mut out.female,
            Gender::Male => &mut out.male,
            Gender::Unknown => &mut out.unknown,
            Gender::Editorial => &mut out.editorial,
        };
        bucket.push(name.clone());
    }
    out.all = names;
    out
}
