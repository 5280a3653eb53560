//! People mentioned in an article: each a representative name with the
//! character spans of every mention head and the titles seen with it.

mod merger;
mod names;

use std::collections::BTreeSet;
use std::ops::Range;

use serde::Serialize;

use crate::nlp::{CharSpan, Document, Pos};
use crate::titles::TitleTaxonomy;

pub use merger::EntityMerger;
pub use names::{is_better_representative, names_compatible, titles_compatible, NameParts};

/// Head spans of one mention, one per coordinated head.
pub type HeadSpans = Vec<CharSpan>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub representative: String,
    pub mentions: BTreeSet<HeadSpans>,
    pub titles: BTreeSet<String>,
    /// Built from coordinated names (`Pierre Durand and Marie Martin`).
    /// Such an entity resolves quote speakers but is not a person.
    #[serde(skip)]
    pub coordinated: bool,
}

impl Entity {
    /// Whether some mention covers `heads` element-wise. Tuples of different
    /// lengths never match.
    #[must_use]
    pub fn covers(&self, heads: &[CharSpan]) -> bool {
        self.mentions.iter().any(|m| tuple_covers(m, heads))
    }

    #[must_use]
    pub const fn is_multi_head(&self) -> bool {
        self.coordinated
    }
}

/// Head of a name span. A title heading the span (`Mme` in `Mme Marie
/// Martin`) yields to its first proper-noun dependent inside the span, so
/// that entity keys and speaker heads land on the same token.
#[must_use]
pub fn name_head(doc: &Document, range: Range<usize>, titles: &TitleTaxonomy) -> usize {
    let head = doc.root_of(range.clone());
    if !titles.is_title(&doc.token(head).text) {
        return head;
    }
    doc.children(head)
        .iter()
        .copied()
        .find(|&c| range.contains(&c) && doc.token(c).pos == Pos::Propn)
        .unwrap_or(head)
}

#[must_use]
pub fn tuple_covers(mention: &[CharSpan], heads: &[CharSpan]) -> bool {
    mention.len() == heads.len() && mention.iter().zip(heads).all(|(m, h)| m.covers(h))
}

/// Entities in order of first mention. Representatives are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntityMap {
    entities: Vec<Entity>,
}

impl EntityMap {
    #[must_use]
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    #[must_use]
    pub fn get(&self, representative: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.representative == representative)
    }

    /// Entities that name one person.
    pub fn people(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| !e.coordinated)
    }

    /// Representative names of [`Self::people`].
    pub fn representatives(&self) -> impl Iterator<Item = &str> {
        self.people().map(|e| e.representative.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_cover_needs_equal_length() {
        let a = CharSpan::new(0, 5);
        let b = CharSpan::new(10, 14);
        assert!(tuple_covers(&[a, b], &[CharSpan::new(1, 4), CharSpan::new(10, 14)]));
        assert!(!tuple_covers(&[a, b], &[a]));
        assert!(!tuple_covers(&[a], &[b]));
    }

    #[test]
    fn test_coordinated_entity_is_not_a_person() {
        let span = |s, e| vec![CharSpan::new(s, e)];
        let map = EntityMap::new(vec![
            Entity {
                representative: "Pierre Durand".into(),
                mentions: BTreeSet::from([span(7, 13)]),
                titles: BTreeSet::new(),
                coordinated: false,
            },
            Entity {
                representative: "Pierre Durand and Marie Martin".into(),
                mentions: BTreeSet::from([vec![CharSpan::new(7, 13), CharSpan::new(25, 31)]]),
                titles: BTreeSet::new(),
                coordinated: true,
            },
        ]);
        assert_eq!(map.representatives().collect::<Vec<_>>(), vec!["Pierre Durand"]);
        assert_eq!(map.people().count(), 1);
        let joint = map.get("Pierre Durand and Marie Martin").unwrap();
        assert!(joint.covers(&[CharSpan::new(7, 13), CharSpan::new(25, 31)]));
        assert_eq!(map.len(), 2);
    }
}
