use std::collections::BTreeSet;
use std::ops::Range;

use petgraph::unionfind::UnionFind;

use super::names::{is_better_representative, names_compatible, titles_compatible};
use super::{name_head, Entity, EntityMap, HeadSpans};
use crate::nlp::{CharSpan, Document, NamedEntity, Pos, Relation};
use crate::titles::TitleTaxonomy;

/// Tokens that end a name: appositions, parentheticals, possessives.
const CUT_TOKENS: &[&str] = &[",", ";", ":", "(", ")", "\"", "'s", "’s", "|"];

/// Prepositions opening a `de Montreuil` tail.
const DE_PARTICLES: &[&str] = &["de", "des", "du", "d'"];

const MAX_HYPHEN_STEPS: usize = 5;

/// One PERSON mention after span repair.
#[derive(Debug, Clone)]
struct Observed {
    name: String,
    start: usize,
    heads: Vec<usize>,
    titles: BTreeSet<String>,
}

/// Entities aligned to the same coreference chain, merged.
#[derive(Debug, Clone)]
struct Group {
    names: Vec<String>,
    representative: String,
    mentions: BTreeSet<HeadSpans>,
    titles: BTreeSet<String>,
    multi_head: bool,
}

impl Group {
    fn absorb(&mut self, other: Self, taxonomy: &TitleTaxonomy) {
        if is_better_representative(taxonomy, &self.representative, &other.representative) {
            self.representative = other.representative;
        }
        self.names.extend(other.names);
        self.mentions.extend(other.mentions);
        self.titles.extend(other.titles);
        self.multi_head |= other.multi_head;
    }
}

/// Builds the [`EntityMap`] of a parsed document from its PERSON entities
/// and coreference chains.
#[derive(Debug, Clone, Default)]
pub struct EntityMerger {
    titles: TitleTaxonomy,
}

impl EntityMerger {
    #[must_use]
    pub fn new(titles: TitleTaxonomy) -> Self {
        Self { titles }
    }

    #[must_use]
    pub fn merge(&self, doc: &Document) -> EntityMap {
        let observed = self.collect(doc);
        let groups = self.group_by_chain(doc, &observed);
        let group_count = groups.len();
        let clusters = self.merge_across_chains(groups);
        let entities = self.finalize(clusters);
        tracing::debug!(
            mentions = observed.len(),
            chain_groups = group_count,
            entities = entities.len(),
            "entity merge"
        );
        EntityMap::new(entities)
    }

    fn collect(&self, doc: &Document) -> Vec<Observed> {
        let persons: Vec<&NamedEntity> = doc.person_entities().collect();
        let mut observed: Vec<Observed> = Vec::new();
        for ent in &persons {
            let Some((range, head)) = self.repair_span(doc, ent.tokens()) else {
                continue;
            };
            observed.push(self.observation(doc, range.clone(), vec![head]));

            for sibling in doc.children_with(head, Relation::Conjunct) {
                let Some(other) = persons.iter().find(|o| o.tokens().contains(&sibling)) else {
                    continue;
                };
                if let Some((other_range, other_head)) = self.repair_span(doc, other.tokens()) {
                    let joint = range.start..other_range.end.max(range.end);
                    observed.push(self.observation(doc, joint, vec![head, other_head]));
                }
            }
        }
        observed.retain(|o| !o.name.is_empty());
        observed.sort_by(|a, b| (a.start, &a.heads).cmp(&(b.start, &b.heads)));
        observed.dedup_by(|a, b| a.heads == b.heads);
        observed
    }

    fn observation(&self, doc: &Document, range: Range<usize>, heads: Vec<usize>) -> Observed {
        let name = doc
            .span_text(range.clone())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Observed {
            titles: self.titles.titles_in(&name),
            name,
            start: range.start,
            heads,
        }
    }

    /// Cut appositions, absorb a preceding title, follow hyphenated
    /// surnames and drop a trailing `de` phrase. Returns the span and the
    /// name's head token.
    fn repair_span(&self, doc: &Document, range: Range<usize>) -> Option<(Range<usize>, usize)> {
        let mut range = range;
        if let Some(cut) =
            (range.start + 1..range.end).find(|&i| is_cut_token(doc, i))
        {
            range.end = cut;
        }
        while range.start < range.end && is_cut_token(doc, range.start) {
            range.start += 1;
        }
        if range.is_empty() {
            return None;
        }
        let head = name_head(doc, range.clone(), &self.titles);

        while range.start > 0 {
            let prev = range.start - 1;
            let attached = doc.token(head).head == prev || range.contains(&doc.token(prev).head);
            if !self.titles.is_title(&doc.token(prev).text) || !attached {
                break;
            }
            range.start = prev;
        }

        range.end = extend_hyphenated(doc, range.end);
        range.end = strip_de_phrase(doc, &range, head);
        Some((range, head))
    }

    /// Phase two and three: entities sharing a coreference chain are one
    /// person. Chain mentions join the group's mention set.
    fn group_by_chain(&self, doc: &Document, observed: &[Observed]) -> Vec<Group> {
        let chains: Vec<Vec<HeadSpans>> = doc
            .coref_chains()
            .iter()
            .map(|chain| {
                chain
                    .mentions
                    .iter()
                    .map(|m| m.iter().map(|&t| doc.token(t).span()).collect())
                    .collect()
            })
            .collect();

        let heads: Vec<HeadSpans> = observed
            .iter()
            .map(|o| o.heads.iter().map(|&t| doc.token(t).span()).collect())
            .collect();
        let aligned: Vec<Vec<usize>> = heads
            .iter()
            .map(|h| {
                chains
                    .iter()
                    .enumerate()
                    .filter(|(_, mentions)| mentions.iter().any(|m| mention_covers(m, h)))
                    .map(|(c, _)| c)
                    .collect()
            })
            .collect();

        let mut sets = UnionFind::<usize>::new(observed.len());
        for chain in 0..chains.len() {
            let members: Vec<usize> = (0..observed.len())
                .filter(|&o| aligned[o].contains(&chain))
                .collect();
            for pair in members.windows(2) {
                sets.union(pair[0], pair[1]);
            }
        }

        let mut groups: Vec<(usize, Group)> = Vec::new();
        for (i, obs) in observed.iter().enumerate() {
            let mut mentions: BTreeSet<HeadSpans> = BTreeSet::from([heads[i].clone()]);
            for &c in &aligned[i] {
                mentions.extend(chains[c].iter().filter(|m| !m.is_empty()).cloned());
            }
            let group = Group {
                names: vec![obs.name.clone()],
                representative: obs.name.clone(),
                mentions,
                titles: obs.titles.clone(),
                multi_head: obs.heads.len() > 1,
            };
            let root = sets.find(i);
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, existing)) => existing.absorb(group, &self.titles),
                None => groups.push((root, group)),
            }
        }
        groups.into_iter().map(|(_, g)| g).collect()
    }

    /// Groups from different chains whose names are compatible with every
    /// name already in a cluster, and whose titles agree, are merged.
    /// Multi-head groups stay apart.
    fn merge_across_chains(&self, groups: Vec<Group>) -> Vec<Group> {
        let mut clusters: Vec<Group> = Vec::new();
        for group in groups {
            let target = (!group.multi_head)
                .then(|| {
                    clusters
                        .iter_mut()
                        .find(|c| !c.multi_head && self.can_merge(c, &group))
                })
                .flatten();
            match target {
                Some(cluster) => cluster.absorb(group, &self.titles),
                None => clusters.push(group),
            }
        }
        clusters
    }

    fn can_merge(&self, cluster: &Group, group: &Group) -> bool {
        titles_compatible(&self.titles, &cluster.titles, &group.titles)
            && cluster.names.iter().all(|a| {
                group.names.iter().all(|b| {
                    names_compatible(&self.titles.strip_titles(a), &self.titles.strip_titles(b))
                })
            })
    }

    /// Strip titles from representatives. Entities whose stripped names
    /// collide are merged, titles included.
    fn finalize(&self, clusters: Vec<Group>) -> Vec<Entity> {
        let mut entities: Vec<Entity> = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let representative = self.titles.strip_titles(&cluster.representative);
            if let Some(existing) = entities
                .iter_mut()
                .find(|e| e.representative == representative)
            {
                existing.mentions.extend(cluster.mentions);
                existing.titles.extend(cluster.titles);
                existing.coordinated &= cluster.multi_head;
                continue;
            }
            entities.push(Entity {
                representative,
                mentions: cluster.mentions,
                titles: cluster.titles,
                coordinated: cluster.multi_head,
            });
        }
        entities
    }
}

fn is_cut_token(doc: &Document, i: usize) -> bool {
    let tok = doc.token(i);
    tok.contains_newline() || CUT_TOKENS.contains(&tok.text.as_str())
}

/// Every head of the entity overlaps some head of the chain mention.
fn mention_covers(mention: &[CharSpan], heads: &[CharSpan]) -> bool {
    !mention.is_empty() && heads.iter().all(|h| mention.iter().any(|m| m.covers(h)))
}

/// `Marie Dupont` `-` `Laval`: the parser stopped the entity early.
fn extend_hyphenated(doc: &Document, mut end: usize) -> usize {
    for _ in 0..MAX_HYPHEN_STEPS {
        match (doc.get(end), doc.get(end + 1)) {
            (Some(dash), Some(next)) if dash.text == "-" && next.is_title_case() => end += 2,
            (Some(tok), _) if tok.text.len() > 1 && tok.text.starts_with('-') => {
                let rest = tok.text.trim_start_matches('-');
                let title_cased = rest.chars().next().is_some_and(char::is_uppercase)
                    && rest.chars().all(char::is_alphabetic);
                if !title_cased {
                    break;
                }
                end += 1;
            }
            _ => break,
        }
    }
    end
}

/// `Jean Marais de Paris` loses `de Paris` unless the tail ends in a
/// title-cased proper noun.
fn strip_de_phrase(doc: &Document, range: &Range<usize>, head: usize) -> usize {
    let Some(de) = (head + 1..range.end)
        .filter(|&i| i > range.start)
        .find(|&i| DE_PARTICLES.contains(&doc.token(i).lower().as_str()))
    else {
        return range.end;
    };
    let last = doc.token(range.end - 1);
    let keep = range.end > de + 1 && last.pos == Pos::Propn && last.is_title_case();
    if keep {
        range.end
    } else {
        de
    }
}
