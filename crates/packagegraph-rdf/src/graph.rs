//! In-memory triple set.

use std::collections::{BTreeMap, BTreeSet};

use crate::term::{BlankId, Iri, Literal, Node, Term, Triple};
use crate::vocab::STANDARD_PREFIXES;

/// An ordered set of triples plus prefix bindings.
///
/// Triples are kept in a `BTreeSet`, so iteration (and therefore
/// serialization) order depends only on content, never on insertion order.
#[derive(Debug, Clone)]
pub struct Graph {
    triples: BTreeSet<Triple>,
    next_blank: u64,
    prefixes: BTreeMap<String, String>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        let prefixes = STANDARD_PREFIXES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect();
        Self {
            triples: BTreeSet::new(),
            next_blank: 0,
            prefixes,
        }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Number of blank nodes allocated so far (including merged ones).
    pub fn blank_count(&self) -> u64 {
        self.next_blank
    }

    pub fn fresh_blank(&mut self) -> BlankId {
        let id = BlankId(self.next_blank);
        self.next_blank += 1;
        id
    }

    /// Adds a triple; returns `false` if it was already present.
    pub fn add(
        &mut self,
        subject: impl Into<Node>,
        predicate: &Iri,
        object: impl Into<Term>,
    ) -> bool {
        self.triples.insert(Triple {
            subject: subject.into(),
            predicate: predicate.clone(),
            object: object.into(),
        })
    }

    pub fn add_literal(
        &mut self,
        subject: impl Into<Node>,
        predicate: &Iri,
        lexical: impl Into<String>,
    ) -> bool {
        self.add(subject, predicate, Literal::plain(lexical))
    }

    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn bind_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Union `other` into `self`, re-scoping its blank nodes.
    ///
    /// Blank ids of `other` are offset by this graph's allocation counter, so
    /// absorbing chunk results in chunk order reproduces exactly the ids a
    /// serial run would have allocated. Returns the number of new triples.
    pub fn absorb(&mut self, other: Graph) -> usize {
        let offset = self.next_blank;
        self.next_blank += other.next_blank;
        for (prefix, ns) in other.prefixes {
            self.prefixes.entry(prefix).or_insert(ns);
        }

        let mut added = 0;
        for triple in other.triples {
            if self.triples.insert(triple.shifted(offset)) {
                added += 1;
            }
        }
        added
    }

    /// Splits `iri` into a bound prefix and a local name that is safe to
    /// write unescaped in Turtle. Longest namespace wins.
    pub(crate) fn compact<'a>(&'a self, iri: &'a str) -> Option<(&'a str, &'a str)> {
        self.prefixes
            .iter()
            .filter(|(_, ns)| !ns.is_empty() && iri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .and_then(|(prefix, ns)| {
                let local = &iri[ns.len()..];
                is_plain_local_name(local).then_some((prefix.as_str(), local))
            })
    }
}

fn is_plain_local_name(local: &str) -> bool {
    let mut chars = local.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphanumeric() || first == '_') {
        return false;
    }
    if local.ends_with('.') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
