//! RDF term model.
//!
//! IRIs are reference-counted so that a package identity can appear as the
//! subject of many thousands of file-ownership triples without one string
//! allocation per triple.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(Arc<str>);

impl Iri {
    pub fn new(iri: impl Into<Arc<str>>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Graph-local blank node id.
///
/// Ids are only meaningful inside the [`crate::Graph`] that allocated them;
/// merging graphs re-scopes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankId(pub(crate) u64);

impl BlankId {
    pub fn index(self) -> u64 {
        self.0
    }

    pub(crate) fn shifted(self, offset: u64) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Display for BlankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Subject position: IRI or blank node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Iri(Iri),
    Blank(BlankId),
}

impl Node {
    fn shifted(self, offset: u64) -> Self {
        match self {
            Node::Iri(iri) => Node::Iri(iri),
            Node::Blank(id) => Node::Blank(id.shifted(offset)),
        }
    }
}

impl From<Iri> for Node {
    fn from(value: Iri) -> Self {
        Node::Iri(value)
    }
}

impl From<&Iri> for Node {
    fn from(value: &Iri) -> Self {
        Node::Iri(value.clone())
    }
}

impl From<BlankId> for Node {
    fn from(value: BlankId) -> Self {
        Node::Blank(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    lexical: String,
    datatype: Option<Iri>,
    language: Option<String>,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: Iri) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype),
            language: None,
        }
    }

    pub fn with_language(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    pub fn datatype(&self) -> Option<&Iri> {
        self.datatype.as_ref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Object position: node or literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Node(Node),
    Literal(Literal),
}

impl Term {
    pub fn as_blank(&self) -> Option<BlankId> {
        match self {
            Term::Node(Node::Blank(id)) => Some(*id),
            _ => None,
        }
    }

    fn shifted(self, offset: u64) -> Self {
        match self {
            Term::Node(node) => Term::Node(node.shifted(offset)),
            Term::Literal(lit) => Term::Literal(lit),
        }
    }
}

impl From<Node> for Term {
    fn from(value: Node) -> Self {
        Term::Node(value)
    }
}

impl From<Iri> for Term {
    fn from(value: Iri) -> Self {
        Term::Node(Node::Iri(value))
    }
}

impl From<&Iri> for Term {
    fn from(value: &Iri) -> Self {
        Term::Node(Node::Iri(value.clone()))
    }
}

impl From<BlankId> for Term {
    fn from(value: BlankId) -> Self {
        Term::Node(Node::Blank(value))
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    pub(crate) fn shifted(self, offset: u64) -> Self {
        if offset == 0 {
            return self;
        }
        Self {
            subject: self.subject.shifted(offset),
            predicate: self.predicate,
            object: self.object.shifted(offset),
        }
    }
}
