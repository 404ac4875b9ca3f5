//! Stable node identities.
//!
//! Every package, dependency target, distribution, suite and repository gets
//! an IRI that is a pure function of its identifying fields, so re-running a
//! collection (or merging partial graphs built from overlapping inputs)
//! never duplicates nodes.

use std::fmt;

use packagegraph_rdf::{Iri, Node, Term};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

pub const DEBIAN_NAMESPACE: &str = "http://packagegraph.github.io/ontology/debian#";
pub const RPM_NAMESPACE: &str = "http://packagegraph.github.io/ontology/rpm#";

/// Bytes escaped in identity keys: everything except `A-Za-z0-9_.-~` and `/`.
const IDENTITY_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes one identity key.
pub fn quote(value: &str) -> String {
    utf8_percent_encode(value, IDENTITY_KEY).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Debian,
    Rpm,
}

impl Ecosystem {
    pub fn namespace(self) -> &'static str {
        match self {
            Ecosystem::Debian => DEBIAN_NAMESPACE,
            Ecosystem::Rpm => RPM_NAMESPACE,
        }
    }

    /// Turtle prefix bound to [`Self::namespace`] in output graphs.
    pub fn prefix(self) -> &'static str {
        match self {
            Ecosystem::Debian => "deb",
            Ecosystem::Rpm => "rpm",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Ecosystem::Debian => "debian",
            Ecosystem::Rpm => "rpm",
        }
    }

    /// Vocabulary term `<ns><local>`.
    pub fn term(self, local: &str) -> Iri {
        Iri::new(format!("{}{local}", self.namespace()))
    }

    /// Identity of one package build: `name-version[-release][.arch]`.
    pub fn package_identity(
        self,
        name: &str,
        version: &str,
        release: Option<&str>,
        arch: Option<&str>,
    ) -> NodeIdentity {
        let mut key = format!("{name}-{version}");
        if let Some(release) = release {
            key.push('-');
            key.push_str(release);
        }
        if let Some(arch) = arch {
            key.push('.');
            key.push_str(arch);
        }
        NodeIdentity::new(self, "", &key)
    }

    /// Version-less node a dependency points at.
    pub fn dependency_target(self, name: &str) -> NodeIdentity {
        NodeIdentity::new(self, "package/", name)
    }

    /// Distribution and suite nodes.
    pub fn named_node(self, value: &str) -> NodeIdentity {
        NodeIdentity::new(self, "", value)
    }

    pub fn repository(self, url: &str) -> NodeIdentity {
        NodeIdentity::new(self, "repository/", url)
    }

    /// Local name of the predicate for a free-form metadata attribute.
    ///
    /// Debian control fields are case-insensitive and hyphenated
    /// (`Installed-Size` -> `installedsize`); RPM attribute keys are already
    /// vocabulary local names and only lose non-alphanumerics.
    pub fn attribute_local_name(self, key: &str) -> String {
        let kept = key.chars().filter(char::is_ascii_alphanumeric);
        match self {
            Ecosystem::Debian => kept.map(|c| c.to_ascii_lowercase()).collect(),
            Ecosystem::Rpm => kept.collect(),
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debian" | "deb" => Ok(Ecosystem::Debian),
            "rpm" => Ok(Ecosystem::Rpm),
            other => Err(format!("unknown ecosystem `{other}` (expected debian or rpm)")),
        }
    }
}

/// A deterministic node IRI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity(Iri);

impl NodeIdentity {
    fn new(ecosystem: Ecosystem, path: &str, key: &str) -> Self {
        Self(Iri::new(format!(
            "{}{path}{}",
            ecosystem.namespace(),
            quote(key)
        )))
    }

    pub fn iri(&self) -> &Iri {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_iri(self) -> Iri {
        self.0
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&NodeIdentity> for Node {
    fn from(value: &NodeIdentity) -> Self {
        Node::Iri(value.0.clone())
    }
}

impl From<NodeIdentity> for Node {
    fn from(value: NodeIdentity) -> Self {
        Node::Iri(value.0)
    }
}

impl From<&NodeIdentity> for Term {
    fn from(value: &NodeIdentity) -> Self {
        Term::from(Node::from(value))
    }
}

impl From<NodeIdentity> for Term {
    fn from(value: NodeIdentity) -> Self {
        Term::from(Node::from(value))
    }
}
