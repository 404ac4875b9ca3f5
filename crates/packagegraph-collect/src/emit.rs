//! Package records to triples.

use packagegraph_rdf::{Graph, Iri, Literal};
use packagegraph_rdf::vocab::{OWL_SAME_AS_IRI, RDFS_LITERAL_IRI, RDF_TYPE_IRI};

use crate::coordinator::{ChunkRun, Coordinator};
use crate::error::CollectError;
use crate::identity::{Ecosystem, NodeIdentity};
use crate::record::PackageRecord;

/// Attribute local names that would collide with identity predicates.
const RESERVED_ATTRIBUTES: &[&str] = &[
    "package",
    "name",
    "version",
    "release",
    "arch",
    "summary",
    "description",
    "inSuite",
    "partOfDistribution",
    "inRepository",
    "fileName",
    "hasChangelog",
];

/// Pre-built IRIs for one ecosystem's vocabulary.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    ecosystem: Ecosystem,
    pub rdf_type: Iri,
    pub same_as: Iri,
    pub rdfs_literal: Iri,
    pub package_class: Iri,
    pub dependency_class: Iri,
    pub distribution_class: Iri,
    pub suite_class: Iri,
    pub repository_class: Iri,
    pub changelog_class: Iri,
    pub name: Iri,
    pub version: Iri,
    pub release: Iri,
    pub arch: Iri,
    pub summary: Iri,
    pub description: Iri,
    pub on_package: Iri,
    pub version_constraint: Iri,
    pub in_suite: Iri,
    pub part_of_distribution: Iri,
    pub in_repository: Iri,
    pub file_name: Iri,
    pub has_changelog: Iri,
    pub changelog_text: Iri,
    pub changelog_author: Iri,
    pub changelog_time: Iri,
}

impl Vocabulary {
    pub fn new(ecosystem: Ecosystem) -> Self {
        let t = |local: &str| ecosystem.term(local);
        Self {
            ecosystem,
            rdf_type: Iri::new(RDF_TYPE_IRI),
            same_as: Iri::new(OWL_SAME_AS_IRI),
            rdfs_literal: Iri::new(RDFS_LITERAL_IRI),
            package_class: t(match ecosystem {
                Ecosystem::Debian => "DebianPackage",
                Ecosystem::Rpm => "RpmPackage",
            }),
            dependency_class: t("Dependency"),
            distribution_class: t("Distribution"),
            suite_class: t("Suite"),
            repository_class: t("Repository"),
            changelog_class: t("Changelog"),
            name: t("name"),
            version: t("version"),
            release: t("release"),
            arch: t("arch"),
            summary: t("summary"),
            description: t("description"),
            on_package: t("onPackage"),
            version_constraint: t("versionConstraint"),
            in_suite: t("inSuite"),
            part_of_distribution: t("partOfDistribution"),
            in_repository: t("inRepository"),
            file_name: t("fileName"),
            has_changelog: t("hasChangelog"),
            changelog_text: t("changelogText"),
            changelog_author: t("changelogAuthor"),
            changelog_time: t("changelogTime"),
        }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }
}

/// Where emitted packages belong (`inSuite` / `inRepository`).
#[derive(Debug, Clone)]
pub struct EmitScope {
    pub vocabulary: Vocabulary,
    pub membership: Option<(Iri, NodeIdentity)>,
}

impl EmitScope {
    pub fn new(ecosystem: Ecosystem) -> Self {
        Self {
            vocabulary: Vocabulary::new(ecosystem),
            membership: None,
        }
    }

    pub fn in_suite(mut self, suite: NodeIdentity) -> Self {
        self.membership = Some((self.vocabulary.in_suite.clone(), suite));
        self
    }

    pub fn in_repository(mut self, repository: NodeIdentity) -> Self {
        self.membership = Some((self.vocabulary.in_repository.clone(), repository));
        self
    }
}

/// Adds the triples for one record and returns its identity.
pub fn emit_package(graph: &mut Graph, scope: &EmitScope, record: &PackageRecord) -> NodeIdentity {
    let v = &scope.vocabulary;
    let ecosystem = record.ecosystem();
    let package = record.identity();

    graph.add(&package, &v.rdf_type, &v.package_class);
    graph.add_literal(&package, &v.name, record.name());
    graph.add_literal(&package, &v.version, record.version());
    if let Some(release) = record.release() {
        graph.add_literal(&package, &v.release, release);
    }
    if let Some(arch) = record.arch() {
        graph.add_literal(&package, &v.arch, arch);
    }
    if let Some((predicate, target)) = &scope.membership {
        graph.add(&package, predicate, target);
    }
    if let Some(summary) = record.summary().filter(|s| !s.is_empty()) {
        graph.add_literal(&package, &v.summary, summary);
    }
    if let Some(description) = record.description().filter(|s| !s.is_empty()) {
        graph.add_literal(&package, &v.description, description);
    }

    let dependency_kinds: Vec<String> = record
        .dependency_fields()
        .iter()
        .map(|(kind, _)| ecosystem.attribute_local_name(kind))
        .collect();
    for (key, value) in record.attributes() {
        let local = ecosystem.attribute_local_name(key);
        if local.is_empty()
            || RESERVED_ATTRIBUTES.iter().any(|r| r.eq_ignore_ascii_case(&local))
            || dependency_kinds.contains(&local)
        {
            continue;
        }
        graph.add_literal(&package, &ecosystem.term(&local), value.as_str());
    }

    for ((_, field), local) in record.dependency_fields().iter().zip(&dependency_kinds) {
        let predicate = ecosystem.term(local);
        for constraint in field.constraints() {
            let node = graph.fresh_blank();
            graph.add(&package, &predicate, node);
            graph.add(node, &v.rdf_type, &v.dependency_class);
            graph.add(
                node,
                &v.on_package,
                ecosystem.dependency_target(&constraint.target),
            );
            if let Some(version) = constraint.version_constraint {
                graph.add_literal(node, &v.version_constraint, version);
            }
        }
    }

    package
}

/// Emits `records` through the coordinator.
pub fn emit_packages(
    coordinator: &Coordinator,
    graph: &mut Graph,
    scope: &EmitScope,
    records: &[PackageRecord],
) -> Result<ChunkRun, CollectError> {
    coordinator.run(graph, records, 0, |_, chunk, partial| {
        for record in chunk {
            emit_package(partial, scope, record);
        }
        Ok(())
    })
}

/// One changelog entry attached to a package.
pub fn emit_changelog(
    graph: &mut Graph,
    vocabulary: &Vocabulary,
    package: &NodeIdentity,
    author: Option<&str>,
    time: Option<&str>,
    text: &str,
) {
    let node = graph.fresh_blank();
    graph.add(package, &vocabulary.has_changelog, node);
    graph.add(node, &vocabulary.rdf_type, &vocabulary.changelog_class);
    if !text.is_empty() {
        graph.add_literal(node, &vocabulary.changelog_text, text);
    }
    if let Some(author) = author {
        graph.add_literal(node, &vocabulary.changelog_author, author);
    }
    if let Some(time) = time {
        graph.add(
            node,
            &vocabulary.changelog_time,
            Literal::typed(time, vocabulary.rdfs_literal.clone()),
        );
    }
}

/// Debian distribution and suite nodes; returns the suite packages join.
pub fn emit_suite(
    graph: &mut Graph,
    vocabulary: &Vocabulary,
    origin: &str,
    codename: &str,
    suite: &str,
) -> NodeIdentity {
    let ecosystem = vocabulary.ecosystem();
    let distribution = ecosystem.named_node(origin);
    let codename_node = ecosystem.named_node(codename);
    graph.add(&distribution, &vocabulary.rdf_type, &vocabulary.distribution_class);
    graph.add(&codename_node, &vocabulary.rdf_type, &vocabulary.suite_class);
    graph.add(&codename_node, &vocabulary.part_of_distribution, &distribution);
    if suite != codename {
        let suite_node = ecosystem.named_node(suite);
        graph.add(&suite_node, &vocabulary.rdf_type, &vocabulary.suite_class);
        graph.add(&suite_node, &vocabulary.same_as, &codename_node);
    }
    codename_node
}

/// RPM repository node.
pub fn emit_repository(
    graph: &mut Graph,
    vocabulary: &Vocabulary,
    url: &str,
    revision: Option<&str>,
) -> NodeIdentity {
    let repository = vocabulary.ecosystem().repository(url);
    graph.add(&repository, &vocabulary.rdf_type, &vocabulary.repository_class);
    if let Some(revision) = revision {
        graph.add_literal(&repository, &vocabulary.ecosystem().term("revision"), revision);
    }
    repository
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depgrammar::DependencyConstraint;
    use crate::record::DependencyField;
    use packagegraph_rdf::{Node, Term, Triple};

    fn hello() -> PackageRecord {
        let mut record = PackageRecord::new(Ecosystem::Debian, Some("hello"), Some("2.10-3")).unwrap();
        record.set_summary("example package based on GNU hello");
        record.push_attribute("Installed-Size", "280");
        record.push_attribute("Depends", "should be ignored");
        record.push_dependencies("Depends", DependencyField::Raw("libc6 (>= 2.34) | libc7".into()));
        record
    }

    fn literal(graph: &Graph, subject: &NodeIdentity, predicate: &Iri) -> Vec<String> {
        let subject = Node::from(subject);
        graph
            .iter()
            .filter(|t| t.subject == subject && &t.predicate == predicate)
            .filter_map(|t| match &t.object {
                Term::Literal(l) => Some(l.lexical().to_string()),
                Term::Node(_) => None,
            })
            .collect()
    }

    #[test]
    fn emits_identity_attributes_and_dependencies() {
        let mut graph = Graph::new();
        let scope = EmitScope::new(Ecosystem::Debian);
        let package = emit_package(&mut graph, &scope, &hello());
        let v = &scope.vocabulary;

        assert_eq!(literal(&graph, &package, &v.name), ["hello"]);
        assert_eq!(
            literal(&graph, &package, &Ecosystem::Debian.term("installedsize")),
            ["280"]
        );
        assert!(literal(&graph, &package, &Ecosystem::Debian.term("depends")).is_empty());

        let deps: Vec<&Triple> = graph
            .iter()
            .filter(|t| t.predicate == v.on_package)
            .collect();
        assert_eq!(deps.len(), 1);
        assert_eq!(
            deps[0].object,
            Term::from(Ecosystem::Debian.dependency_target("libc6"))
        );
        assert_eq!(graph.blank_count(), 1);
    }

    #[test]
    fn structured_dependencies_emit_like_raw_ones() {
        let mut raw = PackageRecord::new(Ecosystem::Rpm, Some("bash"), Some("5.2")).unwrap();
        raw.push_dependencies("requires", DependencyField::Raw("glibc (>= 2.34)".into()));
        let mut structured = PackageRecord::new(Ecosystem::Rpm, Some("bash"), Some("5.2")).unwrap();
        structured.push_dependencies(
            "requires",
            DependencyField::Structured(vec![DependencyConstraint::new("glibc", Some(">= 2.34".into()))]),
        );

        let scope = EmitScope::new(Ecosystem::Rpm);
        let mut a = Graph::new();
        let mut b = Graph::new();
        emit_package(&mut a, &scope, &raw);
        emit_package(&mut b, &scope, &structured);
        assert!(a.iter().eq(b.iter()));
    }

    #[test]
    fn suite_alias_is_linked_with_same_as() {
        let mut graph = Graph::new();
        let v = Vocabulary::new(Ecosystem::Debian);
        let codename = emit_suite(&mut graph, &v, "Debian", "bookworm", "stable");
        assert!(graph.contains(&Triple {
            subject: Ecosystem::Debian.named_node("stable").into(),
            predicate: v.same_as.clone(),
            object: codename.clone().into(),
        }));
        assert!(graph.contains(&Triple {
            subject: codename.into(),
            predicate: v.part_of_distribution.clone(),
            object: Ecosystem::Debian.named_node("Debian").into(),
        }));

        let mut same = Graph::new();
        emit_suite(&mut same, &v, "Debian", "bookworm", "bookworm");
        assert!(!same.iter().any(|t| t.predicate == v.same_as));
    }
}
