use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use packagegraph_collect::{
    collect, CollectContext, CollectError, CollectSummary, Coordinator, DebianCollector,
    DebianSelector, Diagnostics, Ecosystem, EcosystemCollector, HandOff, ManifestStatus,
    MemoryFetcher, NodeIdentity, ParallelConfig, RpmCollector, Vocabulary,
};
use packagegraph_rdf::{Graph, Iri, Node, Term};

const MIRROR: &str = "http://mirror.test/debian";
const RPM_MIRROR: &str = "http://mirror.test/fedora/";

const RELEASE: &str = "Origin: Debian
Label: Debian
Suite: stable
Codename: bookworm
Architectures: amd64 arm64
Components: main contrib
";

const PACKAGES: &str = "Package: hello
Version: 2.10-3
Architecture: amd64
Installed-Size: 280
Depends: libc6 (>= 2.34)
Description: example package based on GNU hello
 The GNU hello program produces a familiar, friendly greeting.
 .
 It is an example of GNU coding standards.

Package: broken
Architecture: amd64

Package: coreutils
Version: 9.1-1
Architecture: amd64
Pre-Depends: libacl1 (>= 2.2.23), libattr1 (>= 1:2.4.44) | libattr2
Description: GNU core utilities
";

const CONTENTS: &str = "usr/bin/hello                         devel/hello
usr/bin/ls                            utils/coreutils
usr/share/doc/common                  devel/hello,utils/coreutils,utils/absent
usr/share/orphan                      utils/absent
";

const REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <revision>1718000000</revision>
  <data type="primary"><location href="repodata/primary.xml.gz"/></data>
  <data type="filelists"><location href="repodata/filelists.xml.gz"/></data>
  <data type="other"><location href="repodata/other.xml"/></data>
</repomd>"#;

const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="2">
<package type="rpm">
  <name>bash</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="5.2.26" rel="3.fc40"/>
  <checksum type="sha256" pkgid="YES">abc123</checksum>
  <summary>The GNU Bourne Again shell</summary>
  <description>The GNU Bourne Again shell (Bash).</description>
  <format>
    <rpm:license>GPL-3.0-or-later</rpm:license>
    <rpm:requires>
      <rpm:entry name="glibc" flags="GE" epoch="0" ver="2.34"/>
    </rpm:requires>
  </format>
</package>
<package type="rpm">
  <name>tzdata</name>
  <arch>noarch</arch>
  <version epoch="0" ver="2024a" rel="5.fc40"/>
  <checksum type="sha256" pkgid="YES">def456</checksum>
  <summary>Timezone data</summary>
</package>
</metadata>"#;

const FILELISTS: &str = r#"<filelists xmlns="http://linux.duke.edu/metadata/filelists" packages="2">
<package pkgid="abc123" name="bash" arch="x86_64">
  <file>/usr/bin/bash</file>
  <file>/usr/bin/sh</file>
</package>
<package pkgid="unknown" name="ghost" arch="noarch">
  <file>/usr/bin/ghost</file>
</package>
</filelists>"#;

const OTHER: &str = r#"<otherdata xmlns="http://linux.duke.edu/metadata/other" packages="1">
<package pkgid="def456" name="tzdata" arch="noarch">
  <changelog author="Packager &lt;pkg@example.org&gt; - 2024a-5" date="1714521600">- Rebuilt</changelog>
</package>
</otherdata>"#;

fn gz(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn debian_mirror() -> MemoryFetcher {
    MemoryFetcher::new()
        .with(format!("{MIRROR}/dists/stable/Release"), RELEASE)
        .with(
            format!("{MIRROR}/dists/stable/main/binary-amd64/Packages.gz"),
            gz(PACKAGES),
        )
        .with(
            format!("{MIRROR}/dists/stable/main/Contents-amd64.gz"),
            gz(CONTENTS),
        )
}

fn rpm_mirror() -> MemoryFetcher {
    MemoryFetcher::new()
        .with(format!("{RPM_MIRROR}repodata/repomd.xml"), REPOMD)
        .with(format!("{RPM_MIRROR}repodata/primary.xml.gz"), gz(PRIMARY))
        .with(format!("{RPM_MIRROR}repodata/filelists.xml.gz"), gz(FILELISTS))
        .with(format!("{RPM_MIRROR}repodata/other.xml"), OTHER)
}

fn small_chunks() -> ParallelConfig {
    ParallelConfig {
        chunk_size: 1,
        workers: 3,
        ..ParallelConfig::default()
    }
}

fn run<C: EcosystemCollector>(
    collector: &C,
    fetcher: &MemoryFetcher,
    repo_url: &str,
    parallel: ParallelConfig,
) -> Result<(Graph, CollectSummary), CollectError> {
    let coordinator = Coordinator::new(parallel)?;
    let diagnostics = Diagnostics::new(true);
    let ctx = CollectContext::new(repo_url, fetcher, &coordinator, &diagnostics);
    let mut graph = Graph::new();
    let summary = collect(collector, &ctx, &mut graph)?;
    Ok((graph, summary))
}

fn debian() -> DebianCollector {
    DebianCollector::new(DebianSelector::default())
}

fn objects(graph: &Graph, subject: impl Into<Node>, predicate: &Iri) -> Vec<Term> {
    let subject = subject.into();
    graph
        .iter()
        .filter(|t| t.subject == subject && &t.predicate == predicate)
        .map(|t| t.object.clone())
        .collect()
}

fn literals(graph: &Graph, subject: impl Into<Node>, predicate: &Iri) -> Vec<String> {
    objects(graph, subject, predicate)
        .into_iter()
        .filter_map(|term| match term {
            Term::Literal(l) => Some(l.lexical().to_string()),
            Term::Node(_) => None,
        })
        .collect()
}

fn count_predicate(graph: &Graph, predicate: &Iri) -> usize {
    graph.iter().filter(|t| &t.predicate == predicate).count()
}

fn debian_package(name_version: &str) -> NodeIdentity {
    let (name, version) = name_version.split_once(' ').unwrap();
    Ecosystem::Debian.package_identity(name, version, None, None)
}

#[test]
fn debian_pipeline_emits_packages_suite_and_files() {
    let (graph, summary) = run(&debian(), &debian_mirror(), MIRROR, small_chunks()).unwrap();
    let v = Vocabulary::new(Ecosystem::Debian);

    assert_eq!(summary.packages, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.triples_added, graph.len());

    let hello = debian_package("hello 2.10-3");
    assert_eq!(
        hello.as_str(),
        "http://packagegraph.github.io/ontology/debian#hello-2.10-3"
    );
    assert_eq!(
        objects(&graph, &hello, &v.rdf_type),
        vec![Term::from(&v.package_class)]
    );
    assert_eq!(
        literals(&graph, &hello, &v.summary),
        ["example package based on GNU hello"]
    );
    assert_eq!(
        literals(&graph, &hello, &v.description),
        ["The GNU hello program produces a familiar, friendly greeting.\n\nIt is an example of GNU coding standards."]
    );
    assert_eq!(
        literals(&graph, &hello, &Ecosystem::Debian.term("installedsize")),
        ["280"]
    );
    assert_eq!(
        objects(&graph, &hello, &v.in_suite),
        vec![Term::from(Ecosystem::Debian.named_node("bookworm"))]
    );

    let mut files = literals(&graph, &hello, &v.file_name);
    files.sort();
    assert_eq!(files, ["usr/bin/hello", "usr/share/doc/common"]);
    assert_eq!(count_predicate(&graph, &v.file_name), 4);

    // libacl1 and libattr1; the libattr2 alternative is dropped.
    let coreutils = debian_package("coreutils 9.1-1");
    assert_eq!(
        objects(&graph, &coreutils, &Ecosystem::Debian.term("predepends")).len(),
        2
    );
    assert_eq!(count_predicate(&graph, &v.on_package), 3);
    assert!(!graph.iter().any(|t| t.object
        == Term::from(Ecosystem::Debian.dependency_target("libattr2"))));

    assert!(graph.contains(&packagegraph_rdf::Triple {
        subject: Ecosystem::Debian.named_node("stable").into(),
        predicate: v.same_as.clone(),
        object: Ecosystem::Debian.named_node("bookworm").into(),
    }));
    assert_eq!(
        objects(
            &graph,
            Ecosystem::Debian.named_node("bookworm"),
            &v.part_of_distribution
        ),
        vec![Term::from(Ecosystem::Debian.named_node("Debian"))]
    );

    assert_eq!(summary.manifests.len(), 1);
    match &summary.manifests[0].status {
        ManifestStatus::Linked { url, stats } => {
            assert_eq!(url, &format!("{MIRROR}/dists/stable/main/Contents-amd64.gz"));
            assert_eq!(stats.entries, 4);
            assert_eq!(stats.triples_added, 4);
        }
        other => panic!("expected linked Contents, got {other:?}"),
    }
}

#[test]
fn rejected_stanzas_leave_no_trace() {
    let (graph, _) = run(&debian(), &debian_mirror(), MIRROR, ParallelConfig::serial()).unwrap();
    let v = Vocabulary::new(Ecosystem::Debian);
    assert_eq!(count_predicate(&graph, &v.name), 2);
    assert!(!graph
        .iter()
        .any(|t| matches!(&t.object, Term::Literal(l) if l.lexical() == "broken")));
}

#[test]
fn parallel_and_serial_runs_agree_exactly() {
    let fetcher = debian_mirror();
    let (serial, _) = run(&debian(), &fetcher, MIRROR, ParallelConfig::serial()).unwrap();
    let (parallel, _) = run(&debian(), &fetcher, MIRROR, small_chunks()).unwrap();
    assert_eq!(serial.len(), parallel.len());
    assert!(serial.iter().eq(parallel.iter()));
}

#[test]
fn repeated_runs_are_idempotent() {
    let fetcher = rpm_mirror();
    let (first, _) = run(&RpmCollector::new(), &fetcher, RPM_MIRROR, small_chunks()).unwrap();
    let (second, _) = run(&RpmCollector::new(), &fetcher, RPM_MIRROR, small_chunks()).unwrap();
    assert!(first.iter().eq(second.iter()));
}

#[test]
fn spooled_handoff_matches_in_memory_counts() {
    let dir = tempfile::tempdir().unwrap();
    let spool = ParallelConfig {
        handoff: HandOff::Spool {
            dir: dir.path().to_path_buf(),
        },
        ..small_chunks()
    };
    let fetcher = debian_mirror();
    let (in_memory, _) = run(&debian(), &fetcher, MIRROR, small_chunks()).unwrap();
    let (spooled, summary) = run(&debian(), &fetcher, MIRROR, spool).unwrap();

    assert_eq!(summary.packages, 2);
    assert_eq!(in_memory.len(), spooled.len());
    assert_eq!(in_memory.blank_count(), spooled.blank_count());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn release_falls_back_to_inrelease() {
    let fetcher = MemoryFetcher::new()
        .with(format!("{MIRROR}/dists/stable/InRelease"), RELEASE)
        .with(
            format!("{MIRROR}/dists/stable/main/binary-amd64/Packages.gz"),
            gz(PACKAGES),
        );
    let (_, summary) = run(&debian(), &fetcher, MIRROR, ParallelConfig::serial()).unwrap();
    assert_eq!(summary.packages, 2);
    assert!(fetcher
        .requested()
        .contains(&format!("{MIRROR}/dists/stable/InRelease")));
}

#[test]
fn incomplete_release_is_fatal() {
    let fetcher = debian_mirror().with(
        format!("{MIRROR}/dists/stable/Release"),
        "Origin: Debian\nSuite: stable\n",
    );
    let err = run(&debian(), &fetcher, MIRROR, ParallelConfig::serial()).unwrap_err();
    match err {
        CollectError::IncompleteRelease { missing, .. } => assert_eq!(missing, vec!["Codename"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_release_is_fatal() {
    let err = run(&debian(), &MemoryFetcher::new(), MIRROR, ParallelConfig::serial()).unwrap_err();
    assert!(err.is_fetch());
}

#[test]
fn missing_contents_degrades_to_a_warning() {
    let fetcher = MemoryFetcher::new()
        .with(format!("{MIRROR}/dists/stable/Release"), RELEASE)
        .with(
            format!("{MIRROR}/dists/stable/main/binary-amd64/Packages.gz"),
            gz(PACKAGES),
        );
    let (graph, summary) = run(&debian(), &fetcher, MIRROR, small_chunks()).unwrap();
    let v = Vocabulary::new(Ecosystem::Debian);

    assert_eq!(summary.packages, 2);
    assert_eq!(count_predicate(&graph, &v.file_name), 0);
    assert!(!summary.manifests[0].is_linked());

    // Both candidate locations were tried.
    let requested = fetcher.requested();
    assert!(requested.contains(&format!("{MIRROR}/dists/stable/main/Contents-amd64.gz")));
    assert!(requested.contains(&format!("{MIRROR}/dists/stable/Contents-amd64.gz")));
}

#[test]
fn distribution_level_contents_is_used_as_fallback() {
    let fetcher = MemoryFetcher::new()
        .with(format!("{MIRROR}/dists/stable/Release"), RELEASE)
        .with(
            format!("{MIRROR}/dists/stable/main/binary-amd64/Packages.gz"),
            gz(PACKAGES),
        )
        .with(format!("{MIRROR}/dists/stable/Contents-amd64.gz"), gz(CONTENTS));
    let (_, summary) = run(&debian(), &fetcher, MIRROR, ParallelConfig::serial()).unwrap();
    assert!(summary.manifests[0].is_linked());
}

#[test]
fn rpm_pipeline_links_files_and_changelogs() {
    let (graph, summary) = run(&RpmCollector::new(), &rpm_mirror(), RPM_MIRROR, small_chunks()).unwrap();
    let v = Vocabulary::new(Ecosystem::Rpm);

    assert_eq!(summary.ecosystem, Ecosystem::Rpm);
    assert_eq!(summary.packages, 2);
    assert_eq!(summary.repo_url, "http://mirror.test/fedora");
    assert!(summary.manifests.iter().all(|m| m.is_linked()));

    let bash = Ecosystem::Rpm.package_identity("bash", "5.2.26", Some("3.fc40"), Some("x86_64"));
    assert_eq!(
        objects(&graph, &bash, &v.rdf_type),
        vec![Term::from(&v.package_class)]
    );
    let mut files = literals(&graph, &bash, &v.file_name);
    files.sort();
    assert_eq!(files, ["/usr/bin/bash", "/usr/bin/sh"]);
    assert_eq!(count_predicate(&graph, &v.file_name), 2);
    assert_eq!(
        literals(&graph, &bash, &Ecosystem::Rpm.term("checksumType")),
        ["sha256"]
    );

    let repository = Ecosystem::Rpm.repository("http://mirror.test/fedora");
    assert_eq!(
        objects(&graph, &bash, &v.in_repository),
        vec![Term::from(&repository)]
    );
    assert_eq!(
        literals(&graph, &repository, &Ecosystem::Rpm.term("revision")),
        ["1718000000"]
    );

    let tzdata = Ecosystem::Rpm.package_identity("tzdata", "2024a", Some("5.fc40"), Some("noarch"));
    let changelogs = objects(&graph, &tzdata, &v.has_changelog);
    assert_eq!(changelogs.len(), 1);
    let Term::Node(entry) = &changelogs[0] else {
        panic!("changelog should be a node");
    };
    assert_eq!(literals(&graph, entry.clone(), &v.changelog_text), ["- Rebuilt"]);
    assert_eq!(
        literals(&graph, entry.clone(), &v.changelog_author),
        ["Packager <pkg@example.org> - 2024a-5"]
    );
    assert_eq!(literals(&graph, entry.clone(), &v.changelog_time), ["1714521600"]);
}

#[test]
fn rpm_metadata_not_listed_in_repomd_is_skipped() {
    let repomd = r#"<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <data type="primary"><location href="repodata/primary.xml.gz"/></data>
</repomd>"#;
    let fetcher = rpm_mirror().with(format!("{RPM_MIRROR}repodata/repomd.xml"), repomd);
    let (graph, summary) = run(&RpmCollector::new(), &fetcher, RPM_MIRROR, ParallelConfig::serial()).unwrap();

    assert_eq!(summary.packages, 2);
    assert_eq!(summary.manifests.len(), 2);
    assert!(summary.manifests.iter().all(|m| !m.is_linked()));
    assert_eq!(count_predicate(&graph, &Vocabulary::new(Ecosystem::Rpm).file_name), 0);
}

#[test]
fn repomd_without_primary_is_fatal() {
    let repomd = r#"<repomd><data type="filelists"><location href="f.xml"/></data></repomd>"#;
    let fetcher = MemoryFetcher::new().with(format!("{RPM_MIRROR}repodata/repomd.xml"), repomd);
    let err = run(&RpmCollector::new(), &fetcher, RPM_MIRROR, ParallelConfig::serial()).unwrap_err();
    assert!(matches!(err, CollectError::MissingMetadata { ref kind, .. } if kind == "primary"));
}

#[test]
fn summary_serializes_manifest_outcomes() {
    let (_, summary) = run(&debian(), &debian_mirror(), MIRROR, ParallelConfig::serial()).unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["ecosystem"], "debian");
    assert_eq!(json["packages"], 2);
    assert_eq!(json["manifests"][0]["resource"], "Contents");
    assert_eq!(json["manifests"][0]["status"], "linked");
}
