//! RPM repositories: `repomd.xml`, `primary`, `filelists` and `other`.

pub mod manifests;
pub mod primary;
pub mod xml;

use std::io::BufRead;

use packagegraph_rdf::Graph;

use crate::collector::{CollectContext, EcosystemCollector, ManifestOutcome, Normalized};
use crate::emit::{emit_changelog, emit_repository, EmitScope, Vocabulary};
use crate::error::CollectError;
use crate::identity::Ecosystem;
use crate::manifest::{ManifestLinker, NameIndex};
use crate::record::PackageRecord;

pub use manifests::{ChangelogEntry, ChangelogReader, Changelogs, FileList, FileListReader};
pub use primary::parse_primary;
pub use xml::{parse_repomd, RepoMetadata};

#[derive(Debug, Clone)]
pub struct RpmSource {
    pub repomd_url: String,
    pub metadata: RepoMetadata,
}

#[derive(Debug, Default)]
pub struct RpmCollector;

impl RpmCollector {
    pub fn new() -> Self {
        Self
    }
}

impl EcosystemCollector for RpmCollector {
    type Source = RpmSource;

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Rpm
    }

    fn resolve_source(&self, ctx: &CollectContext<'_>) -> Result<RpmSource, CollectError> {
        let repomd_url = ctx.url("repodata/repomd.xml");
        tracing::info!(url = %repomd_url, "fetching repository metadata");
        let bytes = ctx.fetch_bytes(&repomd_url)?;
        let metadata = parse_repomd(&bytes, &repomd_url)?;
        if metadata.location("primary").is_none() {
            return Err(CollectError::MissingMetadata {
                kind: "primary".into(),
                url: repomd_url,
            });
        }
        if let Some(revision) = &metadata.revision {
            ctx.diagnostics.log(format_args!("repository revision {revision}"));
        }
        Ok(RpmSource {
            repomd_url,
            metadata,
        })
    }

    fn describe_source(
        &self,
        ctx: &CollectContext<'_>,
        source: &RpmSource,
        graph: &mut Graph,
    ) -> EmitScope {
        let scope = EmitScope::new(Ecosystem::Rpm);
        let repository = emit_repository(
            graph,
            &scope.vocabulary,
            ctx.repo_url(),
            source.metadata.revision.as_deref(),
        );
        scope.in_repository(repository)
    }

    fn fetch_primary(
        &self,
        ctx: &CollectContext<'_>,
        source: &RpmSource,
    ) -> Result<Box<dyn BufRead + Send>, CollectError> {
        let location = source.metadata.location("primary").ok_or_else(|| {
            CollectError::MissingMetadata {
                kind: "primary".into(),
                url: source.repomd_url.clone(),
            }
        })?;
        let url = ctx.url(location);
        tracing::info!(%url, "fetching primary metadata");
        ctx.open_decoded(&url)
    }

    fn normalize(
        &self,
        ctx: &CollectContext<'_>,
        primary: Box<dyn BufRead + Send>,
    ) -> Result<Normalized, CollectError> {
        let mut normalized = Normalized::default();
        parse_primary(primary, "primary.xml", |record| match record {
            Ok(record) => normalized.records.push(record),
            Err(e) => {
                tracing::debug!(error = %e, "skipping package");
                normalized.rejected += 1;
            }
        })?;
        ctx.diagnostics.log(format_args!(
            "parsed {} package entries",
            normalized.records.len() + normalized.rejected
        ));
        Ok(normalized)
    }

    fn index_key(&self, record: &PackageRecord) -> Option<String> {
        record.attribute("pkgid").map(str::to_string)
    }

    fn link_manifest(
        &self,
        ctx: &CollectContext<'_>,
        source: &RpmSource,
        index: &NameIndex,
        graph: &mut Graph,
    ) -> Result<Vec<ManifestOutcome>, CollectError> {
        let vocabulary = Vocabulary::new(Ecosystem::Rpm);
        let linker = ManifestLinker::new(ctx.coordinator, index);
        let mut outcomes = Vec::with_capacity(2);

        outcomes.push(match source.metadata.location("filelists") {
            Some(location) => ctx.link_optional("filelists", &[ctx.url(location)], |url, reader| {
                linker.link_stream(graph, FileListReader::new(reader, url), |list, index, partial| {
                    let Some(package) = index.get(&list.pkgid) else {
                        return;
                    };
                    for path in &list.files {
                        partial.add_literal(package, &vocabulary.file_name, path.as_str());
                    }
                })
            })?,
            None => unlisted("filelists"),
        });

        outcomes.push(match source.metadata.location("other") {
            Some(location) => ctx.link_optional("other", &[ctx.url(location)], |url, reader| {
                linker.link_stream(graph, ChangelogReader::new(reader, url), |set, index, partial| {
                    let Some(package) = index.get(&set.pkgid) else {
                        return;
                    };
                    for entry in &set.entries {
                        emit_changelog(
                            partial,
                            &vocabulary,
                            package,
                            entry.author.as_deref(),
                            entry.date.as_deref(),
                            &entry.text,
                        );
                    }
                })
            })?,
            None => unlisted("other"),
        });

        Ok(outcomes)
    }
}

fn unlisted(kind: &str) -> ManifestOutcome {
    tracing::warn!("repomd.xml does not list `{kind}` metadata, skipping");
    ManifestOutcome::unavailable(kind, "not listed in repomd.xml")
}
