//! The collection pipeline shared by every ecosystem.

use std::io::{BufRead, BufReader, Read};

use packagegraph_rdf::Graph;
use serde::Serialize;

use crate::compression::{decode, decompress, Compression};
use crate::coordinator::Coordinator;
use crate::diagnostics::Diagnostics;
use crate::emit::{emit_packages, EmitScope};
use crate::error::CollectError;
use crate::fetch::Fetch;
use crate::identity::Ecosystem;
use crate::manifest::{LinkStats, NameIndex};
use crate::record::PackageRecord;

/// Everything a collector needs from its surroundings.
pub struct CollectContext<'a> {
    repo_url: String,
    pub fetcher: &'a dyn Fetch,
    pub coordinator: &'a Coordinator,
    pub diagnostics: &'a Diagnostics,
}

impl<'a> CollectContext<'a> {
    pub fn new(
        repo_url: &str,
        fetcher: &'a dyn Fetch,
        coordinator: &'a Coordinator,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            repo_url: repo_url.trim_end_matches('/').to_string(),
            fetcher,
            coordinator,
            diagnostics,
        }
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// `path` resolved against the repository base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.repo_url, path.trim_start_matches('/'))
    }

    /// Fetches a small resource fully, decompressing by suffix.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CollectError> {
        let bytes = self.fetcher.get(url)?;
        decompress(bytes, Compression::from_url(url), url)
    }

    /// Opens a resource as a decompressed stream.
    pub fn open_decoded(&self, url: &str) -> Result<Box<dyn BufRead + Send>, CollectError> {
        let raw = self.fetcher.open(url)?;
        let decoded: Box<dyn Read + Send> = decode(raw, Compression::from_url(url), url)?;
        Ok(Box::new(BufReader::new(decoded)))
    }

    /// Links an optional resource, trying `urls` in order.
    ///
    /// Failing to *fetch* every candidate is not an error: it is logged and
    /// reported as [`ManifestStatus::Unavailable`]. Failures after a
    /// candidate was opened (decoding, linking) propagate.
    pub fn link_optional<F>(
        &self,
        resource: &str,
        urls: &[String],
        link: F,
    ) -> Result<ManifestOutcome, CollectError>
    where
        F: FnOnce(&str, Box<dyn BufRead + Send>) -> Result<LinkStats, CollectError>,
    {
        let mut last_error = None;
        for url in urls {
            match self.open_decoded(url) {
                Ok(reader) => {
                    tracing::info!(%url, "linking {resource}");
                    let stats = link(url, reader)?;
                    return Ok(ManifestOutcome {
                        resource: resource.to_string(),
                        status: ManifestStatus::Linked {
                            url: url.clone(),
                            stats,
                        },
                    });
                }
                Err(e) if e.is_fetch() => {
                    tracing::debug!(%url, error = %e, "{resource} candidate unavailable");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let reason = match last_error {
            Some(e) => e.to_string(),
            None => "no candidate location".to_string(),
        };
        tracing::warn!("{resource} unavailable, continuing without it: {reason}");
        Ok(ManifestOutcome::unavailable(resource, reason))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestOutcome {
    pub resource: String,
    #[serde(flatten)]
    pub status: ManifestStatus,
}

impl ManifestOutcome {
    pub fn unavailable(resource: &str, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.to_string(),
            status: ManifestStatus::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self.status, ManifestStatus::Linked { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ManifestStatus {
    Linked { url: String, stats: LinkStats },
    Unavailable { reason: String },
}

/// Records produced by a normalizer plus the number of entries it dropped.
#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<PackageRecord>,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectSummary {
    pub ecosystem: Ecosystem,
    pub repo_url: String,
    pub packages: usize,
    pub rejected: usize,
    pub triples_added: usize,
    pub manifests: Vec<ManifestOutcome>,
}

/// One package ecosystem's view of a repository.
pub trait EcosystemCollector {
    /// Resolved release / repository descriptor.
    type Source;

    fn ecosystem(&self) -> Ecosystem;

    fn resolve_source(&self, ctx: &CollectContext<'_>) -> Result<Self::Source, CollectError>;

    /// Adds the nodes describing `source` and returns the scope packages
    /// are emitted under.
    fn describe_source(
        &self,
        ctx: &CollectContext<'_>,
        source: &Self::Source,
        graph: &mut Graph,
    ) -> EmitScope;

    fn fetch_primary(
        &self,
        ctx: &CollectContext<'_>,
        source: &Self::Source,
    ) -> Result<Box<dyn BufRead + Send>, CollectError>;

    fn normalize(
        &self,
        ctx: &CollectContext<'_>,
        primary: Box<dyn BufRead + Send>,
    ) -> Result<Normalized, CollectError>;

    /// Key manifest entries use to refer to `record`.
    fn index_key(&self, record: &PackageRecord) -> Option<String>;

    fn link_manifest(
        &self,
        ctx: &CollectContext<'_>,
        source: &Self::Source,
        index: &NameIndex,
        graph: &mut Graph,
    ) -> Result<Vec<ManifestOutcome>, CollectError>;
}

/// Builds the manifest lookup table; later records win on key collisions.
pub fn build_index<C: EcosystemCollector + ?Sized>(
    collector: &C,
    records: &[PackageRecord],
) -> NameIndex {
    records
        .iter()
        .filter_map(|record| Some((collector.index_key(record)?, record.identity())))
        .collect()
}

/// Runs the full pipeline for `collector` into `graph`.
pub fn collect<C: EcosystemCollector>(
    collector: &C,
    ctx: &CollectContext<'_>,
    graph: &mut Graph,
) -> Result<CollectSummary, CollectError> {
    let ecosystem = collector.ecosystem();
    let diagnostics = ctx.diagnostics;
    let before = graph.len();
    graph.bind_prefix(ecosystem.prefix(), ecosystem.namespace());
    tracing::info!(%ecosystem, repo = ctx.repo_url(), "collecting");

    let source = {
        let _step = diagnostics.step("resolve release");
        collector.resolve_source(ctx)?
    };
    let scope = collector.describe_source(ctx, &source, graph);

    let normalized = {
        let _step = diagnostics.step("fetch and normalize primary metadata");
        let primary = collector.fetch_primary(ctx, &source)?;
        collector.normalize(ctx, primary)?
    };
    if normalized.rejected > 0 {
        tracing::warn!(
            rejected = normalized.rejected,
            "dropped package entries without name or version"
        );
    }
    diagnostics.log(format_args!(
        "{} valid packages, {} rejected",
        normalized.records.len(),
        normalized.rejected
    ));

    {
        let _step = diagnostics.step("emit packages");
        let run = emit_packages(ctx.coordinator, graph, &scope, &normalized.records)?;
        diagnostics.log(format_args!(
            "{} triples from {} chunk(s)",
            run.triples_added, run.chunks
        ));
    }

    let index = {
        let _step = diagnostics.step("build name index");
        build_index(collector, &normalized.records)
    };

    let manifests = {
        let _step = diagnostics.step("link file manifest");
        collector.link_manifest(ctx, &source, &index, graph)?
    };

    let summary = CollectSummary {
        ecosystem,
        repo_url: ctx.repo_url().to_string(),
        packages: normalized.records.len(),
        rejected: normalized.rejected,
        triples_added: graph.len() - before,
        manifests,
    };
    tracing::info!(
        packages = summary.packages,
        triples = summary.triples_added,
        "collection finished"
    );
    Ok(summary)
}
