//! Debian archives: `Release`, `Packages.gz` and `Contents-<arch>.gz`.

pub mod deb822;

use std::io::BufRead;

use packagegraph_rdf::Graph;

use crate::collector::{CollectContext, EcosystemCollector, ManifestOutcome, Normalized};
use crate::config::DebianSelector;
use crate::emit::{emit_suite, EmitScope, Vocabulary};
use crate::error::CollectError;
use crate::identity::Ecosystem;
use crate::manifest::{ManifestLinker, NameIndex};
use crate::record::PackageRecord;

pub use deb822::{normalize_stanza, parse_release, ReleaseInfo, Stanza, Stanzas};

pub struct DebianCollector {
    selector: DebianSelector,
}

impl DebianCollector {
    pub fn new(selector: DebianSelector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &DebianSelector {
        &self.selector
    }

    fn dist_path(&self, rest: &str) -> String {
        format!("dists/{}/{rest}", self.selector.distribution)
    }

    /// Component-level `Contents` first, then the distribution-level one.
    pub fn contents_urls(&self, ctx: &CollectContext<'_>) -> Vec<String> {
        let file = format!("Contents-{}.gz", self.selector.contents_arch());
        vec![
            ctx.url(&self.dist_path(&format!("{}/{file}", self.selector.component))),
            ctx.url(&self.dist_path(&file)),
        ]
    }
}

impl EcosystemCollector for DebianCollector {
    type Source = ReleaseInfo;

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Debian
    }

    fn resolve_source(&self, ctx: &CollectContext<'_>) -> Result<ReleaseInfo, CollectError> {
        let release_url = ctx.url(&self.dist_path("Release"));
        tracing::info!(url = %release_url, "fetching release info");
        let (url, bytes) = match ctx.fetch_bytes(&release_url) {
            Ok(bytes) => (release_url, bytes),
            Err(e) if e.is_fetch() => {
                let inrelease_url = ctx.url(&self.dist_path("InRelease"));
                tracing::warn!(error = %e, "Release unavailable, trying {inrelease_url}");
                match ctx.fetch_bytes(&inrelease_url) {
                    Ok(bytes) => (inrelease_url, bytes),
                    Err(fallback) if fallback.is_fetch() => return Err(e),
                    Err(fallback) => return Err(fallback),
                }
            }
            Err(e) => return Err(e),
        };

        let release = parse_release(&String::from_utf8_lossy(&bytes), &url)?;
        ctx.diagnostics.log(format_args!(
            "release {} ({}) from {}",
            release.codename, release.suite, release.origin
        ));
        Ok(release)
    }

    fn describe_source(
        &self,
        _ctx: &CollectContext<'_>,
        release: &ReleaseInfo,
        graph: &mut Graph,
    ) -> EmitScope {
        let scope = EmitScope::new(Ecosystem::Debian);
        let suite = emit_suite(
            graph,
            &scope.vocabulary,
            &release.origin,
            &release.codename,
            &release.suite,
        );
        scope.in_suite(suite)
    }

    fn fetch_primary(
        &self,
        ctx: &CollectContext<'_>,
        _release: &ReleaseInfo,
    ) -> Result<Box<dyn BufRead + Send>, CollectError> {
        let url = ctx.url(&self.dist_path(&format!(
            "{}/{}/Packages.gz",
            self.selector.component, self.selector.arch
        )));
        tracing::info!(%url, "fetching package index");
        ctx.open_decoded(&url)
    }

    fn normalize(
        &self,
        ctx: &CollectContext<'_>,
        primary: Box<dyn BufRead + Send>,
    ) -> Result<Normalized, CollectError> {
        let mut normalized = Normalized::default();
        for stanza in Stanzas::new(primary, "Packages") {
            match normalize_stanza(&stanza?) {
                Ok(record) => normalized.records.push(record),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping stanza");
                    normalized.rejected += 1;
                }
            }
        }
        ctx.diagnostics
            .log(format_args!("parsed {} stanzas", normalized.records.len() + normalized.rejected));
        Ok(normalized)
    }

    fn index_key(&self, record: &PackageRecord) -> Option<String> {
        Some(record.name().to_string())
    }

    fn link_manifest(
        &self,
        ctx: &CollectContext<'_>,
        _release: &ReleaseInfo,
        index: &NameIndex,
        graph: &mut Graph,
    ) -> Result<Vec<ManifestOutcome>, CollectError> {
        let file_name = Vocabulary::new(Ecosystem::Debian).file_name;
        let linker = ManifestLinker::new(ctx.coordinator, index);
        let outcome = ctx.link_optional("Contents", &self.contents_urls(ctx), |url, reader| {
            linker.link_lines(graph, reader, &file_name, url)
        })?;
        Ok(vec![outcome])
    }
}
