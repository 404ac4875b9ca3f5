//! Package repository metadata to RDF.
//!
//! A collection run fetches a repository's release descriptor and primary
//! package index, normalizes every entry into a [`PackageRecord`], emits the
//! records as triples (optionally in parallel chunks through the
//! [`Coordinator`]) and finally links the file manifest onto the emitted
//! packages.
//!
//! ```no_run
//! use packagegraph_collect::{
//!     collect, CollectContext, Coordinator, DebianCollector, DebianSelector, Diagnostics,
//!     HttpConfig, MirrorFetcher, ParallelConfig,
//! };
//! use packagegraph_rdf::Graph;
//!
//! # fn main() -> Result<(), packagegraph_collect::CollectError> {
//! let fetcher = MirrorFetcher::new(&HttpConfig::default())?;
//! let coordinator = Coordinator::new(ParallelConfig::default())?;
//! let diagnostics = Diagnostics::disabled();
//! let ctx = CollectContext::new("http://deb.debian.org/debian", &fetcher, &coordinator, &diagnostics);
//!
//! let mut graph = Graph::new();
//! let summary = collect(&DebianCollector::new(DebianSelector::default()), &ctx, &mut graph)?;
//! println!("{} packages, {} triples", summary.packages, graph.len());
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod compression;
pub mod config;
pub mod coordinator;
pub mod debian;
pub mod depgrammar;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod manifest;
pub mod record;
pub mod rpm;

pub use collector::{
    build_index, collect, CollectContext, CollectSummary, EcosystemCollector, ManifestOutcome,
    ManifestStatus, Normalized,
};
pub use compression::Compression;
pub use config::{CollectConfig, DebianSelector, HandOff, HttpConfig, ParallelConfig};
pub use coordinator::{ChunkRun, Coordinator, PartialGraph};
pub use debian::DebianCollector;
pub use depgrammar::{parse_dependency_string, DependencyConstraint};
pub use diagnostics::Diagnostics;
pub use emit::{emit_package, EmitScope, Vocabulary};
pub use error::{ChunkFailure, CollectError, FetchError, RecordError};
pub use fetch::{Fetch, MemoryFetcher, MirrorFetcher};
pub use identity::{Ecosystem, NodeIdentity, DEBIAN_NAMESPACE, RPM_NAMESPACE};
pub use manifest::{LinkStats, ManifestLinker, NameIndex};
pub use record::{DependencyField, PackageRecord};
pub use rpm::RpmCollector;
