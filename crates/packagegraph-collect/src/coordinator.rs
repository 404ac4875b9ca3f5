//! Chunked fan-out / fan-in of graph-producing work.
//!
//! Items are split into contiguous chunks; each chunk is processed by an
//! isolated worker into its own [`PartialGraph`], and the partials are merged
//! into the caller's graph in ascending chunk order once every chunk has
//! finished. Workers never see the combined graph.

use std::any::Any;
use std::io::{BufReader, BufWriter};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use packagegraph_rdf::{parse_into, write_graph, Graph, RdfFormat};
use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::config::{HandOff, ParallelConfig};
use crate::error::{ChunkFailure, CollectError};

/// Triples produced by one worker for one chunk.
#[derive(Debug)]
pub struct PartialGraph {
    chunk_index: usize,
    graph: Graph,
}

impl PartialGraph {
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// A finished chunk waiting to be merged.
enum Delivered {
    InMemory(PartialGraph),
    Spooled { chunk_index: usize, file: NamedTempFile },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ChunkRun {
    pub items: usize,
    pub chunks: usize,
    pub parallel: bool,
    pub triples_added: usize,
}

pub struct Coordinator {
    config: ParallelConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Coordinator {
    pub fn new(config: ParallelConfig) -> Result<Self, CollectError> {
        config.validate()?;
        let pool = if config.enabled {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("packagegraph-worker-{i}"))
                .build()
                .map_err(|e| CollectError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { config, pool })
    }

    pub fn serial() -> Self {
        Self {
            config: ParallelConfig::serial(),
            pool: None,
        }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Items buffered per streaming window: one chunk for every worker.
    pub fn window_size(&self) -> usize {
        if self.pool.is_some() {
            self.config.chunk_size.saturating_mul(self.config.workers)
        } else {
            self.config.chunk_size
        }
    }

    /// Runs `process` over `items` and merges the result into `graph`.
    ///
    /// `first_chunk` numbers the chunks of this call (streaming callers pass
    /// a running index so failure reports stay unambiguous). Results are
    /// staged in a scratch graph, so on failure `graph` is left as it was;
    /// chunked runs report every failed chunk.
    pub fn run<T, F>(
        &self,
        graph: &mut Graph,
        items: &[T],
        first_chunk: usize,
        process: F,
    ) -> Result<ChunkRun, CollectError>
    where
        T: Sync,
        F: Fn(usize, &[T], &mut Graph) -> Result<(), CollectError> + Sync,
    {
        let chunk_size = self.config.chunk_size;
        let pool = match &self.pool {
            Some(pool) if items.len() >= chunk_size => pool,
            _ => {
                let mut staged = Graph::new();
                process(first_chunk, items, &mut staged)?;
                return Ok(ChunkRun {
                    items: items.len(),
                    chunks: 1,
                    parallel: false,
                    triples_added: graph.absorb(staged),
                });
            }
        };

        let handoff = &self.config.handoff;
        let results: Vec<Result<Delivered, ChunkFailure>> = pool.install(|| {
            items
                .par_chunks(chunk_size)
                .enumerate()
                .map(|(offset, chunk)| run_chunk(first_chunk + offset, chunk, &process, handoff))
                .collect()
        });

        let total = results.len();
        let failed: Vec<ChunkFailure> = results
            .iter()
            .filter_map(|r| r.as_ref().err().cloned())
            .collect();
        if !failed.is_empty() {
            for failure in &failed {
                tracing::error!(chunk = failure.index, "{}", failure.message);
            }
            return Err(CollectError::ChunksFailed { failed, total });
        }

        // Spooled chunks can still fail to re-parse; stage them all first.
        let mut staged = Graph::new();
        for delivered in results.into_iter().flatten() {
            merge(&mut staged, delivered)?;
        }
        let triples_added = graph.absorb(staged);
        tracing::debug!(
            items = items.len(),
            chunks = total,
            triples_added,
            "merged partial graphs"
        );
        Ok(ChunkRun {
            items: items.len(),
            chunks: total,
            parallel: true,
            triples_added,
        })
    }
}

fn run_chunk<T, F>(
    chunk_index: usize,
    chunk: &[T],
    process: &F,
    handoff: &HandOff,
) -> Result<Delivered, ChunkFailure>
where
    F: Fn(usize, &[T], &mut Graph) -> Result<(), CollectError>,
{
    let failure = |message: String| ChunkFailure {
        index: chunk_index,
        message,
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut graph = Graph::new();
        process(chunk_index, chunk, &mut graph).map(|()| graph)
    }));
    let graph = match outcome {
        Ok(Ok(graph)) => graph,
        Ok(Err(e)) => return Err(failure(e.to_string())),
        Err(payload) => return Err(failure(format!("worker panicked: {}", panic_message(&*payload)))),
    };
    let partial = PartialGraph { chunk_index, graph };

    match handoff {
        HandOff::InMemory => Ok(Delivered::InMemory(partial)),
        HandOff::Spool { dir } => spool(partial, dir).map_err(|e| failure(e.to_string())),
    }
}

fn spool(partial: PartialGraph, dir: &Path) -> Result<Delivered, CollectError> {
    let chunk_index = partial.chunk_index;
    let mut file = tempfile::Builder::new()
        .prefix("packagegraph-")
        .suffix(&format!("_chunk_{chunk_index}.nt"))
        .tempfile_in(dir)
        .map_err(|e| CollectError::io(format!("spool file in {}", dir.display()), e))?;
    write_graph(&partial.graph, BufWriter::new(file.as_file_mut()), RdfFormat::NTriples)?;
    Ok(Delivered::Spooled { chunk_index, file })
}

fn merge(graph: &mut Graph, delivered: Delivered) -> Result<(), CollectError> {
    match delivered {
        Delivered::InMemory(partial) => {
            graph.absorb(partial.graph);
            Ok(())
        }
        Delivered::Spooled { chunk_index, file } => {
            let reader = file.reopen().map_err(|e| {
                CollectError::io(
                    format!("spooled chunk {chunk_index} ({})", file.path().display()),
                    e,
                )
            })?;
            parse_into(graph, BufReader::new(reader), RdfFormat::NTriples)?;
            // The temporary file is removed when `file` drops here.
            Ok(())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
