//! File-manifest linking: attach `fileName` triples to known packages.
//!
//! Manifests (Debian `Contents-*`, RPM `filelists.xml`) can be far larger
//! than memory. They are consumed as a stream in windows of
//! `chunk_size * workers` entries; each window goes through the
//! [`Coordinator`] and is merged before the next one is read.

use std::collections::HashMap;
use std::io::BufRead;

use packagegraph_rdf::{Graph, Iri};
use serde::Serialize;

use crate::coordinator::Coordinator;
use crate::error::CollectError;
use crate::identity::NodeIdentity;

/// Lookup key (package name or RPM pkgid) to package identity.
pub type NameIndex = HashMap<String, NodeIdentity>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub entries: usize,
    pub windows: usize,
    pub chunks: usize,
    pub triples_added: usize,
}

/// Splits a `Contents` line into `(path, owners)`.
///
/// The owner list is the last whitespace-separated column; the path is
/// everything before it (paths may contain spaces).
pub fn parse_contents_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end();
    let split = line.rfind(char::is_whitespace)?;
    let path = line[..split].trim();
    let owners = line[split..].trim_start();
    if path.is_empty() || owners.is_empty() {
        return None;
    }
    Some((path, owners))
}

/// Package names in a `section/name,section/name` owner column.
pub fn contents_owners(owners: &str) -> impl Iterator<Item = &str> {
    owners
        .split(',')
        .map(|owner| owner.rsplit('/').next().unwrap_or(owner).trim())
        .filter(|name| !name.is_empty())
}

/// Links one `Contents` line; owners absent from `index` are skipped.
pub fn link_contents_line(
    graph: &mut Graph,
    index: &NameIndex,
    file_name: &Iri,
    line: &str,
) -> usize {
    let Some((path, owners)) = parse_contents_line(line) else {
        return 0;
    };
    contents_owners(owners)
        .filter_map(|owner| index.get(owner))
        .filter(|package| graph.add_literal(*package, file_name, path))
        .count()
}

/// Streams manifest entries through the coordinator window by window.
pub struct ManifestLinker<'a> {
    coordinator: &'a Coordinator,
    index: &'a NameIndex,
}

impl<'a> ManifestLinker<'a> {
    pub fn new(coordinator: &'a Coordinator, index: &'a NameIndex) -> Self {
        Self { coordinator, index }
    }

    /// Consumes `entries`, calling `link` for every entry inside a worker.
    pub fn link_stream<T, I, F>(
        &self,
        graph: &mut Graph,
        entries: I,
        link: F,
    ) -> Result<LinkStats, CollectError>
    where
        T: Sync,
        I: IntoIterator<Item = Result<T, CollectError>>,
        F: Fn(&T, &NameIndex, &mut Graph) + Sync,
    {
        let window = self.coordinator.window_size().max(1);
        let mut stats = LinkStats::default();
        let mut buffer: Vec<T> = Vec::with_capacity(window.min(1 << 16));

        for entry in entries {
            buffer.push(entry?);
            if buffer.len() == window {
                self.flush(graph, &mut buffer, &mut stats, &link)?;
            }
        }
        if !buffer.is_empty() {
            self.flush(graph, &mut buffer, &mut stats, &link)?;
        }
        Ok(stats)
    }

    /// Links a `Contents`-style line stream. Invalid UTF-8 is replaced.
    pub fn link_lines<R: BufRead>(
        &self,
        graph: &mut Graph,
        reader: R,
        file_name: &Iri,
        source: &str,
    ) -> Result<LinkStats, CollectError> {
        self.link_stream(graph, LossyLines::new(reader, source), |line, index, partial| {
            link_contents_line(partial, index, file_name, line);
        })
    }

    fn flush<T, F>(
        &self,
        graph: &mut Graph,
        buffer: &mut Vec<T>,
        stats: &mut LinkStats,
        link: &F,
    ) -> Result<(), CollectError>
    where
        T: Sync,
        F: Fn(&T, &NameIndex, &mut Graph) + Sync,
    {
        let index = self.index;
        let run = self
            .coordinator
            .run(graph, buffer.as_slice(), stats.chunks, |_, chunk, partial| {
                for entry in chunk {
                    link(entry, index, partial);
                }
                Ok(())
            })?;
        stats.entries += run.items;
        stats.windows += 1;
        stats.chunks += run.chunks;
        stats.triples_added += run.triples_added;
        tracing::debug!(
            window = stats.windows,
            entries = stats.entries,
            "manifest window merged"
        );
        buffer.clear();
        Ok(())
    }
}

/// Line iterator that decodes each line lossily instead of failing.
pub struct LossyLines<R> {
    reader: R,
    source: String,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R, source: &str) -> Self {
        Self {
            reader,
            source: source.to_string(),
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = Result<String, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(CollectError::io(format!("reading {}", self.source), e))),
        }
    }
}
