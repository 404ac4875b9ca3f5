use std::fmt;

use packagegraph_rdf::RdfError;

/// Transport-level failure fetching a remote (or `file://`) resource.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} does not exist")]
    Missing { url: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Missing { url } => url,
        }
    }
}

/// A raw metadata entry that cannot become a `PackageRecord`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("package entry has no `{0}`")]
    MissingField(&'static str),
}

/// One chunk that failed (returned an error or panicked) in a parallel run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk {}: {}", self.index, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{codec} decoder is not available (rebuild with the `{codec}` feature) for {url}")]
    CodecUnavailable { codec: &'static str, url: String },

    #[error("release file {url} is missing required field(s): {}", missing.join(", "))]
    IncompleteRelease {
        url: String,
        missing: Vec<&'static str>,
    },

    #[error("{url} does not list `{kind}` metadata")]
    MissingMetadata { kind: String, url: String },

    #[error("malformed XML in {context}: {message}")]
    Xml { context: String, message: String },

    #[error(transparent)]
    Rdf(#[from] RdfError),

    #[error("worker pool: {0}")]
    ThreadPool(String),

    #[error(
        "{} of {total} chunk(s) failed: {}",
        failed.len(),
        failed.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    ChunksFailed {
        failed: Vec<ChunkFailure>,
        total: usize,
    },
}

impl CollectError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn xml(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Xml {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// True for failures to obtain a resource at all (as opposed to failures
    /// while decoding or processing it).
    pub fn is_fetch(&self) -> bool {
        matches!(self, CollectError::Fetch(_))
    }
}
