use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum RdfError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write error: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to parse {format}: {message}")]
    Parse { format: &'static str, message: String },

    #[error("unsupported RDF format: {0}")]
    UnsupportedFormat(String),

    #[error(
        "prefix `{prefix}` is bound to <{first}> and <{second}> (in {})",
        path.display()
    )]
    PrefixConflict {
        prefix: String,
        first: String,
        second: String,
        path: PathBuf,
    },
}

impl RdfError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
