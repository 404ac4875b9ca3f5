//! Collection configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CollectError;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_WORKERS: usize = 4;

/// How a worker hands its partial graph back to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum HandOff {
    /// Return the owned partial graph directly.
    #[default]
    InMemory,
    /// Serialize each partial graph to a temporary N-Triples file in `dir`
    /// and re-parse it on the coordinator.
    Spool { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    pub enabled: bool,
    pub chunk_size: usize,
    pub workers: usize,
    #[serde(default)]
    pub handoff: HandOff,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            handoff: HandOff::InMemory,
        }
    }
}

impl ParallelConfig {
    pub fn serial() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CollectError> {
        if self.chunk_size == 0 {
            return Err(CollectError::Config("chunk size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(CollectError::Config("worker count must be at least 1".into()));
        }
        if let HandOff::Spool { dir } = &self.handoff {
            if !dir.is_dir() {
                return Err(CollectError::Config(format!(
                    "spool directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: concat!("packagegraph/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Which slice of a Debian archive to collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebianSelector {
    pub distribution: String,
    pub component: String,
    /// Index directory name, e.g. `binary-amd64`.
    pub arch: String,
}

impl Default for DebianSelector {
    fn default() -> Self {
        Self {
            distribution: "stable".into(),
            component: "main".into(),
            arch: "binary-amd64".into(),
        }
    }
}

impl DebianSelector {
    /// Architecture name used by `Contents-<arch>.gz` (`binary-amd64` -> `amd64`).
    pub fn contents_arch(&self) -> &str {
        self.arch.rsplit('-').next().unwrap_or(&self.arch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectConfig {
    pub repo_url: String,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl CollectConfig {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            parallel: ParallelConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
