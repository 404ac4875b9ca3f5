//! Resource fetching: HTTP(S) mirrors, `file://` mirrors and in-memory fixtures.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::time::Duration;

use parking_lot::Mutex;
use url::Url;

use crate::config::HttpConfig;
use crate::error::{CollectError, FetchError};

pub trait Fetch: Send + Sync {
    /// Opens `url` for streaming reads.
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, FetchError>;

    /// Reads `url` fully into memory.
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut reader = self.open(url)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(bytes)
    }
}

/// Blocking `reqwest` client that also serves `file://` URLs from disk.
pub struct MirrorFetcher {
    client: reqwest::blocking::Client,
}

impl MirrorFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, CollectError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| CollectError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Opens a `file://` URL, decoding percent-escapes in its path.
    fn open_file(url: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        let path = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.to_file_path().ok())
            .ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                message: "not a local file path".to_string(),
            })?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::Missing {
                url: url.to_string(),
            }),
            Err(e) => Err(FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

impl Fetch for MirrorFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        if url.starts_with("file:") {
            return Self::open_file(url);
        }

        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Box::new(response))
    }
}

/// Serves fixed byte buffers by exact URL; unknown URLs are `Missing`.
#[derive(Default)]
pub struct MemoryFetcher {
    resources: HashMap<String, Vec<u8>>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.resources.insert(url.into(), bytes.into());
    }

    /// Every URL opened so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

impl Fetch for MemoryFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        self.requested.lock().push(url.to_string());
        match self.resources.get(url) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(FetchError::Missing {
                url: url.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fetcher_serves_and_records() {
        let fetcher = MemoryFetcher::new().with("http://m/a", "alpha");
        assert_eq!(fetcher.get("http://m/a").unwrap(), b"alpha");
        assert!(matches!(
            fetcher.get("http://m/b"),
            Err(FetchError::Missing { .. })
        ));
        assert_eq!(fetcher.requested(), ["http://m/a", "http://m/b"]);
    }

    #[test]
    fn file_urls_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Release");
        std::fs::write(&path, "Codename: bookworm\n").unwrap();

        let fetcher = MirrorFetcher::new(&HttpConfig::default()).unwrap();
        let url = format!("file://{}", path.display());
        assert_eq!(fetcher.get(&url).unwrap(), b"Codename: bookworm\n");

        let missing = format!("file://{}", dir.path().join("InRelease").display());
        assert!(matches!(
            fetcher.get(&missing),
            Err(FetchError::Missing { .. })
        ));
    }

    #[test]
    fn percent_encoded_file_urls_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = dir.path().join("my mirror");
        std::fs::create_dir(&mirror).unwrap();
        std::fs::write(mirror.join("Release"), "Codename: trixie\n").unwrap();

        let base = Url::from_directory_path(&mirror).unwrap();
        let url = base.join("Release").unwrap();
        assert!(url.as_str().contains("my%20mirror"));

        let fetcher = MirrorFetcher::new(&HttpConfig::default()).unwrap();
        assert_eq!(fetcher.get(url.as_str()).unwrap(), b"Codename: trixie\n");
    }
}
