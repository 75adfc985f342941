//! Time-boxed memoisation of the feed body.
//!
//! The feed is fetched whole, so caching is whole-response and coarse: a body
//! younger than the TTL is served again, anything older is refetched. The
//! in-memory layer covers a single process (the browse session); the optional
//! on-disk layer lets separate CLI invocations share one fetch.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use callsight_core::decode_body;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{FetchError, RecordSource};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Raw feed body persisted under a cache directory.
pub struct DiskCache {
    path: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    /// Cache file for `key` (typically the feed URL) inside `dir`.
    pub fn new(dir: impl Into<PathBuf>, key: &str, ttl: Duration) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut name = String::from("feed-");
        for byte in &digest[..8] {
            let _ = write!(name, "{byte:02x}");
        }
        name.push_str(".json");
        Self {
            path: dir.into().join(name),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached body and its age, if present and younger than the TTL.
    pub async fn load(&self) -> Result<Option<(String, Duration)>, FetchError> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io(e)),
        };
        let modified = meta.modified().map_err(|e| self.io(e))?;
        let age = modified.elapsed().unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            debug!(path = %self.path.display(), age_secs = age.as_secs(), "disk cache is stale");
            return Ok(None);
        }
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| self.io(e))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "serving feed from disk cache");
        Ok(Some((decode_body(&bytes), age)))
    }

    pub async fn store(&self, body: &str) -> Result<(), FetchError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| self.io(e))?;
        }
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| self.io(e))
    }

    /// Remove the cached body. A missing file is not an error.
    pub async fn clear(&self) -> Result<(), FetchError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io(e)),
        }
    }

    fn io(&self, source: std::io::Error) -> FetchError {
        FetchError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

struct Cached {
    fetched_at: Instant,
    body: String,
}

/// Wraps a source and reuses its body for `ttl`.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    disk: Option<DiskCache>,
    slot: Mutex<Option<Cached>>,
}

impl<S: RecordSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            disk: None,
            slot: Mutex::new(None),
        }
    }

    /// Also persist bodies to disk so later processes can reuse them.
    pub fn with_disk(mut self, disk: DiskCache) -> Self {
        self.disk = Some(disk);
        self
    }

    /// Drop every cached copy; the next fetch goes to the inner source.
    pub async fn invalidate(&self) -> Result<(), FetchError> {
        *self.slot.lock().await = None;
        if let Some(disk) = &self.disk {
            disk.clear().await?;
        }
        debug!("feed cache invalidated");
        Ok(())
    }

    async fn load_disk(&self) -> Option<(String, Duration)> {
        let disk = self.disk.as_ref()?;
        match disk.load().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable disk cache");
                None
            }
        }
    }
}

#[async_trait]
impl<S: RecordSource> RecordSource for CachedSource<S> {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            debug!("serving feed from memory cache");
            return Ok(cached.body.clone());
        }

        let (body, age) = match self.load_disk().await {
            Some(hit) => hit,
            None => {
                let body = self.inner.fetch_body().await?;
                if let Some(disk) = &self.disk
                    && let Err(e) = disk.store(&body).await
                {
                    warn!(error = %e, "could not write disk cache");
                }
                (body, Duration::ZERO)
            }
        };

        // A disk hit keeps its age so the TTL still counts from the original fetch.
        *slot = Instant::now().checked_sub(age).map(|fetched_at| Cached {
            fetched_at,
            body: body.clone(),
        });
        Ok(body)
    }
}
