use std::path::PathBuf;

use async_trait::async_trait;
use callsight_core::{EngagementRecord, decode_body, decode_feed};
use tracing::info;

use crate::FetchError;

/// Something that can produce the engagement feed.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the raw response body.
    async fn fetch_body(&self) -> Result<String, FetchError>;

    /// Fetch and decode the feed.
    async fn fetch(&self) -> Result<Vec<EngagementRecord>, FetchError> {
        let body = self.fetch_body().await?;
        Ok(decode_feed(&body)?)
    }
}

#[async_trait]
impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        (**self).fetch_body().await
    }
}

/// A response body saved to disk, e.g. by `callsight fetch`.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for FileSource {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        info!(path = %self.path.display(), bytes = bytes.len(), "read saved feed");
        Ok(decode_body(&bytes))
    }
}
