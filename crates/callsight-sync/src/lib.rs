//! Record sources: HTTP feed client, saved response files, and TTL caching.

mod cache;
mod error;
mod source;

pub use cache::{CachedSource, DEFAULT_CACHE_TTL, DiskCache};
pub use error::FetchError;
pub use source::{FileSource, RecordSource};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::FeedClient;
