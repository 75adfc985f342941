use std::path::PathBuf;

use callsight_core::FeedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
