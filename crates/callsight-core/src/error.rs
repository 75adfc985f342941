use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected feed shape: {0}")]
    Shape(String),
}
