use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] valentine_core::Error),
    #[error(transparent)]
    Sync(#[from] valentine_core::SyncError),
    #[error(transparent)]
    Store(#[from] valentine_core::store::StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("A card holds at most {max} videos, got {count}")]
    TooManyVideos { max: usize, count: usize },
    #[error("Failed to read video {path}: {source}")]
    VideoRead { path: String, source: io::Error },
    #[error(
        "API base URL is not configured. Run `valentine config init --api-base-url <URL>` or set VALENTINE_API_BASE_URL."
    )]
    ApiNotConfigured,
    #[error(
        "Share base URL is not configured. Run `valentine config init --share-base-url <URL>` or set VALENTINE_SHARE_BASE_URL."
    )]
    ShareNotConfigured,
}
