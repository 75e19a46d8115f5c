//! Save/restore client for the versioned snapshot store.
//!
//! Every operation validates and encodes locally, talks to the store once,
//! and normalizes any failure into a [`SyncError`]. Nothing escapes as a
//! panic or a raw store error.

mod errors;
mod validation;

use std::fmt;
use std::sync::Arc;

use crate::codec;
use crate::models::{EditableContent, RemoteSnapshot};
use crate::store::VersionedStore;
use crate::tokens::WriteTokenStore;
use crate::util::{nanos_to_millis, unix_timestamp_millis};

pub use errors::{
    normalize_message, ErrorKind, SyncError, CONNECTION_UNAVAILABLE_MESSAGE, FALLBACK_MESSAGE,
    GLOBAL_LATEST_EMPTY_MESSAGE, LOGIN_REQUIRED_MESSAGE, SAVE_NOT_FOUND_MESSAGE,
    TOKEN_NOT_FOUND_MESSAGE,
};
pub use validation::{validate_video_sizes, MAX_TOTAL_SIZE, MAX_VIDEO_SIZE};

pub type SyncResult<T> = Result<T, SyncError>;

/// Outcome of a successful save.
#[derive(Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Present for per-save snapshots, absent for the global latest slot
    pub save_id: Option<String>,
    /// Only returned by create
    pub write_token: Option<String>,
    pub version: u64,
    /// Unix milliseconds
    pub saved_at: i64,
}

impl fmt::Debug for SaveReceipt {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SaveReceipt")
            .field("save_id", &self.save_id)
            .field("write_token", &self.write_token.as_ref().map(|_| "[REDACTED]"))
            .field("version", &self.version)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// Content restored from a stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredContent {
    pub content: EditableContent,
    pub version: u64,
    /// Unix milliseconds of the last remote update
    pub saved_at: i64,
    pub detected_videos: usize,
}

impl RestoredContent {
    fn from_snapshot(snapshot: &RemoteSnapshot) -> Self {
        let decoded = codec::decode(&snapshot.valentine);
        Self {
            content: decoded.content,
            version: snapshot.version,
            saved_at: nanos_to_millis(snapshot.last_update_timestamp),
            detected_videos: decoded.detected_videos,
        }
    }
}

/// Orchestrates create/update/fetch calls and the write-token lifecycle.
pub struct SyncClient<S, T> {
    store: Arc<S>,
    tokens: T,
    authenticated: bool,
}

impl<S, T> SyncClient<S, T>
where
    S: VersionedStore,
    T: WriteTokenStore,
{
    pub fn new(store: Arc<S>, tokens: T) -> Self {
        Self {
            store,
            tokens,
            authenticated: false,
        }
    }

    /// Set the identity provider's verdict; saves are refused without it.
    #[must_use]
    pub const fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Shared handle to the underlying store, e.g. for a conflict watcher.
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    pub const fn token_store(&self) -> &T {
        &self.tokens
    }

    /// Create a new snapshot at version 1 and remember its write token.
    pub async fn create_remote_save(&self, content: &EditableContent) -> SyncResult<SaveReceipt> {
        self.ensure_authenticated()?;
        validate_video_sizes(&content.video_slots)?;

        let valentine = codec::encode(content);
        let created = self
            .store
            .create(&valentine)
            .await
            .map_err(|error| log_failure("create remote save", error.into()))?;

        if let Err(error) = self
            .tokens
            .store_token(&created.save_id, &created.write_token)
        {
            tracing::warn!(
                "Failed to store write token for {}: {}",
                created.save_id,
                error
            );
        }
        tracing::info!("Created remote save {}", created.save_id);

        Ok(SaveReceipt {
            save_id: Some(created.save_id),
            write_token: Some(created.write_token),
            version: 1,
            saved_at: unix_timestamp_millis(),
        })
    }

    /// Replace an existing snapshot if `expected_version` is still current.
    pub async fn update_remote_save(
        &self,
        save_id: &str,
        expected_version: u64,
        content: &EditableContent,
    ) -> SyncResult<SaveReceipt> {
        self.ensure_authenticated()?;
        let save_id = normalize_save_id(save_id)?;
        let write_token = self
            .load_write_token(save_id)
            .ok_or_else(|| SyncError::new(ErrorKind::Auth, TOKEN_NOT_FOUND_MESSAGE))?;
        validate_video_sizes(&content.video_slots)?;

        let valentine = codec::encode(content);
        let version = self
            .store
            .update(save_id, expected_version, &valentine, &write_token)
            .await
            .map_err(|error| log_failure("update remote save", error.into()))?;
        tracing::info!("Updated remote save {} to version {}", save_id, version);

        Ok(SaveReceipt {
            save_id: Some(save_id.to_string()),
            write_token: None,
            version,
            saved_at: unix_timestamp_millis(),
        })
    }

    pub async fn fetch_remote_save(&self, save_id: &str) -> SyncResult<RestoredContent> {
        let save_id = normalize_save_id(save_id)?;
        let snapshot = self
            .store
            .fetch(save_id)
            .await
            .map_err(|error| log_failure("fetch remote save", error.into()))?
            .ok_or_else(|| SyncError::new(ErrorKind::NotFound, SAVE_NOT_FOUND_MESSAGE))?;

        Ok(RestoredContent::from_snapshot(&snapshot))
    }

    /// Overwrite the shared global latest slot; no write token involved.
    pub async fn save_global_latest(&self, content: &EditableContent) -> SyncResult<SaveReceipt> {
        self.ensure_authenticated()?;
        validate_video_sizes(&content.video_slots)?;

        let valentine = codec::encode(content);
        let version = self
            .store
            .save_global_latest(&valentine)
            .await
            .map_err(|error| log_failure("save global latest", error.into()))?;
        tracing::info!("Saved global latest at version {}", version);

        Ok(SaveReceipt {
            save_id: None,
            write_token: None,
            version,
            saved_at: unix_timestamp_millis(),
        })
    }

    pub async fn fetch_global_latest(&self) -> SyncResult<RestoredContent> {
        let snapshot = self
            .store
            .fetch_global_latest()
            .await
            .map_err(|error| log_failure("fetch global latest", error.into()))?
            .ok_or_else(|| SyncError::new(ErrorKind::NotFound, GLOBAL_LATEST_EMPTY_MESSAGE))?;

        Ok(RestoredContent::from_snapshot(&snapshot))
    }

    pub async fn snapshot_version(&self, save_id: &str) -> SyncResult<u64> {
        let save_id = normalize_save_id(save_id)?;
        self.store
            .fetch_version(save_id)
            .await
            .map_err(|error| log_failure("get snapshot version", error.into()))
    }

    pub async fn global_latest_version(&self) -> SyncResult<u64> {
        self.store
            .fetch_global_latest_version()
            .await
            .map_err(|error| log_failure("get global latest version", error.into()))
    }

    fn ensure_authenticated(&self) -> SyncResult<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(SyncError::new(ErrorKind::Auth, LOGIN_REQUIRED_MESSAGE))
        }
    }

    fn load_write_token(&self, save_id: &str) -> Option<String> {
        match self.tokens.load_token(save_id) {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(error) => {
                tracing::warn!("Failed to read write token for {}: {}", save_id, error);
                None
            }
        }
    }
}

fn normalize_save_id(save_id: &str) -> SyncResult<&str> {
    let save_id = save_id.trim();
    if save_id.is_empty() {
        Err(SyncError::new(ErrorKind::NotFound, SAVE_NOT_FOUND_MESSAGE))
    } else {
        Ok(save_id)
    }
}

fn log_failure(operation: &str, error: SyncError) -> SyncError {
    tracing::warn!("Failed to {}: {}", operation, error);
    error
}
