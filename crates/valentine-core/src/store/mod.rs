//! Contract of the remote versioned snapshot store.
//!
//! The store itself is an external service. [`HttpStore`] talks to a deployed
//! backend; [`MemoryStore`] enforces the same contract in-process.

mod http;
mod memory;

use std::future::Future;

use thiserror::Error;

use crate::models::{CreatedSave, RemoteSnapshot, Valentine};

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Raw failure reported by a store, before user-facing normalization.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid store configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Backend method not available: {0}")]
    MethodUnavailable(&'static str),
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    /// Rejection message produced by the backend, kept verbatim
    #[error("{0}")]
    Api(String),
    #[error("Invalid store response: {0}")]
    InvalidPayload(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Create/read/update operations over versioned snapshots.
///
/// Updates are gated twice: `expected_version` must equal the stored version
/// and `write_token` must match the token minted by `create`. The global
/// latest slot has no token and is overwritten unconditionally.
pub trait VersionedStore: Send + Sync + 'static {
    /// Store a new snapshot at version 1 and mint its write token.
    fn create(&self, valentine: &Valentine) -> impl Future<Output = StoreResult<CreatedSave>> + Send;

    /// Replace a snapshot, returning its new version.
    fn update(
        &self,
        save_id: &str,
        expected_version: u64,
        valentine: &Valentine,
        write_token: &str,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    fn fetch(&self, save_id: &str)
        -> impl Future<Output = StoreResult<Option<RemoteSnapshot>>> + Send;

    /// Version-only query without content transfer.
    fn fetch_version(&self, save_id: &str) -> impl Future<Output = StoreResult<u64>> + Send;

    fn save_global_latest(&self, valentine: &Valentine)
        -> impl Future<Output = StoreResult<u64>> + Send;

    fn fetch_global_latest(&self) -> impl Future<Output = StoreResult<Option<RemoteSnapshot>>> + Send;

    fn fetch_global_latest_version(&self) -> impl Future<Output = StoreResult<u64>> + Send;
}
