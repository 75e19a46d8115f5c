//! In-process store enforcing the versioned snapshot contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{StoreError, StoreResult, VersionedStore};
use crate::models::{CreatedSave, RemoteSnapshot, Valentine};
use crate::util::unix_timestamp_nanos;

#[derive(Debug, Clone)]
struct StoredSnapshot {
    valentine: Valentine,
    version: u64,
    write_token_hash: String,
    last_update_timestamp: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    saves: HashMap<String, StoredSnapshot>,
    global_latest: Option<RemoteSnapshot>,
}

/// Thread-safe in-memory [`VersionedStore`].
///
/// Writes require the store to be marked authenticated, mirroring the
/// identity gate of the hosted backend.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    authenticated: AtomicBool,
    remote_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            authenticated: AtomicBool::new(true),
            remote_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::Release);
    }

    /// Number of store operations served so far.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::Acquire)
    }

    fn begin_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::AcqRel);
    }

    fn require_authenticated(&self) -> StoreResult<()> {
        if self.authenticated.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Api(
                "Authentication required: please sign in to save".to_string(),
            ))
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VersionedStore for MemoryStore {
    async fn create(&self, valentine: &Valentine) -> StoreResult<CreatedSave> {
        self.begin_call();
        self.require_authenticated()?;

        let save_id = Uuid::new_v4().simple().to_string();
        let write_token = mint_write_token();
        let snapshot = StoredSnapshot {
            valentine: valentine.clone(),
            version: 1,
            write_token_hash: hash_write_token(&write_token),
            last_update_timestamp: unix_timestamp_nanos(),
        };
        self.lock().saves.insert(save_id.clone(), snapshot);

        Ok(CreatedSave {
            save_id,
            write_token,
        })
    }

    async fn update(
        &self,
        save_id: &str,
        expected_version: u64,
        valentine: &Valentine,
        write_token: &str,
    ) -> StoreResult<u64> {
        self.begin_call();
        self.require_authenticated()?;

        let mut state = self.lock();
        let snapshot = state
            .saves
            .get_mut(save_id)
            .ok_or_else(|| missing_snapshot(save_id))?;

        if snapshot.write_token_hash != hash_write_token(write_token) {
            return Err(StoreError::Api("Invalid write token".to_string()));
        }
        if snapshot.version != expected_version {
            return Err(StoreError::Api(format!(
                "Version conflict: expected version {expected_version} but stored version is {}",
                snapshot.version
            )));
        }

        snapshot.valentine = valentine.clone();
        snapshot.version += 1;
        snapshot.last_update_timestamp = unix_timestamp_nanos();
        Ok(snapshot.version)
    }

    async fn fetch(&self, save_id: &str) -> StoreResult<Option<RemoteSnapshot>> {
        self.begin_call();
        Ok(self.lock().saves.get(save_id).map(|snapshot| RemoteSnapshot {
            valentine: snapshot.valentine.clone(),
            version: snapshot.version,
            last_update_timestamp: snapshot.last_update_timestamp,
        }))
    }

    async fn fetch_version(&self, save_id: &str) -> StoreResult<u64> {
        self.begin_call();
        self.lock()
            .saves
            .get(save_id)
            .map(|snapshot| snapshot.version)
            .ok_or_else(|| missing_snapshot(save_id))
    }

    async fn save_global_latest(&self, valentine: &Valentine) -> StoreResult<u64> {
        self.begin_call();
        self.require_authenticated()?;

        let mut state = self.lock();
        let version = state
            .global_latest
            .as_ref()
            .map_or(1, |snapshot| snapshot.version + 1);
        state.global_latest = Some(RemoteSnapshot {
            valentine: valentine.clone(),
            version,
            last_update_timestamp: unix_timestamp_nanos(),
        });
        Ok(version)
    }

    async fn fetch_global_latest(&self) -> StoreResult<Option<RemoteSnapshot>> {
        self.begin_call();
        Ok(self.lock().global_latest.clone())
    }

    async fn fetch_global_latest_version(&self) -> StoreResult<u64> {
        self.begin_call();
        self.lock()
            .global_latest
            .as_ref()
            .map(|snapshot| snapshot.version)
            .ok_or_else(|| StoreError::Api("No global latest snapshot has been saved".to_string()))
    }
}

fn missing_snapshot(save_id: &str) -> StoreError {
    StoreError::Api(format!("Snapshot {save_id} does not exist"))
}

fn mint_write_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn hash_write_token(write_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(write_token.as_bytes());
    hex::encode(hasher.finalize())
}
