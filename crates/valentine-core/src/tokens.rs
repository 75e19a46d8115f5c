//! Client-side persistence of per-save write tokens.
//!
//! A write token is minted once by the store when a save is created and is
//! the only capability that allows updating that save. Tokens are keyed by
//! save id and never rotated.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::{Error, Result};

/// Key prefix used for every stored token entry.
pub const WRITE_TOKEN_PREFIX: &str = "valentine_write_token_";

/// Storage key for the token of `save_id`.
pub fn token_key(save_id: &str) -> String {
    format!("{WRITE_TOKEN_PREFIX}{save_id}")
}

/// Local secret storage for write tokens.
pub trait WriteTokenStore: Send + Sync {
    fn load_token(&self, save_id: &str) -> Result<Option<String>>;
    fn store_token(&self, save_id: &str, write_token: &str) -> Result<()>;
}

impl<T: WriteTokenStore + ?Sized> WriteTokenStore for std::sync::Arc<T> {
    fn load_token(&self, save_id: &str) -> Result<Option<String>> {
        (**self).load_token(save_id)
    }

    fn store_token(&self, save_id: &str, write_token: &str) -> Result<()> {
        (**self).store_token(save_id, write_token)
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WriteTokenStore for MemoryTokenStore {
    fn load_token(&self, save_id: &str) -> Result<Option<String>> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.get(&token_key(save_id)).cloned())
    }

    fn store_token(&self, save_id: &str, write_token: &str) -> Result<()> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token_key(save_id), write_token.to_string());
        Ok(())
    }
}

/// Token store persisted as a JSON object in a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_all(&self, tokens: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = open_owner_only(&self.path)?;
        file.write_all(serde_json::to_string_pretty(tokens)?.as_bytes())?;
        Ok(())
    }
}

impl WriteTokenStore for FileTokenStore {
    fn load_token(&self, save_id: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(&token_key(save_id)))
    }

    fn store_token(&self, save_id: &str, write_token: &str) -> Result<()> {
        if write_token.trim().is_empty() {
            return Err(Error::InvalidInput(
                "write token must not be empty".to_string(),
            ));
        }
        let mut tokens = self.read_all()?;
        tokens.insert(token_key(save_id), write_token.to_string());
        self.write_all(&tokens)
    }
}

/// Opens the token file for rewriting with mode 0600. The mode is applied at
/// creation and again on an existing file before any secret is written.
#[cfg(unix)]
fn open_owner_only(path: &Path) -> Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}
