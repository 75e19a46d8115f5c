//! Write-token persistence for the CLI.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use keyring::Entry;
use valentine_core::tokens::{token_key, FileTokenStore, WriteTokenStore};
use valentine_core::{Error, Result};

const KEYRING_SERVICE_NAME: &str = "valentine";
const KEYRING_CHECK_PREFIX: &str = "keyring-check";
const KEYRING_CHECK_VALUE: &str = "round-trip";

static KEYRING_CHECKS: AtomicU64 = AtomicU64::new(0);

/// Token file used when no keyring can keep secrets across processes.
pub const DEFAULT_TOKEN_FILE_NAME: &str = "write_tokens.json";

/// Write tokens kept in the OS keyring, one entry per save.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service_name: String,
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self {
            service_name: KEYRING_SERVICE_NAME.to_string(),
        }
    }
}

impl KeyringTokenStore {
    fn entry(&self, save_id: &str) -> Result<Entry> {
        Entry::new(&self.service_name, &token_key(save_id))
            .map_err(|error| Error::Storage(error.to_string()))
    }

    /// True when a secret written here is readable through a separate entry
    /// handle. Platforms without a native backend only get keyring's
    /// in-memory mock, which fails this check.
    pub fn is_available(&self) -> bool {
        let check_id = format!(
            "{KEYRING_CHECK_PREFIX}-{}-{}",
            std::process::id(),
            KEYRING_CHECKS.fetch_add(1, Ordering::Relaxed)
        );
        let round_trip = self
            .store_token(&check_id, KEYRING_CHECK_VALUE)
            .and_then(|()| self.load_token(&check_id));
        if let Err(error) = self.delete_token(&check_id) {
            tracing::debug!("Failed to remove keyring check entry: {}", error);
        }

        match round_trip {
            Ok(Some(value)) => value == KEYRING_CHECK_VALUE,
            Ok(None) => false,
            Err(error) => {
                tracing::debug!("OS keyring rejected a test entry: {}", error);
                false
            }
        }
    }

    pub fn delete_token(&self, save_id: &str) -> Result<()> {
        match self.entry(save_id)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }
}

impl WriteTokenStore for KeyringTokenStore {
    fn load_token(&self, save_id: &str) -> Result<Option<String>> {
        match self.entry(save_id)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    fn store_token(&self, save_id: &str, write_token: &str) -> Result<()> {
        self.entry(save_id)?
            .set_password(write_token)
            .map_err(|error| Error::Storage(error.to_string()))
    }
}

/// Token backend chosen for one CLI invocation.
#[derive(Debug, Clone)]
pub enum CliTokenStore {
    /// The OS keyring. Tokens written to the data directory file while the
    /// keyring was unavailable are still found on load.
    Keyring {
        keyring: KeyringTokenStore,
        fallback: FileTokenStore,
    },
    File(FileTokenStore),
}

impl CliTokenStore {
    /// `--token-file` wins. Otherwise the OS keyring is used when it
    /// round-trips a secret, and `<data_dir>/write_tokens.json` when not.
    pub fn resolve(token_file: Option<PathBuf>, data_dir: &Path) -> Self {
        if let Some(path) = token_file {
            return Self::File(FileTokenStore::new(path));
        }

        let fallback = FileTokenStore::new(data_dir.join(DEFAULT_TOKEN_FILE_NAME));
        let keyring = KeyringTokenStore::default();
        if keyring.is_available() {
            Self::Keyring { keyring, fallback }
        } else {
            tracing::warn!(
                "OS keyring unavailable, keeping write tokens in {}",
                fallback.path().display()
            );
            Self::File(fallback)
        }
    }

    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Keyring { .. } => "OS keyring",
            Self::File(_) => "token file",
        }
    }
}

impl WriteTokenStore for CliTokenStore {
    fn load_token(&self, save_id: &str) -> Result<Option<String>> {
        match self {
            Self::Keyring { keyring, fallback } => match keyring.load_token(save_id)? {
                Some(token) => Ok(Some(token)),
                None => fallback.load_token(save_id),
            },
            Self::File(store) => store.load_token(save_id),
        }
    }

    fn store_token(&self, save_id: &str, write_token: &str) -> Result<()> {
        match self {
            Self::Keyring { keyring, .. } => keyring.store_token(save_id, write_token),
            Self::File(store) => store.store_token(save_id, write_token),
        }
    }
}
