//! User-facing failure taxonomy and backend message normalization.

use thiserror::Error;

use crate::store::StoreError;

/// Generic message used when a failure carries no usable text.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Message used when the backend cannot be reached at all.
pub const CONNECTION_UNAVAILABLE_MESSAGE: &str =
    "Backend connection not available. Please refresh and try again.";

pub const TOKEN_NOT_FOUND_MESSAGE: &str = "Write token not found. Cannot update this save.";
pub const SAVE_NOT_FOUND_MESSAGE: &str =
    "Valentine not found. Please check your save link and try again.";
pub const GLOBAL_LATEST_EMPTY_MESSAGE: &str = "No saved Valentine found yet.";
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to save your Valentine.";

/// Failure categories surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Size limits exceeded; reported before any network attempt
    Validation,
    /// Backend unreachable or method missing; retry after refresh
    Transport,
    /// Not authenticated or write token invalid/missing
    Auth,
    /// Version mismatch; reload before retrying
    Conflict,
    /// Unknown save id or empty global slot
    NotFound,
    /// Unrecognized backend message passed through
    Other,
}

/// Normalized failure returned by every sync operation.
///
/// Display yields the user-facing message, which is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyncError {
    kind: ErrorKind,
    message: String,
}

impl SyncError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        };
        Self { kind, message }
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

struct NormalizationRule {
    patterns: &'static [&'static str],
    kind: ErrorKind,
    message: &'static str,
}

impl NormalizationRule {
    fn matches(&self, raw: &str) -> bool {
        self.patterns.iter().any(|pattern| raw.contains(pattern))
    }
}

/// Evaluated in order; the first matching rule wins.
const NORMALIZATION_RULES: &[NormalizationRule] = &[
    NormalizationRule {
        patterns: &["not a function", "method not available"],
        kind: ErrorKind::Transport,
        message: "Backend method not available. Please refresh and try again.",
    },
    NormalizationRule {
        patterns: &["Authentication required", "sign in"],
        kind: ErrorKind::Auth,
        message: LOGIN_REQUIRED_MESSAGE,
    },
    NormalizationRule {
        patterns: &["Invalid write token", "not authorized"],
        kind: ErrorKind::Auth,
        message: "You are not authorized to update this Valentine. Try re-authenticating or saving a new one.",
    },
    NormalizationRule {
        patterns: &["Version conflict", "Merge required"],
        kind: ErrorKind::Conflict,
        message: "This content was updated elsewhere. Please reload and try again.",
    },
    NormalizationRule {
        patterns: &["does not exist"],
        kind: ErrorKind::NotFound,
        message: SAVE_NOT_FOUND_MESSAGE,
    },
    NormalizationRule {
        patterns: &["No global latest"],
        kind: ErrorKind::NotFound,
        message: GLOBAL_LATEST_EMPTY_MESSAGE,
    },
];

/// Map a raw backend message onto the user-facing taxonomy.
///
/// Unmatched messages pass through verbatim; blank ones become
/// [`FALLBACK_MESSAGE`].
pub fn normalize_message(raw: &str) -> SyncError {
    let raw = raw.trim();
    if raw.is_empty() {
        return SyncError::new(ErrorKind::Other, FALLBACK_MESSAGE);
    }

    NORMALIZATION_RULES
        .iter()
        .find(|rule| rule.matches(raw))
        .map_or_else(
            || SyncError::new(ErrorKind::Other, raw),
            |rule| SyncError::new(rule.kind, rule.message),
        )
}

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unreachable(_) | StoreError::InvalidConfiguration(_) => {
                Self::new(ErrorKind::Transport, CONNECTION_UNAVAILABLE_MESSAGE)
            }
            other => normalize_message(&other.to_string()),
        }
    }
}
