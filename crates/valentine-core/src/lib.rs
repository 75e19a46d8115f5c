//! valentine-core - Core library for the Valentine card builder
//!
//! This crate contains the editable card model, the wire codec, the
//! versioned store contract, the sync client and the conflict watcher used by
//! every Valentine front end.

pub mod codec;
pub mod config;
pub mod error;
pub mod link;
pub mod models;
pub mod progress;
pub mod store;
pub mod sync;
pub mod tokens;
pub mod util;
pub mod watcher;

pub use error::{Error, Result};
pub use models::{EditableContent, EmbeddedRef, LocalMedia, MediaObject, RemoteRef, VideoSlot};
pub use sync::{ErrorKind, SyncClient, SyncError};
