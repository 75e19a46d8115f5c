//! Data models for the Valentine card builder

mod content;
mod embedded;
mod snapshot;

pub use content::{
    byte_len, EditableContent, LocalMedia, MediaObject, RemoteRef, VideoSlot,
    DEFAULT_FINAL_MESSAGE, DEFAULT_HEADINGS, DEFAULT_LANDING_MESSAGE, SLOT_COUNT,
};
pub use embedded::{EmbeddedRef, EmbeddedRefError, EMBEDDED_PREFIX};
pub use snapshot::{CreatedSave, RemoteSnapshot, Valentine, VALENTINE_COLOR};
