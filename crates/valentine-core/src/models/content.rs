//! Editable card content model

use std::fmt;

/// Number of video slots on every card.
pub const SLOT_COUNT: usize = 3;

/// Landing message used when none was saved.
pub const DEFAULT_LANDING_MESSAGE: &str = "Happy Valentine's Day!";

/// Closing message used when none was saved.
pub const DEFAULT_FINAL_MESSAGE: &str = "You are the love of my life. Happy Valentine's Day! ❤️";

/// Headings given to empty slots, in slot order.
pub const DEFAULT_HEADINGS: [&str; SLOT_COUNT] =
    ["Our First Memory", "A Special Moment", "Forever Together"];

/// Length of a byte buffer as `u64`.
pub fn byte_len(bytes: &[u8]) -> u64 {
    u64::try_from(bytes.len()).unwrap_or(u64::MAX)
}

/// A video picked on this device that has not been uploaded yet.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalMedia {
    /// Original file name, when known
    pub file_name: Option<String>,
    /// MIME type reported for the file (may be empty)
    pub mime_type: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

impl LocalMedia {
    #[must_use]
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn size(&self) -> u64 {
        byte_len(&self.bytes)
    }
}

impl fmt::Debug for LocalMedia {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LocalMedia")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Video bytes materialized on this device from a fetched snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaObject {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaObject {
    pub fn size(&self) -> u64 {
        byte_len(&self.bytes)
    }
}

impl fmt::Debug for MediaObject {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MediaObject")
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl From<LocalMedia> for MediaObject {
    fn from(media: LocalMedia) -> Self {
        Self {
            mime_type: media.mime_type,
            bytes: media.bytes,
        }
    }
}

/// Where an already-saved video can be played from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRef {
    /// Direct external URL, preserved verbatim across saves
    Url(String),
    /// Bytes sliced out of a snapshot's combined blob
    Object(MediaObject),
}

impl RemoteRef {
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Object(_) => None,
        }
    }

    pub const fn as_object(&self) -> Option<&MediaObject> {
        match self {
            Self::Url(_) => None,
            Self::Object(object) => Some(object),
        }
    }
}

/// One of the three video slots on a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSlot {
    pub heading: String,
    pub local_media: Option<LocalMedia>,
    pub remote_ref: Option<RemoteRef>,
}

impl VideoSlot {
    #[must_use]
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            local_media: None,
            remote_ref: None,
        }
    }

    #[must_use]
    pub fn with_local_media(mut self, media: LocalMedia) -> Self {
        self.local_media = Some(media);
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.remote_ref = Some(RemoteRef::Url(url.into()));
        self
    }

    #[must_use]
    pub fn with_object(mut self, object: MediaObject) -> Self {
        self.remote_ref = Some(RemoteRef::Object(object));
        self
    }

    pub const fn has_video(&self) -> bool {
        self.local_media.is_some() || self.remote_ref.is_some()
    }

    /// Bytes this slot contributes to the combined upload blob.
    ///
    /// Local media wins over a stale remote reference.
    pub fn upload_payload(&self) -> Option<(&str, &[u8])> {
        if let Some(media) = &self.local_media {
            return Some((media.mime_type.as_str(), media.bytes.as_slice()));
        }
        match &self.remote_ref {
            Some(RemoteRef::Object(object)) => {
                Some((object.mime_type.as_str(), object.bytes.as_slice()))
            }
            _ => None,
        }
    }

    /// Mark local media as uploaded by turning it into a materialized object.
    pub fn settle(&mut self) {
        if let Some(media) = self.local_media.take() {
            self.remote_ref = Some(RemoteRef::Object(media.into()));
        }
    }
}

/// The working document edited by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableContent {
    pub landing_message: String,
    pub video_slots: [VideoSlot; SLOT_COUNT],
    pub final_message: String,
}

impl EditableContent {
    #[must_use]
    pub fn new(landing_message: impl Into<String>, final_message: impl Into<String>) -> Self {
        Self {
            landing_message: landing_message.into(),
            video_slots: default_slots(),
            final_message: final_message.into(),
        }
    }

    pub fn has_local_media(&self) -> bool {
        self.video_slots
            .iter()
            .any(|slot| slot.local_media.is_some())
    }

    /// Settle every slot after a successful upload.
    pub fn settle_uploads(&mut self) {
        for slot in &mut self.video_slots {
            slot.settle();
        }
    }
}

impl Default for EditableContent {
    fn default() -> Self {
        Self::new(DEFAULT_LANDING_MESSAGE, DEFAULT_FINAL_MESSAGE)
    }
}

pub(crate) fn default_slots() -> [VideoSlot; SLOT_COUNT] {
    DEFAULT_HEADINGS.map(VideoSlot::new)
}
