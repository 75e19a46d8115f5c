//! Device-local copy of the card being edited.
//!
//! Used when no remote identity resolves, so work survives restarts without
//! a backend. Messages and headings live in `progress.json`; video bytes are
//! kept next to it as `videos/video_<index>.bin`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{EditableContent, LocalMedia, RemoteRef, VideoSlot, SLOT_COUNT};
use crate::util::unix_timestamp_millis;
use crate::Result;

const PROGRESS_FILE_NAME: &str = "progress.json";
const VIDEOS_DIR_NAME: &str = "videos";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ProgressRecord {
    landing_message: String,
    video_slots: Vec<ProgressSlot>,
    final_message: String,
    saved_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ProgressSlot {
    heading: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Content restored from the local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedProgress {
    pub content: EditableContent,
    /// Unix milliseconds of the local save
    pub saved_at: i64,
}

/// File-backed fallback store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct LocalProgressStore {
    root: PathBuf,
}

impl LocalProgressStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn progress_path(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE_NAME)
    }

    fn video_path(&self, index: usize) -> PathBuf {
        self.root
            .join(VIDEOS_DIR_NAME)
            .join(format!("video_{index}.bin"))
    }

    /// Persist `content`, returning the save time in Unix milliseconds.
    ///
    /// Slots without bytes have any previously stored video removed.
    pub fn save(&self, content: &EditableContent) -> Result<i64> {
        std::fs::create_dir_all(self.root.join(VIDEOS_DIR_NAME))?;

        let mut slots = Vec::with_capacity(SLOT_COUNT);
        for (index, slot) in content.video_slots.iter().enumerate() {
            let video_path = self.video_path(index);
            let (file_name, file_type) = match slot.upload_payload() {
                Some((mime_type, bytes)) => {
                    std::fs::write(&video_path, bytes)?;
                    let file_name = slot
                        .local_media
                        .as_ref()
                        .and_then(|media| media.file_name.clone())
                        .unwrap_or_else(|| format!("video_{}", index + 1));
                    (Some(file_name), Some(mime_type.to_string()))
                }
                None => {
                    remove_if_exists(&video_path)?;
                    (None, None)
                }
            };
            slots.push(ProgressSlot {
                heading: slot.heading.clone(),
                file_name,
                file_type,
                url: slot
                    .remote_ref
                    .as_ref()
                    .and_then(RemoteRef::as_url)
                    .map(ToString::to_string),
            });
        }

        let record = ProgressRecord {
            landing_message: content.landing_message.clone(),
            video_slots: slots,
            final_message: content.final_message.clone(),
            saved_at: unix_timestamp_millis(),
        };
        std::fs::write(
            self.progress_path(),
            serde_json::to_string_pretty(&record)?,
        )?;
        tracing::debug!("Saved local progress to {}", self.root.display());

        Ok(record.saved_at)
    }

    /// Load the local copy; `None` when absent or unreadable.
    ///
    /// Restored videos come back as local media so the next remote save
    /// uploads them again.
    pub fn load(&self) -> Option<SavedProgress> {
        let path = self.progress_path();
        if !path.exists() {
            return None;
        }

        let record = match read_record(&path) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!("Ignoring local progress at {}: {}", path.display(), error);
                return None;
            }
        };

        let mut content = EditableContent::new(record.landing_message, record.final_message);
        for (index, (slot, saved)) in content
            .video_slots
            .iter_mut()
            .zip(record.video_slots)
            .enumerate()
        {
            *slot = self.restore_slot(index, saved);
        }

        Some(SavedProgress {
            content,
            saved_at: record.saved_at,
        })
    }

    /// Forget the local copy, including stored videos.
    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.progress_path())?;
        let videos = self.root.join(VIDEOS_DIR_NAME);
        if videos.exists() {
            std::fs::remove_dir_all(videos)?;
        }
        Ok(())
    }

    fn restore_slot(&self, index: usize, saved: ProgressSlot) -> VideoSlot {
        let mut slot = VideoSlot::new(saved.heading);
        if let Some(url) = saved.url {
            slot.remote_ref = Some(RemoteRef::Url(url));
        }

        let (Some(file_name), Some(file_type)) = (saved.file_name, saved.file_type) else {
            return slot;
        };
        match std::fs::read(self.video_path(index)) {
            Ok(bytes) => {
                slot.local_media = Some(LocalMedia::new(file_type, bytes).with_file_name(file_name));
            }
            Err(error) => {
                tracing::warn!("Missing local video {} ({}): {}", index + 1, file_name, error);
            }
        }
        slot
    }
}

fn read_record(path: &Path) -> Result<ProgressRecord> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}
