//! Pre-flight size checks run before any upload starts.

use super::errors::{ErrorKind, SyncError};
use crate::models::{byte_len, VideoSlot};

/// Ceiling for a single video (50 MiB).
pub const MAX_VIDEO_SIZE: u64 = 50 * 1024 * 1024;

/// Ceiling for all videos of one save combined (100 MiB).
pub const MAX_TOTAL_SIZE: u64 = 100 * 1024 * 1024;

/// Check every payload that will be embedded in the next upload.
pub fn validate_video_sizes(video_slots: &[VideoSlot]) -> Result<(), SyncError> {
    let mut total_size: u64 = 0;

    for (index, slot) in video_slots.iter().enumerate() {
        let Some((_, bytes)) = slot.upload_payload() else {
            continue;
        };
        let size = byte_len(bytes);
        if size > MAX_VIDEO_SIZE {
            return Err(SyncError::new(
                ErrorKind::Validation,
                format!(
                    "Video {} exceeds the maximum size of 50MB. Please use a smaller video.",
                    index + 1
                ),
            ));
        }
        total_size = total_size.saturating_add(size);
    }

    if total_size > MAX_TOTAL_SIZE {
        return Err(SyncError::new(
            ErrorKind::Validation,
            "Total video size exceeds 100MB. Please reduce the number or size of videos.",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalMedia;

    const MIB: usize = 1024 * 1024;

    fn slot_with_video(size: usize) -> VideoSlot {
        VideoSlot::new("clip").with_local_media(LocalMedia::new("video/mp4", vec![0; size]))
    }

    #[test]
    fn single_oversized_video_names_its_index() {
        let slots = [
            VideoSlot::new("empty"),
            slot_with_video(51 * MIB),
            VideoSlot::new("empty"),
        ];

        let error = validate_video_sizes(&slots).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(error.to_string().starts_with("Video 2 exceeds"));
    }

    #[test]
    fn aggregate_limit_applies_when_each_video_fits() {
        let slots = [
            slot_with_video(34 * MIB),
            slot_with_video(34 * MIB),
            slot_with_video(34 * MIB),
        ];

        let error = validate_video_sizes(&slots).unwrap_err();

        assert!(error.to_string().starts_with("Total video size exceeds 100MB"));
    }

    #[test]
    fn small_videos_pass() {
        let slots = [
            slot_with_video(10 * MIB),
            slot_with_video(10 * MIB),
            slot_with_video(10 * MIB),
        ];
        assert!(validate_video_sizes(&slots).is_ok());
    }

    #[test]
    fn exactly_at_limit_passes() {
        let slots = [slot_with_video(50 * MIB), slot_with_video(50 * MIB)];
        assert!(validate_video_sizes(&slots).is_ok());
    }

    #[test]
    fn url_only_slots_are_not_counted() {
        let slots = [VideoSlot::new("link").with_url("https://cdn.example.com/huge.mp4")];
        assert!(validate_video_sizes(&slots).is_ok());
    }
}
