//! Mapping between [`EditableContent`] and the wire [`Valentine`] record.
//!
//! The store only understands a text field and one optional binary blob, so
//! videos are packed into a single combined blob and described by a JSON
//! metadata list appended to the text after [`VIDEO_DATA_MARKER`]:
//!
//! ```text
//! <landing message>\n\n<final message>___VIDEO_DATA___[{"heading":..,"url":..}, ..]
//! ```
//!
//! Each `url` is either a direct URL or an `embedded:<offset>:<length>:<mime>`
//! range into the blob. Decoding never fails: unreadable metadata degrades to
//! "no videos detected" and unreadable ranges degrade to empty slots.

use serde::{Deserialize, Serialize};

use crate::models::{
    byte_len, EditableContent, EmbeddedRef, MediaObject, RemoteRef, Valentine, VideoSlot,
    DEFAULT_FINAL_MESSAGE, DEFAULT_HEADINGS, DEFAULT_LANDING_MESSAGE,
};

/// Separates the messages from the JSON video metadata.
pub const VIDEO_DATA_MARKER: &str = "___VIDEO_DATA___";

const MESSAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct VideoMetadata {
    #[serde(default)]
    heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

/// Result of decoding a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContent {
    pub content: EditableContent,
    /// Metadata entries found after the marker (0 for legacy records)
    pub detected_videos: usize,
}

/// Encode editable content into the wire record.
pub fn encode(content: &EditableContent) -> Valentine {
    let mut blob = Vec::new();
    let mut embedded_any = false;

    let metadata: Vec<VideoMetadata> = content
        .video_slots
        .iter()
        .map(|slot| {
            let url = if let Some((mime_type, bytes)) = slot.upload_payload() {
                let reference = EmbeddedRef::new(byte_len(&blob), byte_len(bytes), mime_type);
                blob.extend_from_slice(bytes);
                embedded_any = true;
                Some(reference.to_string())
            } else {
                slot.remote_ref
                    .as_ref()
                    .and_then(RemoteRef::as_url)
                    .map(ToString::to_string)
            };

            VideoMetadata {
                heading: sanitize_text(&slot.heading),
                url,
            }
        })
        .collect();

    let text = format!(
        "{}{MESSAGE_SEPARATOR}{}{}",
        sanitize_landing_message(&content.landing_message),
        sanitize_text(&content.final_message),
        encode_metadata(&metadata)
    );

    Valentine::new(text, embedded_any.then_some(blob))
}

/// Decode a wire record into editable content, padded to three slots.
pub fn decode(valentine: &Valentine) -> DecodedContent {
    let (message_text, metadata_text) = match valentine.text.find(VIDEO_DATA_MARKER) {
        Some(index) => (
            &valentine.text[..index],
            Some(&valentine.text[index + VIDEO_DATA_MARKER.len()..]),
        ),
        None => (valentine.text.as_str(), None),
    };

    let (landing_message, final_message) = split_messages(message_text);
    let metadata = metadata_text.map(decode_metadata).unwrap_or_default();
    let blob = valentine.binary_blob.as_deref();

    let mut content = EditableContent::new(landing_message, final_message);
    for (index, (slot, entry)) in content
        .video_slots
        .iter_mut()
        .zip(metadata.iter())
        .enumerate()
    {
        *slot = decode_slot(index, entry, blob);
    }

    DecodedContent {
        content,
        detected_videos: metadata.len(),
    }
}

fn encode_metadata(metadata: &[VideoMetadata]) -> String {
    if metadata.is_empty() {
        return String::new();
    }

    match serde_json::to_string(metadata) {
        Ok(json) => format!("{VIDEO_DATA_MARKER}{json}"),
        Err(error) => {
            tracing::warn!("Failed to encode video metadata: {}", error);
            String::new()
        }
    }
}

fn decode_metadata(json: &str) -> Vec<VideoMetadata> {
    serde_json::from_str(json).unwrap_or_else(|error| {
        tracing::warn!("Failed to decode video metadata: {}", error);
        Vec::new()
    })
}

fn split_messages(text: &str) -> (String, String) {
    let (landing, rest) = text.split_once(MESSAGE_SEPARATOR).unwrap_or((text, ""));
    (
        non_empty_or(landing, DEFAULT_LANDING_MESSAGE),
        non_empty_or(rest, DEFAULT_FINAL_MESSAGE),
    )
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn decode_slot(index: usize, entry: &VideoMetadata, blob: Option<&[u8]>) -> VideoSlot {
    let heading = if entry.heading.is_empty() {
        DEFAULT_HEADINGS[index].to_string()
    } else {
        entry.heading.clone()
    };
    let mut slot = VideoSlot::new(heading);

    let reference = entry
        .url
        .as_deref()
        .map(str::trim)
        .filter(|reference| !reference.is_empty());
    slot.remote_ref = match reference {
        None => None,
        Some(reference) if EmbeddedRef::is_embedded(reference) => {
            materialize(index, reference, blob).map(RemoteRef::Object)
        }
        Some(url) => Some(RemoteRef::Url(url.to_string())),
    };
    slot
}

fn materialize(index: usize, reference: &str, blob: Option<&[u8]>) -> Option<MediaObject> {
    let embedded = match reference.parse::<EmbeddedRef>() {
        Ok(embedded) => embedded,
        Err(error) => {
            tracing::warn!("Ignoring video {}: {}", index + 1, error);
            return None;
        }
    };
    let Some(blob) = blob else {
        tracing::warn!(
            "Ignoring video {}: record has no binary blob for {}",
            index + 1,
            embedded
        );
        return None;
    };

    match embedded.resolve(blob) {
        Ok(bytes) => Some(MediaObject {
            mime_type: embedded.mime_type,
            bytes: bytes.to_vec(),
        }),
        Err(error) => {
            tracing::warn!("Ignoring video {}: {}", index + 1, error);
            None
        }
    }
}

fn sanitize_text(value: &str) -> String {
    value.replace(VIDEO_DATA_MARKER, "")
}

// The landing message ends at the first blank line, so it may neither contain
// a blank line nor end with a line break.
fn sanitize_landing_message(value: &str) -> String {
    let mut text = sanitize_text(value);
    while text.contains(MESSAGE_SEPARATOR) {
        text = text.replace(MESSAGE_SEPARATOR, "\n");
    }
    text.trim_end_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::LocalMedia;

    fn sample_content() -> EditableContent {
        let mut content = EditableContent::new("Be mine", "Forever yours");
        content.video_slots[0] = VideoSlot::new("Beach day")
            .with_local_media(LocalMedia::new("video/mp4", vec![1, 2, 3]));
        content.video_slots[1] =
            VideoSlot::new("Concert").with_url("https://cdn.example.com/concert.mp4");
        content.video_slots[2] = VideoSlot::new("Someday");
        content
    }

    #[test]
    fn round_trip_restores_messages_headings_and_media() {
        let content = sample_content();

        let decoded = decode(&encode(&content));

        let mut expected = content;
        expected.settle_uploads();
        assert_eq!(decoded.content, expected);
        assert_eq!(decoded.detected_videos, 3);
    }

    #[test]
    fn round_trip_with_three_embedded_videos_is_byte_identical() {
        let mut content = EditableContent::new("Hi", "Bye");
        for (index, slot) in content.video_slots.iter_mut().enumerate() {
            let bytes = (0..=u8::try_from(index * 40).unwrap()).collect::<Vec<u8>>();
            slot.local_media = Some(LocalMedia::new("video/webm", bytes));
        }

        let decoded = decode(&encode(&content));

        for (original, restored) in content.video_slots.iter().zip(&decoded.content.video_slots) {
            let object = restored
                .remote_ref
                .as_ref()
                .and_then(RemoteRef::as_object)
                .unwrap();
            assert_eq!(object.bytes, original.local_media.as_ref().unwrap().bytes);
            assert_eq!(object.mime_type, "video/webm");
        }
    }

    #[test]
    fn encode_packs_local_media_at_running_offsets() {
        let mut content = EditableContent::new("Hi", "Bye");
        content.video_slots[0].local_media = Some(LocalMedia::new("video/mp4", vec![9; 3]));
        content.video_slots[2].local_media = Some(LocalMedia::new("video/webm", vec![8; 2]));

        let valentine = encode(&content);

        assert_eq!(valentine.color, "#ff1493");
        assert_eq!(valentine.binary_blob, Some(vec![9, 9, 9, 8, 8]));
        assert!(valentine.text.starts_with("Hi\n\nBye___VIDEO_DATA___"));
        assert!(valentine.text.contains("embedded:0:3:video/mp4"));
        assert!(valentine.text.contains("embedded:3:2:video/webm"));
    }

    #[test]
    fn encode_omits_blob_without_local_media() {
        let mut content = EditableContent::new("Hi", "Bye");
        content.video_slots[1] = VideoSlot::new("Link").with_url("https://cdn.example.com/a.mp4");

        let valentine = encode(&content);

        assert_eq!(valentine.binary_blob, None);
        assert!(valentine.text.contains("https://cdn.example.com/a.mp4"));
    }

    #[test]
    fn decoded_objects_are_re_embedded_on_next_save() {
        let first = decode(&encode(&sample_content())).content;

        let second = decode(&encode(&first));

        assert_eq!(second.content, first);
    }

    #[test]
    fn legacy_text_without_marker_decodes_to_default_slots() {
        let decoded = decode(&Valentine::new("Hello love\n\nSee you soon", None));

        assert_eq!(decoded.detected_videos, 0);
        assert_eq!(decoded.content.landing_message, "Hello love");
        assert_eq!(decoded.content.final_message, "See you soon");
        assert_eq!(decoded.content.video_slots, EditableContent::default().video_slots);
    }

    #[test]
    fn missing_message_parts_fall_back_to_defaults() {
        let decoded = decode(&Valentine::new("", None));
        assert_eq!(decoded.content.landing_message, DEFAULT_LANDING_MESSAGE);
        assert_eq!(decoded.content.final_message, DEFAULT_FINAL_MESSAGE);

        let decoded = decode(&Valentine::new("Only a landing message", None));
        assert_eq!(decoded.content.landing_message, "Only a landing message");
        assert_eq!(decoded.content.final_message, DEFAULT_FINAL_MESSAGE);
    }

    #[test]
    fn final_message_keeps_its_own_blank_lines() {
        let decoded = decode(&Valentine::new("Hi\n\nLine one\n\nLine two", None));
        assert_eq!(decoded.content.final_message, "Line one\n\nLine two");
    }

    #[test]
    fn malformed_metadata_degrades_to_zero_videos() {
        let decoded = decode(&Valentine::new(
            "Hi\n\nBye___VIDEO_DATA___[{\"heading\": oops",
            Some(vec![1, 2, 3]),
        ));

        assert_eq!(decoded.detected_videos, 0);
        assert_eq!(decoded.content.landing_message, "Hi");
        assert_eq!(decoded.content.final_message, "Bye");
        assert_eq!(decoded.content.video_slots, EditableContent::default().video_slots);
    }

    #[test]
    fn out_of_range_embedded_reference_degrades_to_empty_slot() {
        let decoded = decode(&Valentine::new(
            r#"Hi

Bye___VIDEO_DATA___[{"heading":"Too far","url":"embedded:2:10:video/mp4"}]"#,
            Some(vec![1, 2, 3]),
        ));

        assert_eq!(decoded.detected_videos, 1);
        assert_eq!(decoded.content.video_slots[0], VideoSlot::new("Too far"));
    }

    #[test]
    fn embedded_reference_without_blob_degrades_to_empty_slot() {
        let decoded = decode(&Valentine::new(
            r#"Hi

Bye___VIDEO_DATA___[{"heading":"Lost","url":"embedded:0:3:video/mp4"}]"#,
            None,
        ));

        assert_eq!(decoded.content.video_slots[0], VideoSlot::new("Lost"));
    }

    #[test]
    fn short_metadata_is_padded_with_default_headings() {
        let decoded = decode(&Valentine::new(
            r#"Hi

Bye___VIDEO_DATA___[{"heading":"","url":"https://cdn.example.com/a.mp4"}]"#,
            None,
        ));

        let slots = &decoded.content.video_slots;
        assert_eq!(
            slots[0],
            VideoSlot::new("Our First Memory").with_url("https://cdn.example.com/a.mp4")
        );
        assert_eq!(slots[1], VideoSlot::new("A Special Moment"));
        assert_eq!(slots[2], VideoSlot::new("Forever Together"));
    }

    #[test]
    fn marker_in_user_text_cannot_corrupt_metadata() {
        let mut content = sample_content();
        content.landing_message = format!("Sneaky {VIDEO_DATA_MARKER} text");

        let decoded = decode(&encode(&content));

        assert_eq!(decoded.content.landing_message, "Sneaky  text");
        assert_eq!(decoded.detected_videos, 3);
    }

    #[test]
    fn blank_lines_in_landing_message_are_collapsed() {
        let content = EditableContent::new("Roses\n\n\n\nViolets", "Bye");

        let decoded = decode(&encode(&content));

        assert_eq!(decoded.content.landing_message, "Roses\nViolets");
        assert_eq!(decoded.content.final_message, "Bye");
    }

    #[test]
    fn trailing_line_break_stays_out_of_final_message() {
        let content = EditableContent::new("Roses are red\n", "Violets are blue");

        let decoded = decode(&encode(&content));

        assert_eq!(decoded.content.landing_message, "Roses are red");
        assert_eq!(decoded.content.final_message, "Violets are blue");
    }

    #[test]
    fn final_message_keeps_leading_line_break() {
        let content = EditableContent::new("Roses are red\n\n", "\nViolets are blue");

        let valentine = encode(&content);
        let decoded = decode(&valentine);

        assert!(valentine.text.starts_with("Roses are red\n\n\nViolets are blue"));
        assert_eq!(decoded.content.landing_message, "Roses are red");
        assert_eq!(decoded.content.final_message, "\nViolets are blue");
    }
}
