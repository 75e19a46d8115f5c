//! Byte-range references into a snapshot's combined video blob.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Prefix marking a reference as embedded rather than a URL.
pub const EMBEDDED_PREFIX: &str = "embedded:";

/// `(offset, length, mime_type)` pointer into a combined binary blob.
///
/// Textual form: `embedded:<offset>:<length>:<mimeType>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedRef {
    pub offset: u64,
    pub length: u64,
    pub mime_type: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbeddedRefError {
    #[error("reference does not start with `{EMBEDDED_PREFIX}`")]
    MissingPrefix,
    #[error("malformed embedded reference: {0}")]
    Malformed(String),
    #[error("embedded range {offset}+{length} exceeds blob of {blob_len} bytes")]
    OutOfBounds {
        offset: u64,
        length: u64,
        blob_len: u64,
    },
}

impl EmbeddedRef {
    #[must_use]
    pub fn new(offset: u64, length: u64, mime_type: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_embedded(reference: &str) -> bool {
        reference.starts_with(EMBEDDED_PREFIX)
    }

    /// Slice this range out of `blob`, rejecting ranges past its end.
    pub fn resolve<'a>(&self, blob: &'a [u8]) -> Result<&'a [u8], EmbeddedRefError> {
        let out_of_bounds = || EmbeddedRefError::OutOfBounds {
            offset: self.offset,
            length: self.length,
            blob_len: super::byte_len(blob),
        };

        let start = usize::try_from(self.offset).map_err(|_| out_of_bounds())?;
        let length = usize::try_from(self.length).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(length).ok_or_else(out_of_bounds)?;
        blob.get(start..end).ok_or_else(out_of_bounds)
    }
}

impl fmt::Display for EmbeddedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{EMBEDDED_PREFIX}{}:{}:{}",
            self.offset, self.length, self.mime_type
        )
    }
}

impl FromStr for EmbeddedRef {
    type Err = EmbeddedRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(EMBEDDED_PREFIX)
            .ok_or(EmbeddedRefError::MissingPrefix)?;

        let mut parts = body.splitn(3, ':');
        let offset = parts
            .next()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .ok_or_else(|| EmbeddedRefError::Malformed(s.to_string()))?;
        let length = parts
            .next()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .ok_or_else(|| EmbeddedRefError::Malformed(s.to_string()))?;
        let mime_type = parts.next().unwrap_or_default().trim().to_string();

        Ok(Self {
            offset,
            length,
            mime_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let reference = EmbeddedRef::new(1024, 2048, "video/mp4");
        let text = reference.to_string();
        assert_eq!(text, "embedded:1024:2048:video/mp4");
        assert_eq!(text.parse::<EmbeddedRef>().unwrap(), reference);
    }

    #[test]
    fn parse_accepts_empty_mime_type() {
        let reference: EmbeddedRef = "embedded:0:10:".parse().unwrap();
        assert_eq!(reference, EmbeddedRef::new(0, 10, ""));
    }

    #[test]
    fn parse_rejects_non_numeric_ranges() {
        assert_eq!(
            "embedded:abc:10:video/mp4".parse::<EmbeddedRef>(),
            Err(EmbeddedRefError::Malformed(
                "embedded:abc:10:video/mp4".to_string()
            ))
        );
        assert!("embedded:5".parse::<EmbeddedRef>().is_err());
        assert_eq!(
            "https://cdn.example.com/a.mp4".parse::<EmbeddedRef>(),
            Err(EmbeddedRefError::MissingPrefix)
        );
    }

    #[test]
    fn resolve_slices_in_bounds_range() {
        let blob = [0_u8, 1, 2, 3, 4, 5];
        let reference = EmbeddedRef::new(2, 3, "video/mp4");
        assert_eq!(reference.resolve(&blob).unwrap(), &[2, 3, 4]);
    }

    #[test]
    fn resolve_rejects_range_past_blob_end() {
        let blob = [0_u8; 4];
        let error = EmbeddedRef::new(2, 3, "video/mp4")
            .resolve(&blob)
            .unwrap_err();
        assert_eq!(
            error,
            EmbeddedRefError::OutOfBounds {
                offset: 2,
                length: 3,
                blob_len: 4
            }
        );
    }

    #[test]
    fn resolve_rejects_overflowing_range() {
        let blob = [0_u8; 4];
        assert!(EmbeddedRef::new(u64::MAX, 2, "video/mp4")
            .resolve(&blob)
            .is_err());
    }
}
