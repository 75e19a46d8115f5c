//! Wire records exchanged with the versioned store

use std::fmt;

use serde::{Deserialize, Serialize};

/// Card color stamped on every saved record.
pub const VALENTINE_COLOR: &str = "#ff1493";

/// Wire form of a card as accepted by the store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valentine {
    pub color: String,
    /// Messages plus the marked video metadata region
    pub text: String,
    /// All embedded videos concatenated; base64 on the wire
    #[serde(
        default,
        with = "blob_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub binary_blob: Option<Vec<u8>>,
}

impl Valentine {
    #[must_use]
    pub fn new(text: impl Into<String>, binary_blob: Option<Vec<u8>>) -> Self {
        Self {
            color: VALENTINE_COLOR.to_string(),
            text: text.into(),
            binary_blob,
        }
    }
}

impl fmt::Debug for Valentine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Valentine")
            .field("color", &self.color)
            .field("text", &self.text)
            .field("binary_blob", &self.binary_blob.as_ref().map(Vec::len))
            .finish()
    }
}

/// One stored, versioned copy of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    pub valentine: Valentine,
    /// Starts at 1 and increases on every successful update
    pub version: u64,
    /// Nanoseconds since the Unix epoch
    pub last_update_timestamp: i64,
}

/// Identity and write capability returned once by `create`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSave {
    pub save_id: String,
    pub write_token: String,
}

impl fmt::Debug for CreatedSave {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CreatedSave")
            .field("save_id", &self.save_id)
            .field("write_token", &"[REDACTED]")
            .finish()
    }
}

mod blob_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(D::Error::custom))
            .transpose()
    }
}
