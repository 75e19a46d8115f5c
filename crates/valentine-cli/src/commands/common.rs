use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::Serialize;
use valentine_core::config::{config_path_in, ClientConfig};
use valentine_core::models::{EditableContent, LocalMedia, RemoteRef, VideoSlot, SLOT_COUNT};
use valentine_core::progress::LocalProgressStore;
use valentine_core::store::HttpStore;
use valentine_core::util::normalize_text_option;
use valentine_core::SyncClient;

use crate::cli::GlobalArgs;
use crate::error::CliError;
use crate::token_store::CliTokenStore;

pub const ENV_ACCESS_TOKEN: &str = "VALENTINE_ACCESS_TOKEN";

pub type CliSyncClient = SyncClient<HttpStore, CliTokenStore>;

/// Everything resolved from global flags, the config file and the environment.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: ClientConfig,
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub access_token: Option<String>,
    pub token_file: Option<PathBuf>,
}

impl CliContext {
    pub fn load(global: &GlobalArgs) -> Result<Self, CliError> {
        let config_path = match &global.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let mut config = ClientConfig::load_from_path(&config_path)?.with_env_overrides()?;
        if let Some(api_url) = normalize_text_option(global.api_url.clone()) {
            config.api_base_url = Some(api_url);
            config = config.normalized()?;
        }

        let data_dir = match global.data_dir.clone().or_else(|| config.data_dir.clone()) {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let access_token = normalize_text_option(global.access_token.clone())
            .or_else(|| normalize_text_option(env::var(ENV_ACCESS_TOKEN).ok()));

        Ok(Self {
            config,
            config_path,
            data_dir,
            access_token,
            token_file: global.token_file.clone(),
        })
    }

    pub fn progress_store(&self) -> LocalProgressStore {
        LocalProgressStore::new(&self.data_dir)
    }

    pub fn token_store(&self) -> CliTokenStore {
        CliTokenStore::resolve(self.token_file.clone(), &self.data_dir)
    }

    pub fn http_store(&self) -> Result<Arc<HttpStore>, CliError> {
        let base_url = self
            .config
            .api_base_url
            .clone()
            .ok_or(CliError::ApiNotConfigured)?;
        let store = HttpStore::new(base_url)?.with_access_token(self.access_token.clone());
        Ok(Arc::new(store))
    }

    pub fn sync_client(&self) -> Result<CliSyncClient, CliError> {
        Ok(SyncClient::new(self.http_store()?, self.token_store())
            .with_authenticated(self.access_token.is_some()))
    }

    pub fn share_link(&self, save_id: &str) -> Result<String, CliError> {
        let base_url = self
            .config
            .share_base_url
            .as_deref()
            .ok_or(CliError::ShareNotConfigured)?;
        Ok(valentine_core::link::share_link(base_url, save_id)?)
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| config_path_in(&dir))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn default_data_dir() -> Result<PathBuf, CliError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("valentine"))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}

/// Edits requested on the command line.
#[derive(Debug, Clone, Default)]
pub struct ContentEdits {
    pub landing_message: Option<String>,
    pub final_message: Option<String>,
    pub videos: Vec<LocalMedia>,
    pub headings: Vec<String>,
}

/// Apply `edits` on top of the working copy.
///
/// Videos and headings fill slots in order; slots beyond the given lists are
/// left as they were.
pub fn apply_edits(
    mut content: EditableContent,
    edits: ContentEdits,
) -> Result<EditableContent, CliError> {
    for count in [edits.videos.len(), edits.headings.len()] {
        if count > SLOT_COUNT {
            return Err(CliError::TooManyVideos {
                max: SLOT_COUNT,
                count,
            });
        }
    }

    if let Some(landing_message) = edits.landing_message {
        content.landing_message = landing_message;
    }
    if let Some(final_message) = edits.final_message {
        content.final_message = final_message;
    }
    for (slot, heading) in content.video_slots.iter_mut().zip(edits.headings) {
        slot.heading = heading;
    }
    for (slot, media) in content.video_slots.iter_mut().zip(edits.videos) {
        slot.local_media = Some(media);
        slot.remote_ref = None;
    }
    Ok(content)
}

pub fn read_video(path: &Path) -> Result<LocalMedia, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::VideoRead {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = infer_video_mime_type(&file_name);

    Ok(LocalMedia::new(mime_type, bytes).with_file_name(file_name))
}

pub fn infer_video_mime_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// File name used when exporting the video of slot `index`.
pub fn video_file_name(index: usize, mime_type: &str) -> String {
    let extension = mime_guess::get_mime_extensions_str(mime_type)
        .and_then(|extensions| {
            extensions
                .iter()
                .find(|extension| **extension == "mp4" || **extension == "webm")
                .or_else(|| extensions.first())
        })
        .copied()
        .unwrap_or("bin");
    format!("video_{}.{extension}", index + 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub saved_at: i64,
    pub saved_at_iso: String,
    pub landing_message: String,
    pub final_message: String,
    pub videos: Vec<VideoSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSummary {
    pub slot: usize,
    pub heading: String,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

pub fn summarize_content(
    content: &EditableContent,
    save_id: Option<String>,
    version: Option<u64>,
    saved_at: i64,
) -> CardSummary {
    CardSummary {
        save_id,
        version,
        saved_at,
        saved_at_iso: format_timestamp(saved_at),
        landing_message: content.landing_message.clone(),
        final_message: content.final_message.clone(),
        videos: content
            .video_slots
            .iter()
            .enumerate()
            .map(|(index, slot)| summarize_slot(index, slot))
            .collect(),
    }
}

fn summarize_slot(index: usize, slot: &VideoSlot) -> VideoSummary {
    let mut summary = VideoSummary {
        slot: index + 1,
        heading: slot.heading.clone(),
        source: "none",
        url: None,
        mime_type: None,
        size: None,
        file: None,
    };

    if let Some(media) = &slot.local_media {
        summary.source = "local";
        summary.mime_type = Some(media.mime_type.clone());
        summary.size = Some(media.size());
        summary.file.clone_from(&media.file_name);
        return summary;
    }
    match &slot.remote_ref {
        Some(RemoteRef::Url(url)) => {
            summary.source = "url";
            summary.url = Some(url.clone());
        }
        Some(RemoteRef::Object(object)) => {
            summary.source = "embedded";
            summary.mime_type = Some(object.mime_type.clone());
            summary.size = Some(object.size());
        }
        None => {}
    }
    summary
}

pub fn format_summary_lines(summary: &CardSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(save_id) = &summary.save_id {
        lines.push(format!("Save: {save_id}"));
    }
    if let Some(version) = summary.version {
        lines.push(format!("Version: {version}"));
    }
    lines.push(format!("Saved: {}", summary.saved_at_iso));
    lines.push(format!("Landing: {}", summary.landing_message));
    for video in &summary.videos {
        let detail = match video.source {
            "url" => video.url.clone().unwrap_or_default(),
            "none" => "no video".to_string(),
            source => {
                let mut detail = format!(
                    "{source} {} ({} bytes)",
                    video.mime_type.as_deref().unwrap_or("unknown type"),
                    video.size.unwrap_or_default()
                );
                if let Some(file) = &video.file {
                    detail.push_str(&format!(" -> {file}"));
                }
                detail
            }
        };
        lines.push(format!("Video {}: {} [{detail}]", video.slot, video.heading));
    }
    lines.push(format!("Final: {}", summary.final_message));
    lines
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms).single().map_or_else(
        || timestamp_ms.to_string(),
        |value| value.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
