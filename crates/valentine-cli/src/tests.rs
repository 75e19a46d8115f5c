use std::sync::Arc;

use clap::Parser;
use pretty_assertions::assert_eq;
use valentine_core::models::{EditableContent, LocalMedia, MediaObject, RemoteRef, VideoSlot};
use valentine_core::progress::LocalProgressStore;
use valentine_core::store::MemoryStore;
use valentine_core::tokens::{FileTokenStore, MemoryTokenStore, WriteTokenStore};
use valentine_core::watcher::WatchTarget;
use valentine_core::{ErrorKind, SyncClient};

use crate::cli::{Cli, CompletionShell};
use crate::commands::common::{
    apply_edits, format_summary_lines, format_timestamp, infer_video_mime_type, summarize_content,
    video_file_name, ContentEdits,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{init_config, ConfigUpdate};
use crate::commands::fetch::{export_videos, fetch_card};
use crate::commands::save::{save_card, SaveTarget};
use crate::commands::watch::notification_message;
use crate::error::CliError;
use crate::token_store::{CliTokenStore, KeyringTokenStore, DEFAULT_TOKEN_FILE_NAME};

fn memory_client() -> SyncClient<MemoryStore, MemoryTokenStore> {
    SyncClient::new(Arc::new(MemoryStore::new()), MemoryTokenStore::new()).with_authenticated(true)
}

fn progress_store() -> (tempfile::TempDir, LocalProgressStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalProgressStore::new(dir.path().join("data"));
    (dir, store)
}

#[test]
fn apply_edits_fills_slots_in_order() {
    let mut base = EditableContent::default();
    base.video_slots[0] = VideoSlot::new("Old").with_url("https://cdn.example.com/old.mp4");

    let content = apply_edits(
        base,
        ContentEdits {
            landing_message: Some("Hi".to_string()),
            final_message: None,
            videos: vec![LocalMedia::new("video/mp4", vec![1, 2])],
            headings: vec!["First".to_string(), "Second".to_string()],
        },
    )
    .unwrap();

    assert_eq!(content.landing_message, "Hi");
    assert_eq!(content.final_message, EditableContent::default().final_message);
    assert_eq!(content.video_slots[0].heading, "First");
    assert_eq!(content.video_slots[0].remote_ref, None);
    assert!(content.video_slots[0].local_media.is_some());
    assert_eq!(content.video_slots[1].heading, "Second");
    assert_eq!(content.video_slots[2].heading, "Forever Together");
}

#[test]
fn apply_edits_rejects_more_than_three_videos() {
    let edits = ContentEdits {
        videos: vec![LocalMedia::new("video/mp4", vec![1]); 4],
        ..ContentEdits::default()
    };

    let error = apply_edits(EditableContent::default(), edits).unwrap_err();
    assert!(matches!(error, CliError::TooManyVideos { max: 3, count: 4 }));
}

#[test]
fn infer_video_mime_type_uses_extension() {
    assert_eq!(infer_video_mime_type("clip.mp4"), "video/mp4");
    assert_eq!(infer_video_mime_type("clip.webm"), "video/webm");
    assert_eq!(infer_video_mime_type("clip"), "application/octet-stream");
}

#[test]
fn video_file_name_prefers_common_extensions() {
    assert_eq!(video_file_name(0, "video/mp4"), "video_1.mp4");
    assert_eq!(video_file_name(1, "video/webm"), "video_2.webm");
    assert_eq!(video_file_name(2, ""), "video_3.bin");
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn summary_lines_describe_each_slot() {
    let mut content = EditableContent::new("Hello", "Bye");
    content.video_slots[0] = VideoSlot::new("Clip")
        .with_local_media(LocalMedia::new("video/mp4", vec![0; 4]).with_file_name("clip.mp4"));
    content.video_slots[1] = VideoSlot::new("Link").with_url("https://cdn.example.com/a.mp4");

    let summary = summarize_content(&content, Some("abc".to_string()), Some(2), 0);
    let lines = format_summary_lines(&summary);

    assert_eq!(summary.videos[0].source, "local");
    assert_eq!(summary.videos[1].source, "url");
    assert_eq!(summary.videos[2].source, "none");
    assert!(lines.contains(&"Save: abc".to_string()));
    assert!(lines.contains(&"Version: 2".to_string()));
    assert!(lines.contains(&"Video 1: Clip [local video/mp4 (4 bytes) -> clip.mp4]".to_string()));
    assert!(lines.contains(&"Video 2: Link [https://cdn.example.com/a.mp4]".to_string()));
    assert!(lines.contains(&"Video 3: Forever Together [no video]".to_string()));
}

#[tokio::test(flavor = "current_thread")]
async fn save_card_creates_then_updates_from_working_copy() {
    let client = memory_client();
    let (_dir, progress) = progress_store();

    let created = save_card(
        &client,
        &progress,
        ContentEdits {
            landing_message: Some("First draft".to_string()),
            videos: vec![LocalMedia::new("video/mp4", vec![7, 8, 9])],
            ..ContentEdits::default()
        },
        &SaveTarget::Create,
    )
    .await
    .unwrap();
    let save_id = created.save_id.unwrap();
    assert_eq!(created.version, 1);

    let updated = save_card(
        &client,
        &progress,
        ContentEdits {
            final_message: Some("Still yours".to_string()),
            ..ContentEdits::default()
        },
        &SaveTarget::Update {
            save_id: save_id.clone(),
            expected_version: 1,
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.version, 2);

    let restored = client.fetch_remote_save(&save_id).await.unwrap();
    assert_eq!(restored.content.landing_message, "First draft");
    assert_eq!(restored.content.final_message, "Still yours");
    let object = restored.content.video_slots[0]
        .remote_ref
        .as_ref()
        .and_then(RemoteRef::as_object)
        .unwrap();
    assert_eq!(object.bytes, vec![7, 8, 9]);
}

#[tokio::test(flavor = "current_thread")]
async fn failed_save_keeps_local_progress() {
    let client = SyncClient::new(Arc::new(MemoryStore::new()), MemoryTokenStore::new());
    let (_dir, progress) = progress_store();

    let error = save_card(
        &client,
        &progress,
        ContentEdits {
            landing_message: Some("Offline draft".to_string()),
            ..ContentEdits::default()
        },
        &SaveTarget::GlobalLatest,
    )
    .await
    .unwrap_err();

    match error {
        CliError::Sync(error) => assert_eq!(error.kind(), ErrorKind::Auth),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(progress.load().unwrap().content.landing_message, "Offline draft");
}

#[tokio::test(flavor = "current_thread")]
async fn fetch_card_replaces_working_copy_and_exports_videos() {
    let client = memory_client();
    let (dir, progress) = progress_store();
    let mut content = EditableContent::new("Shared", "Card");
    content.video_slots[1] = VideoSlot::new("Embedded").with_object(MediaObject {
        mime_type: "video/webm".to_string(),
        bytes: vec![3, 2, 1],
    });
    client.save_global_latest(&content).await.unwrap();

    let restored = fetch_card(&client, &progress, None).await.unwrap();
    let mut summary = summarize_content(&restored.content, None, Some(1), restored.saved_at);
    let output_dir = dir.path().join("out");
    export_videos(&restored.content, &output_dir, &mut summary).unwrap();

    assert_eq!(progress.load().unwrap().content.landing_message, "Shared");
    assert_eq!(
        std::fs::read(output_dir.join("video_2.webm")).unwrap(),
        vec![3, 2, 1]
    );
    assert!(summary.videos[1].file.as_deref().unwrap().ends_with("video_2.webm"));
}

#[tokio::test(flavor = "current_thread")]
async fn fetch_card_reports_missing_save() {
    let client = memory_client();
    let (_dir, progress) = progress_store();

    let error = fetch_card(&client, &progress, Some("missing")).await.unwrap_err();

    assert_eq!(
        error.to_string(),
        "Valentine not found. Please check your save link and try again."
    );
    assert!(progress.load().is_none());
}

#[test]
fn init_config_merges_into_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("valentine").join("config.json");

    init_config(
        &path,
        ConfigUpdate {
            api_base_url: Some("https://api.example.com/".to_string()),
            ..ConfigUpdate::default()
        },
    )
    .unwrap();
    let config = init_config(
        &path,
        ConfigUpdate {
            share_base_url: Some("https://valentine.example.com".to_string()),
            poll_interval_secs: Some(15),
            ..ConfigUpdate::default()
        },
    )
    .unwrap();

    assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));
    assert_eq!(
        config.share_base_url.as_deref(),
        Some("https://valentine.example.com")
    );
    assert_eq!(config.poll_interval_secs, 15);
}

#[test]
fn init_config_rejects_invalid_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let result = init_config(
        &path,
        ConfigUpdate {
            api_base_url: Some("api.example.com".to_string()),
            ..ConfigUpdate::default()
        },
    );

    assert!(result.is_err());
    assert!(!path.exists());
}

#[test]
fn file_token_backend_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = CliTokenStore::File(FileTokenStore::new(dir.path().join("tokens.json")));

    store.store_token("abc", "secret").unwrap();

    assert_eq!(store.load_token("abc").unwrap().as_deref(), Some("secret"));
    assert_eq!(store.describe(), "token file");
}

#[test]
fn default_token_backend_is_readable_from_a_fresh_instance() {
    let dir = tempfile::tempdir().unwrap();
    let save_id = format!("cli-default-{}", std::process::id());

    let store = CliTokenStore::resolve(None, dir.path());
    store.store_token(&save_id, "secret").unwrap();
    let reopened = CliTokenStore::resolve(None, dir.path());
    let loaded = reopened.load_token(&save_id).unwrap();

    if let CliTokenStore::Keyring { keyring, .. } = &reopened {
        keyring.delete_token(&save_id).unwrap();
    }
    assert_eq!(loaded.as_deref(), Some("secret"));
}

#[test]
fn token_file_flag_overrides_keyring() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");

    let store = CliTokenStore::resolve(Some(path.clone()), dir.path());
    store.store_token("abc", "secret").unwrap();

    assert_eq!(store.describe(), "token file");
    assert_eq!(
        FileTokenStore::new(&path).load_token("abc").unwrap().as_deref(),
        Some("secret")
    );
}

#[test]
fn keyring_backend_reads_tokens_left_in_the_data_dir_file() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = FileTokenStore::new(dir.path().join(DEFAULT_TOKEN_FILE_NAME));
    fallback.store_token("abc", "from-file").unwrap();

    let keyring = KeyringTokenStore::default();
    if !keyring.is_available() {
        return;
    }
    let store = CliTokenStore::Keyring { keyring, fallback };

    assert_eq!(store.load_token("abc").unwrap().as_deref(), Some("from-file"));
}

#[test]
fn cli_requires_expected_version_for_updates() {
    assert!(Cli::try_parse_from(["valentine", "save", "--save-id", "abc"]).is_err());
    assert!(Cli::try_parse_from([
        "valentine",
        "save",
        "--save-id",
        "abc",
        "--expected-version",
        "2"
    ])
    .is_ok());
    assert!(Cli::try_parse_from([
        "valentine",
        "save",
        "--global",
        "--save-id",
        "abc",
        "--expected-version",
        "2"
    ])
    .is_err());
}

#[test]
fn cli_watch_needs_a_target() {
    assert!(Cli::try_parse_from(["valentine", "watch", "--version", "3"]).is_err());
    assert!(Cli::try_parse_from(["valentine", "watch", "--global", "--version", "3"]).is_ok());
    assert!(Cli::try_parse_from([
        "valentine",
        "watch",
        "--save-id",
        "abc",
        "--version",
        "3",
        "--interval-secs",
        "30"
    ])
    .is_ok());
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("valentine"));
}

#[test]
fn notification_message_names_reload_command() {
    let message = notification_message(&WatchTarget::Save("abc".to_string()), 5);
    assert_eq!(
        message,
        "A newer version (5) of save abc is available. Run `valentine fetch --save-id abc` to reload."
    );
}
