use std::path::Path;

use valentine_core::models::{EditableContent, RemoteRef};
use valentine_core::progress::LocalProgressStore;
use valentine_core::store::VersionedStore;
use valentine_core::sync::RestoredContent;
use valentine_core::tokens::WriteTokenStore;
use valentine_core::SyncClient;

use crate::cli::FetchArgs;
use crate::commands::common::{
    format_summary_lines, summarize_content, video_file_name, CardSummary, CliContext,
};
use crate::error::CliError;

pub async fn run_fetch(args: FetchArgs, context: &CliContext) -> Result<(), CliError> {
    let progress = context.progress_store();

    let summary = if args.global || args.save_id.is_some() {
        let client = context.sync_client()?;
        let save_id = args.save_id.as_deref();
        let restored = fetch_card(&client, &progress, save_id).await?;
        let mut summary = summarize_content(
            &restored.content,
            save_id.map(str::to_string),
            Some(restored.version),
            restored.saved_at,
        );
        if let Some(output_dir) = &args.output_dir {
            export_videos(&restored.content, output_dir, &mut summary)?;
        }
        summary
    } else {
        let Some(saved) = progress.load() else {
            println!("No local progress saved.");
            return Ok(());
        };
        summarize_content(&saved.content, None, None, saved.saved_at)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for line in format_summary_lines(&summary) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Restore a remote card and make it the local working copy.
pub async fn fetch_card<S, T>(
    client: &SyncClient<S, T>,
    progress: &LocalProgressStore,
    save_id: Option<&str>,
) -> Result<RestoredContent, CliError>
where
    S: VersionedStore,
    T: WriteTokenStore,
{
    let restored = match save_id {
        Some(save_id) => client.fetch_remote_save(save_id).await?,
        None => client.fetch_global_latest().await?,
    };
    if restored.detected_videos == 0 {
        tracing::info!("Restored card has no video metadata");
    }
    progress.save(&restored.content)?;
    Ok(restored)
}

/// Write materialized videos to `output_dir`, recording file paths.
pub fn export_videos(
    content: &EditableContent,
    output_dir: &Path,
    summary: &mut CardSummary,
) -> Result<(), CliError> {
    std::fs::create_dir_all(output_dir)?;
    for (index, slot) in content.video_slots.iter().enumerate() {
        let Some(RemoteRef::Object(object)) = &slot.remote_ref else {
            continue;
        };
        let path = output_dir.join(video_file_name(index, &object.mime_type));
        std::fs::write(&path, &object.bytes)?;
        if let Some(video) = summary.videos.get_mut(index) {
            video.file = Some(path.display().to_string());
        }
    }
    Ok(())
}
