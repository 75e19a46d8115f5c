use valentine_core::progress::LocalProgressStore;
use valentine_core::store::VersionedStore;
use valentine_core::sync::SaveReceipt;
use valentine_core::tokens::WriteTokenStore;
use valentine_core::SyncClient;

use crate::cli::SaveArgs;
use crate::commands::common::{apply_edits, read_video, CliContext, ContentEdits};
use crate::error::CliError;

/// Where a save goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    Create,
    Update { save_id: String, expected_version: u64 },
    GlobalLatest,
}

impl SaveTarget {
    pub fn from_args(args: &SaveArgs) -> Self {
        if args.global {
            return Self::GlobalLatest;
        }
        match (&args.save_id, args.expected_version) {
            (Some(save_id), Some(expected_version)) => Self::Update {
                save_id: save_id.clone(),
                expected_version,
            },
            _ => Self::Create,
        }
    }
}

pub async fn run_save(args: SaveArgs, context: &CliContext) -> Result<(), CliError> {
    let target = SaveTarget::from_args(&args);
    let edits = ContentEdits {
        landing_message: args.landing_message,
        final_message: args.final_message,
        videos: args
            .videos
            .iter()
            .map(|path| read_video(path))
            .collect::<Result<_, _>>()?,
        headings: args.headings,
    };

    let client = context.sync_client()?;
    let progress = context.progress_store();
    let receipt = save_card(&client, &progress, edits, &target).await?;

    match &receipt.save_id {
        Some(save_id) => {
            println!("Saved {save_id} (version {})", receipt.version);
            if receipt.write_token.is_some() {
                println!(
                    "Write token stored in {}",
                    client.token_store().describe()
                );
            }
            match context.share_link(save_id) {
                Ok(link) => println!("Share link: {link}"),
                Err(error) => tracing::debug!("No share link: {}", error),
            }
        }
        None => println!("Saved global latest (version {})", receipt.version),
    }
    Ok(())
}

/// Update the local working copy with `edits` and push it to `target`.
///
/// The local copy is written before the remote call so edits survive a
/// failed save.
pub async fn save_card<S, T>(
    client: &SyncClient<S, T>,
    progress: &LocalProgressStore,
    edits: ContentEdits,
    target: &SaveTarget,
) -> Result<SaveReceipt, CliError>
where
    S: VersionedStore,
    T: WriteTokenStore,
{
    let working_copy = progress
        .load()
        .map(|saved| saved.content)
        .unwrap_or_default();
    let content = apply_edits(working_copy, edits)?;
    progress.save(&content)?;

    let receipt = match target {
        SaveTarget::Create => client.create_remote_save(&content).await?,
        SaveTarget::Update {
            save_id,
            expected_version,
        } => {
            client
                .update_remote_save(save_id, *expected_version, &content)
                .await?
        }
        SaveTarget::GlobalLatest => client.save_global_latest(&content).await?,
    };
    Ok(receipt)
}
