use crate::cli::ProgressCommands;
use crate::commands::common::{format_summary_lines, summarize_content, CliContext};
use crate::error::CliError;

pub fn run_progress(command: ProgressCommands, context: &CliContext) -> Result<(), CliError> {
    let store = context.progress_store();
    match command {
        ProgressCommands::Show { json } => {
            let Some(saved) = store.load() else {
                println!("No local progress saved.");
                return Ok(());
            };
            let summary = summarize_content(&saved.content, None, None, saved.saved_at);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for line in format_summary_lines(&summary) {
                    println!("{line}");
                }
            }
        }
        ProgressCommands::Clear => {
            store.clear()?;
            println!("Cleared local progress in {}", store.root().display());
        }
    }
    Ok(())
}
