use std::time::Duration;

use valentine_core::watcher::{ConflictState, ConflictWatcher, WatchOptions, WatchTarget};

use crate::cli::WatchArgs;
use crate::commands::common::CliContext;
use crate::error::CliError;

pub fn watch_target(args: &WatchArgs) -> WatchTarget {
    match &args.save_id {
        Some(save_id) if !args.global => WatchTarget::Save(save_id.trim().to_string()),
        _ => WatchTarget::GlobalLatest,
    }
}

pub fn notification_message(target: &WatchTarget, version: u64) -> String {
    let reload = match target {
        WatchTarget::Save(save_id) => format!("valentine fetch --save-id {save_id}"),
        WatchTarget::GlobalLatest => "valentine fetch --global".to_string(),
    };
    format!("A newer version ({version}) of {target} is available. Run `{reload}` to reload.")
}

pub async fn run_watch(args: WatchArgs, context: &CliContext) -> Result<(), CliError> {
    let target = watch_target(&args);
    let interval = args
        .interval_secs
        .map_or_else(|| context.config.poll_interval(), Duration::from_secs);

    let mut watcher = ConflictWatcher::new(context.http_store()?);
    let mut updates = watcher.subscribe();
    watcher.configure(WatchOptions::new(target.clone(), args.version).with_interval(interval));
    println!(
        "Watching {target} from version {} every {}s (Ctrl-C to stop)",
        args.version,
        interval.as_secs()
    );

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *updates.borrow_and_update();
                if let ConflictState::Notifying(version) = state {
                    println!("{}", notification_message(&target, version));
                }
            }
        }
    }

    watcher.disable();
    Ok(())
}
