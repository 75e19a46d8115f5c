use std::path::{Path, PathBuf};

use valentine_core::config::ClientConfig;
use valentine_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::commands::common::CliContext;
use crate::error::CliError;

/// Values passed to `config init`.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub api_base_url: Option<String>,
    pub share_base_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
}

pub fn run_config(command: ConfigCommands, context: &CliContext) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_base_url,
            share_base_url,
            poll_interval_secs,
            data_dir,
        } => {
            let update = ConfigUpdate {
                api_base_url,
                share_base_url,
                poll_interval_secs,
                data_dir,
            };
            let config = init_config(&context.config_path, update)?;
            println!("Saved config to {}", context.config_path.display());
            print_config(&config)
        }
        ConfigCommands::Show => {
            println!("Config file: {}", context.config_path.display());
            println!("Data directory: {}", context.data_dir.display());
            print_config(&context.config)
        }
    }
}

/// Merge `update` into the file at `path`, ignoring environment overrides.
pub fn init_config(path: &Path, update: ConfigUpdate) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::load_from_path(path)?;
    if let Some(url) = normalize_text_option(update.api_base_url) {
        config.api_base_url = Some(url);
    }
    if let Some(url) = normalize_text_option(update.share_base_url) {
        config.share_base_url = Some(url);
    }
    if let Some(poll_interval_secs) = update.poll_interval_secs {
        config.poll_interval_secs = poll_interval_secs;
    }
    if let Some(data_dir) = update.data_dir {
        config.data_dir = Some(data_dir);
    }

    let config = config.normalized()?;
    config.save_to_path(path)?;
    Ok(config)
}

fn print_config(config: &ClientConfig) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
