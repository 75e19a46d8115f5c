use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "valentine")]
#[command(about = "Save, restore and share Valentine cards from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the snapshot API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Access token from the identity provider (falls back to VALENTINE_ACCESS_TOKEN)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Override the data directory for the local progress copy
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Keep write tokens in this JSON file instead of the OS keyring
    #[arg(long, global = true, value_name = "PATH")]
    pub token_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save the card remotely (create, update or global latest)
    Save(SaveArgs),
    /// Restore a saved card
    Fetch(FetchArgs),
    /// Watch a saved card for newer versions
    Watch(WatchArgs),
    /// Print the shareable link for a save
    Link {
        /// Save identifier
        save_id: String,
    },
    /// Inspect or clear the local progress copy
    Progress {
        #[command(subcommand)]
        command: ProgressCommands,
    },
    /// Manage client configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SaveArgs {
    /// Landing message shown before the videos
    #[arg(long = "landing", value_name = "TEXT")]
    pub landing_message: Option<String>,

    /// Final message shown after the videos
    #[arg(long = "final", value_name = "TEXT")]
    pub final_message: Option<String>,

    /// Video files for slots 1-3, in order
    #[arg(long = "video", value_name = "PATH")]
    pub videos: Vec<PathBuf>,

    /// Slot headings, in order
    #[arg(long = "heading", value_name = "TEXT")]
    pub headings: Vec<String>,

    /// Update this existing save instead of creating a new one
    #[arg(long, value_name = "ID", requires = "expected_version")]
    pub save_id: Option<String>,

    /// Version the update is based on
    #[arg(long, value_name = "N", requires = "save_id")]
    pub expected_version: Option<u64>,

    /// Overwrite the shared global latest card
    #[arg(long, conflicts_with = "save_id")]
    pub global: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Save identifier to restore
    #[arg(long, value_name = "ID", conflicts_with = "global")]
    pub save_id: Option<String>,

    /// Restore the global latest card
    #[arg(long)]
    pub global: bool,

    /// Write restored videos into this directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Save identifier to watch
    #[arg(long, value_name = "ID", conflicts_with = "global", required_unless_present = "global")]
    pub save_id: Option<String>,

    /// Watch the global latest card
    #[arg(long)]
    pub global: bool,

    /// Version currently loaded
    #[arg(long, value_name = "N")]
    pub version: u64,

    /// Poll interval in seconds (defaults to the configured interval)
    #[arg(long, value_name = "SECS")]
    pub interval_secs: Option<u64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ProgressCommands {
    /// Show the local progress copy
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the local progress copy and its videos
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the config file
    Init {
        /// Snapshot API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Public site used for share links
        #[arg(long, value_name = "URL")]
        share_base_url: Option<String>,
        /// Version poll interval in seconds
        #[arg(long, value_name = "SECS")]
        poll_interval_secs: Option<u64>,
        /// Directory for the local progress copy
        #[arg(long, value_name = "PATH")]
        data_dir: Option<PathBuf>,
    },
    /// Show the effective configuration
    Show,
}
