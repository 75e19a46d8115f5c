pub mod common;
pub mod completions;
pub mod config;
pub mod fetch;
pub mod link;
pub mod progress;
pub mod save;
pub mod watch;
