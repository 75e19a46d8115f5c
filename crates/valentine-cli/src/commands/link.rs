use crate::commands::common::CliContext;
use crate::error::CliError;

pub fn run_link(save_id: &str, context: &CliContext) -> Result<(), CliError> {
    println!("{}", context.share_link(save_id)?);
    Ok(())
}
