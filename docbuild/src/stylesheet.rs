use std::path::Path;

use tokio::process::Command;

use folio::{err, error};
use folio::error::{Chainable, Result};

/// Runs the stylesheet build `command` (program first) from `dir`.
///
/// Its output is inherited; only the exit status is inspected.
pub async fn regenerate(command: &[String], dir: &Path) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return err!("stylesheet command is empty");
    };

    let command_line = command.join(" ");
    tracing::info!(command = %command_line, "regenerating stylesheet");
    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .kill_on_drop(true)
        .status()
        .await
        .chain_with(|| error! {
            "failed to launch stylesheet command",
            "command" => command_line,
            "working directory" => dir.display(),
        })?;

    if !status.success() {
        return err! {
            "stylesheet command failed",
            "command" => command_line,
            "exit status" => status,
        };
    }

    Ok(())
}
