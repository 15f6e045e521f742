use std::sync::Arc;

use colored::Colorize;
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::{execute, Command, CommandOutcome};
use crate::data_manager::DataManager;

/// Reads console commands until `stop` or the end of input.
pub async fn handle_input(manager: Arc<DataManager>) {
    let reader = BufReader::new(tokio::io::stdin());
    run(manager, reader).await;
}

async fn run(manager: Arc<DataManager>, mut reader: impl AsyncBufRead + Unpin) {
    let mut buffer = String::new();

    loop {
        buffer.clear();
        match reader.read_line(&mut buffer).await {
            Ok(0) => {
                debug!("Console input closed");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read console input: {e}");
                return;
            }
        }

        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        debug!("you entered: {line}");

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };

        let manager = Arc::clone(&manager);
        let outcome = match tokio::task::spawn_blocking(move || execute(&manager, command)).await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Command failed: {e}");
                continue;
            }
        };

        match outcome {
            CommandOutcome::Continue(lines) => {
                for line in lines {
                    info!("{line}");
                }
            }
            CommandOutcome::Stop => {
                let content = "Server will stop in few second…";
                warn!("{}", content.red().bold());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_runs_commands_until_stop() {
        let manager = Arc::new(DataManager::new(Settings::default()));
        let player = Uuid::new_v4();
        let input = format!("blocks {player} 10\n\nnonsense\nstop\nblocks {player} 10\n");

        run(Arc::clone(&manager), input.as_bytes()).await;
        assert_eq!(manager.claim_blocks(player), 110);
    }

    #[tokio::test]
    async fn test_returns_at_end_of_input() {
        let manager = Arc::new(DataManager::new(Settings::default()));
        run(manager, "worlds\n".as_bytes()).await;
    }
}
