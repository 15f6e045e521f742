//! Console commands.
//!
//! A line is parsed into a [`Command`], then run against the [`DataManager`]. Running a
//! command never exits the process: `stop` is handed back to the caller as
//! [`CommandOutcome::Stop`].

pub mod command_line;

use std::fmt;

use crate::data_manager::DataManager;
use crate::player::IdentityResolver;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Stop,
    Save,
    Worlds,
    /// Top-level regions of a world.
    Claims(String),
    /// Shows a player's balance, or adds to it.
    Blocks { player: String, delta: Option<i64> },
    /// Toggles ignore-claims for an online player.
    TrustIgnore(String),
    /// Deletes every claim of a player.
    DeleteAll(String),
    Help,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    Usage(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "Empty command"),
            ParseError::Unknown(name) => {
                write!(f, "Unknown command '{name}', type 'help' for a list")
            }
            ParseError::Usage(usage) => write!(f, "Usage: {usage}"),
        }
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or(ParseError::Empty)?.to_lowercase();
        let args: Vec<&str> = parts.collect();

        let command = match (name.as_str(), args.as_slice()) {
            ("stop", []) => Command::Stop,
            ("save", []) => Command::Save,
            ("worlds", []) => Command::Worlds,
            ("help", _) => Command::Help,
            ("claims", [world]) => Command::Claims(world.to_string()),
            ("claims", _) => return Err(ParseError::Usage("claims <world>")),
            ("blocks", [player]) => Command::Blocks {
                player: player.to_string(),
                delta: None,
            },
            ("blocks", [player, amount]) => Command::Blocks {
                player: player.to_string(),
                delta: Some(
                    amount
                        .parse()
                        .map_err(|_| ParseError::Usage("blocks <player> [amount]"))?,
                ),
            },
            ("blocks", _) => return Err(ParseError::Usage("blocks <player> [amount]")),
            ("trust-ignore", [player]) => Command::TrustIgnore(player.to_string()),
            ("trust-ignore", _) => return Err(ParseError::Usage("trust-ignore <player>")),
            ("delete-all", [player]) => Command::DeleteAll(player.to_string()),
            ("delete-all", _) => return Err(ParseError::Usage("delete-all <player>")),
            ("stop" | "save" | "worlds", _) => return Err(ParseError::Usage("takes no arguments")),
            _ => return Err(ParseError::Unknown(name)),
        };
        Ok(command)
    }
}

/// What the console loop should do after a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue(Vec<String>),
    Stop,
}

const HELP: &[&str] = &[
    "stop                      save and stop the server",
    "save                      write every claim file",
    "worlds                    list worlds with claims",
    "claims <world>            list the top-level regions of a world",
    "blocks <player> [amount]  show or adjust a player's claim blocks",
    "trust-ignore <player>     toggle ignore-claims for an online player",
    "delete-all <player>       delete every claim of a player",
];

pub fn execute(manager: &DataManager, command: Command) -> CommandOutcome {
    let lines = match command {
        Command::Stop => return CommandOutcome::Stop,
        Command::Help => HELP.iter().map(|line| line.to_string()).collect(),
        Command::Save => match manager.save() {
            Ok(()) => vec!["Saved all claims".to_string()],
            Err(e) => vec![format!("Failed to save claims: {e}")],
        },
        Command::Worlds => {
            let worlds = manager.world_names();
            if worlds.is_empty() {
                vec!["No worlds have claims yet".to_string()]
            } else {
                worlds
            }
        }
        Command::Claims(world) => {
            let regions = manager.top_level_regions(&world);
            if regions.is_empty() {
                return CommandOutcome::Continue(vec![format!("No regions in '{world}'")]);
            }
            regions
                .iter()
                .map(|region| {
                    format!(
                        "{} [{}] priority {} owner {} area {}",
                        region.label(),
                        region.bounds(),
                        region.priority(),
                        region.owner(),
                        region.area()
                    )
                })
                .collect()
        }
        Command::Blocks { player, delta } => {
            let Some(id) = manager.resolver().resolve(&player) else {
                return unknown_player(&player);
            };
            let balance = match delta {
                Some(delta) => manager.adjust_claim_blocks(id, delta),
                None => manager.claim_blocks(id),
            };
            vec![format!("{player} has {balance} claim blocks")]
        }
        Command::TrustIgnore(player) => {
            let Some(id) = manager.resolver().resolve(&player) else {
                return unknown_player(&player);
            };
            let ignoring = !manager.is_ignoring_claims(id);
            if manager.set_ignoring_claims(id, ignoring) {
                let state = if ignoring { "now ignores" } else { "respects" };
                vec![format!("{player} {state} claims")]
            } else {
                vec![format!("{player} is not online")]
            }
        }
        Command::DeleteAll(player) => {
            let Some(id) = manager.resolver().resolve(&player) else {
                return unknown_player(&player);
            };
            let deleted = manager.delete_all_claims(id);
            vec![format!("Deleted {deleted} region(s) of {player}")]
        }
    };
    CommandOutcome::Continue(lines)
}

fn unknown_player(name: &str) -> CommandOutcome {
    CommandOutcome::Continue(vec![format!("Unknown player '{name}'")])
}
