//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::consts::file_paths;

#[derive(Parser, Debug)]
#[command(version, about = "Land claims for Cactus worlds")]
pub struct Args {
    /// Settings file, created with defaults if missing.
    #[arg(short, long, default_value = file_paths::PROPERTIES)]
    pub config: PathBuf,

    /// `usercache.json` used to resolve player names.
    #[arg(long, default_value = file_paths::USERCACHE)]
    pub usercache: PathBuf,

    #[arg(short, long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Removes the data directory and exits.
    #[arg(long)]
    pub clean: bool,
}

pub fn init() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["cactus-claims"]);
        assert_eq!(args.config, PathBuf::from("claims.properties"));
        assert_eq!(args.log_level, LevelFilter::Info);
        assert!(!args.clean);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from(["cactus-claims", "-c", "alt.properties", "-l", "debug"]);
        assert_eq!(args.config, PathBuf::from("alt.properties"));
        assert_eq!(args.log_level, LevelFilter::Debug);
    }
}
