//! Server settings, read from `claims.properties`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::warn;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read the settings file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid value '{value}' for '{key}' on line {line}")]
    InvalidValue {
        key: String,
        value: String,
        line: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Claim blocks a player starts with.
    pub starting_claim_blocks: i64,
    /// Smallest area a top-level claim may cover.
    pub min_claim_area: i64,
    /// Smallest area a subdivision may cover.
    pub min_subdivision_area: i64,
    /// Shortest allowed edge of any region, in blocks.
    pub min_side_length: i64,
    /// Lookup cells are `2^lookup_scale` blocks wide.
    pub lookup_scale: u32,
    pub lookup_initial_capacity: usize,
    /// Days without a login after which a claim can be stolen. `0` disables expiration.
    pub expiration_days: i64,
    pub overworld_floor: i32,
    pub world_height: i32,
    pub nether_floor: i32,
    pub nether_ceiling: i32,
    pub data_directory: PathBuf,
    pub autosave_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            starting_claim_blocks: 100,
            min_claim_area: 100,
            min_subdivision_area: 9,
            min_side_length: 3,
            lookup_scale: 5,
            lookup_initial_capacity: 64,
            expiration_days: 60,
            overworld_floor: -64,
            world_height: 320,
            nether_floor: 0,
            nether_ceiling: 128,
            data_directory: PathBuf::from("claims"),
            autosave_seconds: 300,
        }
    }
}

impl Settings {
    /// Reads `key=value` lines. Unknown keys are ignored with a warning, missing keys keep
    /// their default.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let reader = BufReader::new(File::open(path)?);
        let mut settings = Settings::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!("Ignoring malformed settings line {}: {line}", index + 1);
                continue;
            };
            settings.apply(key.trim(), value.trim(), index + 1)?;
        }

        Ok(settings)
    }

    fn apply(&mut self, key: &str, value: &str, line: usize) -> Result<(), ConfigError> {
        fn parse<T: FromStr>(key: &str, value: &str, line: usize) -> Result<T, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                line,
            })
        }

        match key {
            "starting-claim-blocks" => self.starting_claim_blocks = parse(key, value, line)?,
            "min-claim-area" => self.min_claim_area = parse(key, value, line)?,
            "min-subdivision-area" => self.min_subdivision_area = parse(key, value, line)?,
            "min-side-length" => self.min_side_length = parse(key, value, line)?,
            "lookup-scale" => self.lookup_scale = parse(key, value, line)?,
            "lookup-initial-capacity" => self.lookup_initial_capacity = parse(key, value, line)?,
            "expiration-days" => self.expiration_days = parse(key, value, line)?,
            "overworld-floor" => self.overworld_floor = parse(key, value, line)?,
            "world-height" => self.world_height = parse(key, value, line)?,
            "nether-floor" => self.nether_floor = parse(key, value, line)?,
            "nether-ceiling" => self.nether_ceiling = parse(key, value, line)?,
            "data-directory" => self.data_directory = PathBuf::from(value),
            "autosave-seconds" => self.autosave_seconds = parse(key, value, line)?,
            _ => warn!("Unknown setting '{key}' on line {line}"),
        }
        Ok(())
    }
}
