//! Claim files on disk.
//!
//! Every world lives in `worlds/<world>.dat` under the data directory and every ledger in
//! `players.dat`. Files are written to a temporary sibling and renamed over the old one, so a
//! failed save never damages what was there before. A world file that cannot be read is moved
//! aside to `<world>.dat.corrupt` and the world starts empty.

pub mod data_types;
mod format;
pub mod record;

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::{debug, error, info, warn};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::Settings;
use crate::consts::storage::{
    CORRUPT_EXTENSION, FORMAT_VERSION, PLAYERS_FILE, PLAYER_MAGIC, WORLDS_DIRECTORY,
    WORLD_EXTENSION, WORLD_MAGIC,
};
use crate::player::{PlayerData, PlayerId};
use crate::world::WorldData;
use data_types::CodecError;
use record::{RecordBuilder, RecordReader};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Not a {expected} file")]
    BadMagic { expected: String },

    #[error("Unsupported format version {found}, expected {expected}")]
    Version { found: i32, expected: i32 },

    #[error("The file does not match its checksum")]
    Checksum,

    #[error("The file is truncated")]
    Truncated,

    #[error("Unexpected data after the end of the file")]
    TrailingData,
}

pub fn worlds_directory(data_directory: &Path) -> PathBuf {
    data_directory.join(WORLDS_DIRECTORY)
}

pub fn world_path(data_directory: &Path, world: &str) -> PathBuf {
    worlds_directory(data_directory).join(format!("{world}.{WORLD_EXTENSION}"))
}

pub fn players_path(data_directory: &Path) -> PathBuf {
    data_directory.join(PLAYERS_FILE)
}

pub fn encode_world(world: &WorldData) -> Result<Bytes, StorageError> {
    let mut builder = RecordBuilder::new();
    format::write_world(&mut builder, world)?;
    Ok(builder.finish(WORLD_MAGIC, FORMAT_VERSION)?)
}

pub fn decode_world(file: &[u8], settings: &Settings) -> Result<WorldData, StorageError> {
    let mut reader = RecordReader::open(file, WORLD_MAGIC, FORMAT_VERSION)?;
    let world = format::read_world(&mut reader, settings)?;
    if !reader.is_empty() {
        return Err(StorageError::TrailingData);
    }
    Ok(world)
}

pub fn encode_players(players: &HashMap<PlayerId, PlayerData>) -> Result<Bytes, StorageError> {
    let mut builder = RecordBuilder::new();
    format::write_players(&mut builder, players)?;
    Ok(builder.finish(PLAYER_MAGIC, FORMAT_VERSION)?)
}

pub fn decode_players(file: &[u8]) -> Result<HashMap<PlayerId, PlayerData>, StorageError> {
    let mut reader = RecordReader::open(file, PLAYER_MAGIC, FORMAT_VERSION)?;
    let players = format::read_players(&mut reader)?;
    if !reader.is_empty() {
        return Err(StorageError::TrailingData);
    }
    Ok(players)
}

/// Replaces `path` with `bytes` through a temporary file in the same directory.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory)?;

    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub fn write_world(data_directory: &Path, world: &str, bytes: &[u8]) -> Result<(), StorageError> {
    write_atomically(&world_path(data_directory, world), bytes)
}

pub fn write_players(data_directory: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    write_atomically(&players_path(data_directory), bytes)
}

pub fn load_world(path: &Path, settings: &Settings) -> Result<WorldData, StorageError> {
    decode_world(&fs::read(path)?, settings)
}

/// Moves an unreadable file out of the way so the next save does not overwrite it.
fn quarantine(path: &Path) {
    let mut target = path.as_os_str().to_owned();
    target.push(".");
    target.push(CORRUPT_EXTENSION);
    match fs::rename(path, &target) {
        Ok(()) => warn!(
            "Moved unreadable file {} to {}",
            path.display(),
            Path::new(&target).display()
        ),
        Err(e) => error!("Failed to move unreadable file {}: {e}", path.display()),
    }
}

/// Loads every world file of the data directory. Unreadable worlds are quarantined and left
/// out.
pub fn load_worlds(data_directory: &Path, settings: &Settings) -> HashMap<String, WorldData> {
    let mut worlds = HashMap::new();
    let directory = worlds_directory(data_directory);
    let entries = match fs::read_dir(&directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return worlds,
        Err(e) => {
            error!("Failed to list {}: {e}", directory.display());
            return worlds;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(WORLD_EXTENSION) {
            continue;
        }
        match load_world(&path, settings) {
            Ok(world) => {
                info!(
                    "Loaded world '{}' with {} region(s)",
                    world.name(),
                    world.regions().len()
                );
                worlds.insert(world.name().to_string(), world);
            }
            Err(e) => {
                error!("Failed to load {}: {e}", path.display());
                quarantine(&path);
            }
        }
    }
    worlds
}

/// A missing file is an empty ledger. An undecodable one is quarantined.
pub fn load_players(data_directory: &Path) -> Result<HashMap<PlayerId, PlayerData>, StorageError> {
    let path = players_path(data_directory);
    let file = match fs::read(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };
    let players = decode_players(&file);
    if players.is_err() {
        quarantine(&path);
    }
    players
}
