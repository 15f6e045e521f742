//! Files and directories the claim server needs before it can start.

use std::fs;
use std::io;
use std::path::Path;

mod utils;

use colored::Colorize;
use log::{info, warn};

use crate::config::Settings;
use crate::consts;
use crate::persistence;

/// Creates the settings file with its defaults if it does not already exist.
pub fn init(config: &Path) -> io::Result<()> {
    if config.exists() {
        return Ok(());
    }
    utils::create_file(config, &consts::file_contents::claims_properties())?;
    let content = format!("Created default settings in '{}'", config.display());
    warn!("{}", content.yellow().bold());
    Ok(())
}

/// Creates the data directory and its worlds directory.
pub fn create_dirs(settings: &Settings) -> io::Result<()> {
    let worlds = persistence::worlds_directory(&settings.data_directory);
    if !worlds.is_dir() {
        utils::create_dir(&worlds)?;
        info!("Created dir {}", worlds.display());
    }
    Ok(())
}

/// Removes every claim file of the data directory. Mostly for development.
pub fn clean_files(settings: &Settings) -> io::Result<()> {
    let directory = &settings.data_directory;
    match fs::remove_dir_all(directory) {
        Ok(()) => info!("Directory deleted: {}", directory.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Nothing to clean in {}", directory.display())
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
