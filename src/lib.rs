//! Land claims for Cactus worlds.
//!
//! Players protect boxes of a world with claim blocks, split them into subdivisions, share them
//! through trust levels and tune them with flags. Administrators register named regions of
//! their own. Everything goes through the [`DataManager`].

pub mod args;
pub mod commands;
pub mod config;
pub mod consts;
pub mod data_manager;
pub mod error;
pub mod events;
pub mod flags;
pub mod fs_manager;
pub mod geometry;
pub mod logging;
pub mod persistence;
pub mod player;
pub mod region;
pub mod time;
pub mod world;

pub use config::Settings;
pub use data_manager::DataManager;
pub use error::ClaimError;
pub use events::{ClaimEvent, ClaimListener, EventOutcome, Notifier};
pub use flags::{Flag, FlagContainer, FlagValue, Owner, TrustLevel};
pub use geometry::{Bounds, Direction, Point};
pub use player::{Actor, PlayerId};
pub use region::{Region, RegionId};
