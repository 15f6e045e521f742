//! Players as the claim system sees them: ids, claim-block ledgers, online sessions and the
//! name <-> id resolution used by commands.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;

/// The player a mutation or query is performed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: PlayerId,
    /// Server operators own every admin region and skip some economy checks.
    pub operator: bool,
    /// Session state in which every trust check passes.
    pub ignoring_claims: bool,
}

impl Actor {
    pub fn player(id: PlayerId) -> Self {
        Self {
            id,
            operator: false,
            ignoring_claims: false,
        }
    }

    pub fn operator(id: PlayerId) -> Self {
        Self {
            id,
            operator: true,
            ignoring_claims: false,
        }
    }
}

/// Persistent per-player ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerData {
    pub id: PlayerId,
    pub claim_blocks: i64,
    pub last_login: Option<DateTime<Utc>>,
}

impl PlayerData {
    pub fn new(id: PlayerId, claim_blocks: i64) -> Self {
        Self {
            id,
            claim_blocks,
            last_login: None,
        }
    }
}

/// The ledger of an online player. Authoritative over the persisted copy until the player
/// leaves.
#[derive(Clone, Debug)]
pub struct PlayerSession {
    pub data: PlayerData,
    pub ignoring_claims: bool,
}

impl PlayerSession {
    pub fn open(mut data: PlayerData, now: DateTime<Utc>) -> Self {
        data.last_login = Some(now);
        Self {
            data,
            ignoring_claims: false,
        }
    }
}

/// Converts between player names and ids. Lookups never fail loudly: unknown means `None`.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<PlayerId>;
    fn resolve_name(&self, id: &PlayerId) -> Option<String>;
}

/// An entry of the server's `usercache.json`.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct UserCacheEntry {
    name: String,
    uuid: Uuid,
    #[serde(rename = "expiresOn", default, skip_serializing_if = "Option::is_none")]
    expires_on: Option<String>,
}

/// In-memory copy of `usercache.json`.
#[derive(Default)]
pub struct UserCache {
    names: RwLock<HashMap<String, PlayerId>>,
    ids: RwLock<HashMap<PlayerId, String>>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a cache file. A missing or empty file gives an empty cache.
    pub fn load(path: &Path) -> io::Result<Self> {
        let cache = Self::new();
        if !path.exists() {
            debug!("No user cache at {}", path.display());
            return Ok(cache);
        }

        let mut content = fs::read_to_string(path)?;
        if content.starts_with('\u{feff}') {
            content = content.trim_start_matches('\u{feff}').to_string();
        }
        if content.trim().is_empty() {
            return Ok(cache);
        }

        let entries: Vec<UserCacheEntry> = serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring malformed user cache {}: {e}", path.display());
            Vec::new()
        });
        for entry in entries {
            cache.insert(&entry.name, entry.uuid);
        }
        Ok(cache)
    }

    pub fn insert(&self, name: &str, id: PlayerId) {
        if let Ok(mut names) = self.names.write() {
            names.insert(name.to_lowercase(), id);
        }
        if let Ok(mut ids) = self.ids.write() {
            ids.insert(id, name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.ids.read().map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdentityResolver for UserCache {
    fn resolve(&self, name: &str) -> Option<PlayerId> {
        if let Ok(id) = Uuid::parse_str(name) {
            return Some(id);
        }
        self.names.read().ok()?.get(&name.to_lowercase()).copied()
    }

    fn resolve_name(&self, id: &PlayerId) -> Option<String> {
        self.ids.read().ok()?.get(id).cloned()
    }
}
