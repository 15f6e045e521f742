//! The claim orchestrator.
//!
//! [`DataManager`] owns every world and every player ledger and is the only way to change
//! them. All state sits behind one mutex: queries and mutations may come from the game thread,
//! the console and background save tasks alike, and claim operations are rare enough that a
//! single coarse lock costs nothing worth optimizing.
//!
//! Every mutation follows the same shape: read the current state, compute the candidate
//! result, run the checks against it, ask the listeners, and only then write. A refused
//! operation therefore never has anything to roll back. Notifications and identity lookups
//! happen after the lock is released.

mod admin;
mod claims;
mod flags;
mod ownership;
mod players;
mod query;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use log::{debug, error, info};

use crate::config::Settings;
use crate::error::ClaimError;
use crate::events::{ClaimEvent, ClaimListener, EventOutcome, LogNotifier, Notifier};
use crate::flags::Owner;
use crate::geometry::Bounds;
use crate::persistence::{self, StorageError};
use crate::player::{Actor, IdentityResolver, PlayerData, PlayerId, PlayerSession, UserCache};
use crate::region::RegionId;
use crate::world::WorldData;

pub use query::merge_flags;

/// Everything guarded by the claim lock.
pub(crate) struct ClaimState {
    settings: Settings,
    listeners: Vec<Box<dyn ClaimListener>>,
    worlds: HashMap<String, WorldData>,
    players: HashMap<PlayerId, PlayerData>,
    sessions: HashMap<PlayerId, PlayerSession>,
}

impl ClaimState {
    fn new(settings: Settings) -> Self {
        Self {
            settings,
            listeners: Vec::new(),
            worlds: HashMap::new(),
            players: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    fn world(&self, name: &str) -> Result<&WorldData, ClaimError> {
        self.worlds
            .get(name)
            .ok_or_else(|| ClaimError::UnknownWorld(name.to_string()))
    }

    fn world_mut(&mut self, name: &str) -> Result<&mut WorldData, ClaimError> {
        self.worlds
            .get_mut(name)
            .ok_or_else(|| ClaimError::UnknownWorld(name.to_string()))
    }

    /// Worlds are created on first reference.
    fn world_or_create(&mut self, name: &str) -> &mut WorldData {
        let settings = &self.settings;
        self.worlds
            .entry(name.to_string())
            .or_insert_with(|| WorldData::new(name, settings))
    }

    /// Current balance, from the session while the player is online.
    fn balance(&self, player: &PlayerId) -> i64 {
        if let Some(session) = self.sessions.get(player) {
            return session.data.claim_blocks;
        }
        self.players
            .get(player)
            .map(|data| data.claim_blocks)
            .unwrap_or(self.settings.starting_claim_blocks)
    }

    fn ledger_mut(&mut self, player: PlayerId) -> &mut PlayerData {
        let start = self.settings.starting_claim_blocks;
        match self.sessions.get_mut(&player) {
            Some(session) => &mut session.data,
            None => self
                .players
                .entry(player)
                .or_insert_with(|| PlayerData::new(player, start)),
        }
    }

    /// Adds `delta` (negative to debit) to a balance.
    fn credit(&mut self, player: PlayerId, delta: i64) {
        if delta == 0 {
            return;
        }
        let ledger = self.ledger_mut(player);
        ledger.claim_blocks += delta;
        debug!(
            "Claim blocks of {player} changed by {delta}, now {}",
            ledger.claim_blocks
        );
    }

    fn veto(&self, event: &ClaimEvent<'_>) -> Result<(), ClaimError> {
        for listener in &self.listeners {
            if let EventOutcome::Deny(reason) = listener.on_claim_event(event) {
                debug!("Claim event vetoed: {reason}");
                return Err(ClaimError::Vetoed(reason));
            }
        }
        Ok(())
    }
}

/// Who pays for an area change: nobody for admin regions, a co-owner resizing with their own
/// blocks, otherwise the owner.
fn payer(owner: Owner, co_owner_acting: Option<PlayerId>) -> Option<PlayerId> {
    match owner {
        Owner::Admin => None,
        Owner::Player(id) => Some(co_owner_acting.unwrap_or(id)),
    }
}

/// Regions overlapping `bounds` that count as collisions: anything but `subject`, its family
/// and regions that accept overlap.
fn check_collisions(
    world: &WorldData,
    bounds: &Bounds,
    subject: Option<RegionId>,
    family: &[RegionId],
) -> Result<(), ClaimError> {
    let colliding: Vec<RegionId> = world
        .lookup()
        .collisions(world.regions(), bounds, subject)
        .into_iter()
        .filter(|id| !family.contains(id))
        .filter(|id| world.region(*id).is_some_and(|other| !other.allows_overlap()))
        .collect();

    if colliding.is_empty() {
        Ok(())
    } else {
        Err(ClaimError::Collision(colliding))
    }
}

/// Subdivisions only collide with the other children of `parent`.
fn check_sibling_collisions(
    world: &WorldData,
    bounds: &Bounds,
    subject: Option<RegionId>,
    parent: RegionId,
) -> Result<(), ClaimError> {
    let colliding: Vec<RegionId> = world
        .lookup()
        .collisions(world.regions(), bounds, subject)
        .into_iter()
        .filter(|id| {
            world.region(*id).is_some_and(|other| {
                other.parent() == Some(parent) && !other.allows_overlap()
            })
        })
        .collect();

    if colliding.is_empty() {
        Ok(())
    } else {
        Err(ClaimError::Collision(colliding))
    }
}

fn check_sides(settings: &Settings, bounds: &Bounds) -> Result<(), ClaimError> {
    if bounds.shortest_side() < settings.min_side_length {
        return Err(ClaimError::TooNarrow {
            min: settings.min_side_length,
        });
    }
    Ok(())
}

fn check_balance(balance: i64, delta: i64) -> Result<(), ClaimError> {
    if delta > 0 && delta > balance {
        return Err(ClaimError::InsufficientClaimBlocks {
            needed: delta - balance.max(0),
        });
    }
    Ok(())
}

fn check_area(area: i64, min: i64) -> Result<(), ClaimError> {
    if area < min {
        return Err(ClaimError::TooSmall { area, min });
    }
    Ok(())
}

pub struct DataManager {
    settings: Settings,
    state: Mutex<ClaimState>,
    notifier: Box<dyn Notifier>,
    resolver: Arc<dyn IdentityResolver>,
}

impl DataManager {
    /// An empty manager: no worlds, no players.
    pub fn new(settings: Settings) -> Self {
        Self {
            state: Mutex::new(ClaimState::new(settings.clone())),
            settings,
            notifier: Box::new(LogNotifier),
            resolver: Arc::new(UserCache::new()),
        }
    }

    /// Loads every world and player ledger found in the data directory. Files that cannot be
    /// read are logged and left out; the manager always comes up.
    pub fn load(settings: Settings) -> Self {
        let manager = Self::new(settings);
        let directory = manager.settings.data_directory.clone();

        let worlds = persistence::load_worlds(&directory, &manager.settings);
        let players = match persistence::load_players(&directory) {
            Ok(players) => players,
            Err(e) => {
                error!("Failed to load player data, starting with empty ledgers: {e}");
                HashMap::new()
            }
        };

        {
            let mut state = manager.state();
            info!(
                "Loaded {} world(s) and {} player ledger(s)",
                worlds.len(),
                players.len()
            );
            state.worlds = worlds;
            state.players = players;
        }
        manager
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Listeners are consulted, in registration order, before creations and resizes commit.
    pub fn add_listener(&mut self, listener: impl ClaimListener + 'static) {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .push(Box::new(listener));
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn resolver(&self) -> &dyn IdentityResolver {
        self.resolver.as_ref()
    }

    /// The claim lock. A panic while holding it cannot leave a half-applied mutation behind,
    /// so a poisoned lock is still safe to use.
    fn state(&self) -> MutexGuard<'_, ClaimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends `message` to `recipient`, if there is one.
    pub fn tell(&self, recipient: Option<PlayerId>, message: &str) {
        if let Some(recipient) = recipient {
            self.notifier.notify(recipient, message);
        }
    }

    /// Tells the acting player how an operation went. Must be called without the lock held.
    fn report<T>(
        &self,
        actor: Option<&Actor>,
        result: &Result<T, ClaimError>,
        success: impl FnOnce(&T) -> String,
    ) {
        let recipient = actor.map(|actor| actor.id);
        match result {
            Ok(value) => {
                let message = success(value);
                info!("{message}");
                self.tell(recipient, &message);
            }
            Err(e) => {
                debug!("Claim operation refused: {e}");
                self.tell(recipient, &e.to_string());
            }
        }
    }

    /// Writes every world and the player ledgers (online sessions included) to disk. Files are
    /// encoded under the lock and written after it is released.
    pub fn save(&self) -> Result<(), StorageError> {
        let (worlds, players) = {
            let state = self.state();
            let worlds: Vec<(String, Result<Bytes, StorageError>)> = state
                .worlds
                .values()
                .map(|world| (world.name().to_string(), persistence::encode_world(world)))
                .collect();

            let mut players = state.players.clone();
            for (id, session) in &state.sessions {
                players.insert(*id, session.data.clone());
            }
            (worlds, persistence::encode_players(&players))
        };

        let directory = &self.settings.data_directory;
        let mut first_error = None;
        for (name, encoded) in worlds {
            let written = encoded
                .and_then(|bytes| persistence::write_world(directory, &name, &bytes));
            if let Err(e) = written {
                error!("Failed to save world '{name}': {e}");
                first_error.get_or_insert(e);
            }
        }
        let written = players.and_then(|bytes| persistence::write_players(directory, &bytes));
        if let Err(e) = written {
            error!("Failed to save player data: {e}");
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Saved claim data to {}", directory.display());
                Ok(())
            }
        }
    }

    /// Flushes every session into the persisted ledgers and saves.
    pub fn shutdown(&self) -> Result<(), StorageError> {
        {
            let mut state = self.state();
            let sessions: Vec<PlayerSession> = state.sessions.drain().map(|(_, s)| s).collect();
            for session in sessions {
                state.players.insert(session.data.id, session.data);
            }
        }
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use uuid::Uuid;

    #[test]
    fn test_payer() {
        let owner = Uuid::new_v4();
        let co_owner = Uuid::new_v4();
        assert_eq!(payer(Owner::Admin, Some(co_owner)), None);
        assert_eq!(payer(Owner::Player(owner), None), Some(owner));
        assert_eq!(payer(Owner::Player(owner), Some(co_owner)), Some(co_owner));
    }

    #[test]
    fn test_check_sides() {
        let settings = Settings::default();
        let thin = Bounds::from_corners(Point::new(0, 0, 0), Point::new(1, 10, 10));
        let ok = Bounds::from_corners(Point::new(0, 0, 0), Point::new(2, 10, 10));
        assert_eq!(check_sides(&settings, &thin), Err(ClaimError::TooNarrow { min: 3 }));
        assert_eq!(check_sides(&settings, &ok), Ok(()));
    }

    #[test]
    fn test_check_balance() {
        assert_eq!(check_balance(100, 100), Ok(()));
        assert_eq!(check_balance(0, -50), Ok(()));
        assert_eq!(
            check_balance(100, 200),
            Err(ClaimError::InsufficientClaimBlocks { needed: 100 })
        );
    }

    #[test]
    fn test_ledger_prefers_session() {
        let mut state = ClaimState::new(Settings::default());
        let id = Uuid::new_v4();
        assert_eq!(state.balance(&id), 100);

        state.credit(id, 20);
        assert_eq!(state.players[&id].claim_blocks, 120);

        let data = state.players[&id].clone();
        state
            .sessions
            .insert(id, PlayerSession::open(data, chrono::Utc::now()));
        state.credit(id, -50);
        assert_eq!(state.balance(&id), 70);
        assert_eq!(state.players[&id].claim_blocks, 120);
    }

    #[test]
    fn test_veto_stops_at_first_deny() {
        let mut state = ClaimState::new(Settings::default());
        state
            .listeners
            .push(Box::new(|_: &ClaimEvent<'_>| EventOutcome::Allow));
        state
            .listeners
            .push(Box::new(|_: &ClaimEvent<'_>| EventOutcome::Deny("spawn area".into())));

        let event = ClaimEvent::Creating {
            world: "world",
            bounds: Bounds::from_corners(Point::new(0, 0, 0), Point::new(9, 9, 9)),
            owner: Owner::Admin,
            parent: None,
        };
        assert_eq!(
            state.veto(&event),
            Err(ClaimError::Vetoed("spawn area".into()))
        );
    }
}
