//! Sessions and claim-block balances.

use chrono::Utc;
use log::{debug, info};

use super::DataManager;
use crate::player::{Actor, PlayerData, PlayerId, PlayerSession};

impl DataManager {
    /// Opens a session from the stored ledger, creating the ledger on first sight. Returns the
    /// player's balance.
    pub fn player_join(&self, player: PlayerId) -> i64 {
        let mut state = self.state();
        if let Some(session) = state.sessions.get(&player) {
            return session.data.claim_blocks;
        }

        let start = state.settings.starting_claim_blocks;
        let data = state
            .players
            .remove(&player)
            .unwrap_or_else(|| PlayerData::new(player, start));
        let session = PlayerSession::open(data, Utc::now());
        let balance = session.data.claim_blocks;
        state.sessions.insert(player, session);
        debug!("Opened claim session for {player} with {balance} claim blocks");
        balance
    }

    /// Writes the session back into the stored ledger.
    pub fn player_quit(&self, player: PlayerId) {
        let mut state = self.state();
        if let Some(session) = state.sessions.remove(&player) {
            state.players.insert(player, session.data);
            debug!("Closed claim session for {player}");
        }
    }

    pub fn is_online(&self, player: PlayerId) -> bool {
        self.state().sessions.contains_key(&player)
    }

    pub fn claim_blocks(&self, player: PlayerId) -> i64 {
        self.state().balance(&player)
    }

    /// Adds `delta` claim blocks, never going below zero. Returns the new balance.
    pub fn adjust_claim_blocks(&self, player: PlayerId, delta: i64) -> i64 {
        let balance = {
            let mut state = self.state();
            let ledger = state.ledger_mut(player);
            ledger.claim_blocks = ledger.claim_blocks.saturating_add(delta).max(0);
            ledger.claim_blocks
        };
        info!("Claim blocks of {player} adjusted by {delta}, now {balance}");
        balance
    }

    /// Lets an online player bypass every trust check. Returns false if the player is offline.
    pub fn set_ignoring_claims(&self, player: PlayerId, ignoring: bool) -> bool {
        let changed = match self.state().sessions.get_mut(&player) {
            Some(session) => {
                session.ignoring_claims = ignoring;
                true
            }
            None => false,
        };
        if changed {
            let message = if ignoring {
                "You are now ignoring claims"
            } else {
                "You respect claims again"
            };
            self.tell(Some(player), message);
        }
        changed
    }

    pub fn is_ignoring_claims(&self, player: PlayerId) -> bool {
        self.state()
            .sessions
            .get(&player)
            .is_some_and(|session| session.ignoring_claims)
    }

    /// The acting-player view used by ownership and trust checks.
    pub fn actor(&self, player: PlayerId, operator: bool) -> Actor {
        Actor {
            id: player,
            operator,
            ignoring_claims: self.is_ignoring_claims(player),
        }
    }

    /// `actor` with the session's ignore-claims state applied.
    pub(super) fn effective_actor(&self, actor: &Actor) -> Actor {
        Actor {
            ignoring_claims: actor.ignoring_claims || self.is_ignoring_claims(actor.id),
            ..*actor
        }
    }
}
