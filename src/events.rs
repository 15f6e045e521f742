//! Hooks towards the host: player notifications and vetoable claim events.

use colored::Colorize;
use log::info;

use crate::flags::Owner;
use crate::geometry::Bounds;
use crate::player::PlayerId;
use crate::region::RegionId;

/// Delivers a message to a player.
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: PlayerId, message: &str);
}

/// Writes notifications to the server log.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: PlayerId, message: &str) {
        info!("[{}] {}", recipient.to_string().cyan(), message);
    }
}

/// A claim change about to be committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimEvent<'a> {
    Creating {
        world: &'a str,
        bounds: Bounds,
        owner: Owner,
        parent: Option<RegionId>,
    },
    Resizing {
        world: &'a str,
        region: RegionId,
        from: Bounds,
        to: Bounds,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Allow,
    Deny(String),
}

/// Runs host policy on claim changes. Called while the claim state is locked, so a listener
/// must not call back into the `DataManager`.
pub trait ClaimListener: Send + Sync {
    fn on_claim_event(&self, event: &ClaimEvent<'_>) -> EventOutcome;
}

impl<F> ClaimListener for F
where
    F: Fn(&ClaimEvent<'_>) -> EventOutcome + Send + Sync,
{
    fn on_claim_event(&self, event: &ClaimEvent<'_>) -> EventOutcome {
        self(event)
    }
}
