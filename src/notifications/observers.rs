//! Observer registry.
//!
//! Tracks the callbacks subscribed to each team, in registration order, and
//! fans out collection snapshots to them. Fan-out iterates over a copy of
//! the listener list so callbacks may unsubscribe themselves or others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::models::Notification;

/// Shared, immutable view of a team's cached collection.
pub type Snapshot = Arc<Vec<Notification>>;

/// Callback invoked with the full collection of a team whenever it changes.
pub type Listener = Arc<dyn Fn(Snapshot) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    listener: Listener,
}

#[derive(Default)]
pub struct ObserverRegistry {
    /// team -> listeners in registration order
    listeners: Mutex<HashMap<String, Vec<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `team`. Returns the id used to remove it.
    pub fn register(&self, team: &str, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.lock();
        listeners
            .entry(team.to_string())
            .or_default()
            .push(ListenerEntry { id, listener });
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    ///
    /// Returns whether a listener was actually removed.
    pub fn remove(&self, team: &str, id: u64) -> bool {
        let mut listeners = self.lock();
        let Some(team_listeners) = listeners.get_mut(team) else {
            return false;
        };
        let before = team_listeners.len();
        team_listeners.retain(|entry| entry.id != id);
        let removed = team_listeners.len() != before;
        if team_listeners.is_empty() {
            listeners.remove(team);
        }
        removed
    }

    /// Invoke every listener of `team` with the same snapshot.
    pub fn notify(&self, team: &str, snapshot: &Snapshot) {
        let targets: Vec<Listener> = {
            let listeners = self.lock();
            match listeners.get(team) {
                Some(team_listeners) => team_listeners
                    .iter()
                    .map(|entry| Arc::clone(&entry.listener))
                    .collect(),
                None => return,
            }
        };

        debug!(
            "Notifying {} observers of team {} ({} notifications)",
            targets.len(),
            team,
            snapshot.len()
        );
        for listener in targets {
            listener(Arc::clone(snapshot));
        }
    }

    pub fn observer_count(&self, team: &str) -> usize {
        self.lock().get(team).map(Vec::len).unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<ListenerEntry>>> {
        // Listeners run outside the lock, so a poisoned map is still consistent.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle returned by a subscription. `unsubscribe` may be called any
/// number of times; only the first call has an effect.
pub struct Subscription {
    registry: Arc<ObserverRegistry>,
    team: String,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(registry: Arc<ObserverRegistry>, team: &str, id: u64) -> Self {
        Self {
            registry,
            team: team.to_string(),
            id,
            active: AtomicBool::new(true),
        }
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.registry.remove(&self.team, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("team", &self.team)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
