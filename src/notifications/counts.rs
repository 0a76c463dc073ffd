//! Unread-count tracker.
//!
//! Two independent update channels feed the same map: authoritative
//! overwrites from list responses and +1/-1 adjustments from real-time
//! events. Overwrites correct whatever drift the adjustments accumulate.

use std::collections::HashMap;

use tokio::sync::watch;

use super::models::NotificationCounts;

pub type UnreadCountMap = HashMap<String, u64>;

pub struct UnreadCounts {
    sender: watch::Sender<UnreadCountMap>,
}

impl Default for UnreadCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl UnreadCounts {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(HashMap::new());
        Self { sender }
    }

    /// Reactive read-only view of the whole map.
    pub fn subscribe(&self) -> watch::Receiver<UnreadCountMap> {
        self.sender.subscribe()
    }

    pub fn get(&self, team: &str) -> u64 {
        self.sender.borrow().get(team).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> UnreadCountMap {
        self.sender.borrow().clone()
    }

    /// Overwrite every team present in a list response's counts.
    pub fn apply_authoritative(&self, counts: &NotificationCounts) {
        if counts.teams.is_empty() {
            return;
        }
        self.sender.send_modify(|map| {
            for (team, count) in &counts.teams {
                map.insert(team.clone(), *count);
            }
        });
    }

    pub fn increment(&self, team: &str) {
        self.sender.send_modify(|map| {
            *map.entry(team.to_string()).or_insert(0) += 1;
        });
    }

    /// Decrement, never going below zero.
    pub fn decrement(&self, team: &str) {
        self.sender.send_modify(|map| {
            let count = map.entry(team.to_string()).or_insert(0);
            *count = count.saturating_sub(1);
        });
    }
}
