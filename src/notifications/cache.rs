//! Per-team notification cache.
//!
//! `insert` is the only writer. It merges rather than replaces, moves the
//! pagination cursor only for contiguous paged batches, and hands the new
//! collection to the observer registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::merge::merge;
use super::models::Notification;
use super::observers::{ObserverRegistry, Snapshot};

/// How an inserted batch relates to the team's paged history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertIntent {
    /// Batch came from a contiguous paged fetch whose oldest entry is
    /// `oldest`. `None` means the page was empty.
    Page { oldest: Option<DateTime<Utc>> },
    /// Unread-only results, a single refetch or a mark-viewed response.
    /// Never touches the cursor.
    Refresh,
}

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    notifications: Snapshot,
    oldest_paged_at: Option<DateTime<Utc>>,
    /// Set once a paged fetch came back empty.
    history_exhausted: bool,
}

pub struct CacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    observers: Arc<ObserverRegistry>,
}

impl CacheStore {
    pub fn new(observers: Arc<ObserverRegistry>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            observers,
        }
    }

    /// Merge `incoming` into the team's collection and notify its observers.
    ///
    /// Creates the entry if the team was never cached. Returns the new
    /// collection.
    pub fn insert(&self, team: &str, incoming: &[Notification], intent: InsertIntent) -> Snapshot {
        let snapshot = {
            let mut entries = self.lock();
            let entry = entries.entry(team.to_string()).or_default();
            entry.notifications = Arc::new(merge(&entry.notifications, incoming));

            match intent {
                InsertIntent::Page {
                    oldest: Some(oldest),
                } => {
                    // The cursor only moves back in time.
                    let advanced = match entry.oldest_paged_at {
                        Some(current) if current <= oldest => current,
                        _ => oldest,
                    };
                    if entry.oldest_paged_at != Some(advanced) {
                        debug!("Pagination cursor of team {} moved to {}", team, advanced);
                    }
                    entry.oldest_paged_at = Some(advanced);
                }
                InsertIntent::Page { oldest: None } => entry.history_exhausted = true,
                InsertIntent::Refresh => {}
            }

            Arc::clone(&entry.notifications)
        };

        self.observers.notify(team, &snapshot);
        snapshot
    }

    pub fn contains(&self, team: &str) -> bool {
        self.lock().contains_key(team)
    }

    pub fn snapshot(&self, team: &str) -> Option<Snapshot> {
        self.lock()
            .get(team)
            .map(|entry| Arc::clone(&entry.notifications))
    }

    pub fn oldest_paged_at(&self, team: &str) -> Option<DateTime<Utc>> {
        self.lock().get(team).and_then(|entry| entry.oldest_paged_at)
    }

    pub fn history_exhausted(&self, team: &str) -> bool {
        self.lock()
            .get(team)
            .map(|entry| entry.history_exhausted)
            .unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
