//! Synchronization facade.
//!
//! Coordinates the transport, the cache store, the observer registry and
//! the unread counters for every team. Each team moves through an explicit
//! lifecycle:
//!
//! ```text
//! Uncached --subscribe/load_more--> Fetching --ok--> Cached
//!                                       \--err/cancel--> Uncached
//! ```
//!
//! A team in `Fetching` never gets a second initial fetch. Paging fetches
//! for the same team run one at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::cache::{CacheStore, InsertIntent};
use super::counts::{UnreadCountMap, UnreadCounts};
use super::errors::{ErrorReporter, LogErrorReporter, NotificationError};
use super::merge::merge;
use super::models::{Notification, NotificationFilters, Pagination, RealtimeEvent};
use super::observers::{Listener, ObserverRegistry, Snapshot, Subscription};
use super::transport::NotificationTransport;

pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Request lifecycle of a team's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamState {
    Uncached,
    Fetching,
    Cached,
}

type StateMap = Mutex<HashMap<String, TeamState>>;

/// Resets a team to `Uncached` unless the initial fetch completed, so a
/// failed or dropped fetch never leaves the team stuck in `Fetching`.
struct FetchGuard<'a> {
    states: &'a StateMap,
    team: &'a str,
    armed: bool,
}

impl FetchGuard<'_> {
    fn complete(mut self) {
        self.armed = false;
        set_state(self.states, self.team, TeamState::Cached);
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            set_state(self.states, self.team, TeamState::Uncached);
        }
    }
}

fn lock_states(states: &StateMap) -> std::sync::MutexGuard<'_, HashMap<String, TeamState>> {
    states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_state(states: &StateMap, team: &str, state: TeamState) {
    lock_states(states).insert(team.to_string(), state);
}

/// Session-scoped notification synchronization context.
///
/// Created once at start-up and shared by reference; independent instances
/// do not share any state.
pub struct NotificationSync {
    transport: Arc<dyn NotificationTransport>,
    observers: Arc<ObserverRegistry>,
    cache: CacheStore,
    counts: UnreadCounts,
    states: StateMap,
    /// team -> lock serializing paging fetches
    paging: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    reporter: Arc<dyn ErrorReporter>,
    page_size: u32,
}

impl NotificationSync {
    pub fn new(transport: Arc<dyn NotificationTransport>, page_size: u32) -> Self {
        let observers = Arc::new(ObserverRegistry::new());
        Self {
            transport,
            cache: CacheStore::new(Arc::clone(&observers)),
            observers,
            counts: UnreadCounts::new(),
            states: Mutex::new(HashMap::new()),
            paging: Mutex::new(HashMap::new()),
            reporter: Arc::new(LogErrorReporter),
            page_size: page_size.max(1),
        }
    }

    /// Replace the default tracing-based error reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Subscribe `listener` to the notifications of `team`.
    ///
    /// An already cached team delivers its snapshot right away with no
    /// network call. An uncached team triggers the initial fetch, and this
    /// call resolves once it settles. If another caller's fetch is already in
    /// flight, the listener is only registered and will receive that fetch's
    /// result. Fetch errors go to the error reporter.
    ///
    /// The initial fetch runs inside the future of the call that started it.
    /// Dropping that future cancels the fetch for every waiting listener and
    /// returns the team to `Uncached`. Those listeners stay registered and
    /// receive the result of the next fetch, started by the next `subscribe`
    /// or `load_more` for the team.
    pub async fn subscribe(&self, team: &str, listener: Listener) -> Subscription {
        let id = self.observers.register(team, Arc::clone(&listener));
        let subscription = Subscription::new(Arc::clone(&self.observers), team, id);

        match self.claim_initial_fetch(team) {
            TeamState::Cached => {
                if let Some(snapshot) = self.cache.snapshot(team) {
                    listener(snapshot);
                }
            }
            TeamState::Fetching => {
                debug!("Fetch already in flight for team {}, waiting on it", team);
            }
            TeamState::Uncached => {
                // Already reported, the team is left uncached for a retry.
                let _ = self.initial_fetch(team).await;
            }
        }

        subscription
    }

    /// Fetch the next page of history for `team`.
    ///
    /// An uncached team gets the same initial fetch as `subscribe`. Empty
    /// pages are fine and leave the cursor where it was; once history is
    /// exhausted further calls do nothing.
    pub async fn load_more(&self, team: &str) -> Result<(), NotificationError> {
        match self.claim_initial_fetch(team) {
            TeamState::Uncached => return self.initial_fetch(team).await,
            TeamState::Fetching => {
                debug!("Initial fetch in flight for team {}, skipping load_more", team);
                return Ok(());
            }
            TeamState::Cached => {}
        }

        let lock = self.paging_lock(team);
        let _paging = lock.lock().await;

        if self.cache.history_exhausted(team) {
            debug!("No more history for team {}", team);
            return Ok(());
        }

        let before = self.cache.oldest_paged_at(team);
        debug!("Loading more notifications for team {} before {:?}", team, before);
        let page = match self
            .transport
            .list(
                NotificationFilters::history(team, before),
                Some(Pagination::first(self.page_size)),
            )
            .await
        {
            Ok(page) => page,
            Err(err) => {
                self.reporter.report("load_more", &err);
                return Err(err);
            }
        };

        self.counts.apply_authoritative(&page.counts);
        self.cache.insert(
            team,
            &page.notifications,
            InsertIntent::Page {
                oldest: page.oldest_created_at(),
            },
        );
        Ok(())
    }

    /// Mark `notification` as viewed on the server.
    ///
    /// On success the returned record is merged into its team's cache,
    /// including while the team's initial fetch is still running, without
    /// touching the pagination cursor or the unread counter. A team that was
    /// never fetched gets no cache entry. On failure the cache is left as it
    /// was.
    pub async fn mark_viewed(
        &self,
        notification: &Notification,
    ) -> Result<Notification, NotificationError> {
        let updated = match self.transport.mark_viewed(notification).await {
            Ok(updated) => updated,
            Err(err) => {
                self.reporter.report("mark_viewed", &err);
                return Err(err);
            }
        };

        // A fetch still in flight merges on top of this record, and merge
        // never reverts `viewed_at`.
        if self.state(&updated.team) != TeamState::Uncached {
            self.cache.insert(
                &updated.team,
                std::slice::from_ref(&updated),
                InsertIntent::Refresh,
            );
        }
        Ok(updated)
    }

    /// Apply a real-time event.
    ///
    /// The unread counter moves first and unconditionally. If the team is
    /// cached or being fetched, the notification is then refetched by id and
    /// merged in.
    pub async fn apply_realtime_event(&self, event: &RealtimeEvent) {
        let data = event.data();
        match event {
            RealtimeEvent::NotificationCreated(_) => self.counts.increment(&data.team_id),
            RealtimeEvent::NotificationViewed(_) => self.counts.decrement(&data.team_id),
        }

        if self.state(&data.team_id) == TeamState::Uncached {
            debug!(
                "Team {} not cached, {} only adjusted the counter",
                data.team_id,
                event.event_type()
            );
            return;
        }

        let notification = match self.transport.get(&data.notification_id).await {
            Ok(notification) => notification,
            Err(err) => {
                self.reporter.report("refetch", &err);
                return;
            }
        };

        if notification.team != data.team_id {
            warn!(
                "Notification {} belongs to team {}, not {}; ignoring",
                notification.id, notification.team, data.team_id
            );
            return;
        }

        self.cache.insert(
            &data.team_id,
            std::slice::from_ref(&notification),
            InsertIntent::Refresh,
        );
    }

    /// Reactive view of the unread counts of every team.
    pub fn counts(&self) -> tokio::sync::watch::Receiver<UnreadCountMap> {
        self.counts.subscribe()
    }

    pub fn unread_count(&self, team: &str) -> u64 {
        self.counts.get(team)
    }

    pub fn snapshot(&self, team: &str) -> Option<Snapshot> {
        self.cache.snapshot(team)
    }

    pub fn oldest_paged_at(&self, team: &str) -> Option<DateTime<Utc>> {
        self.cache.oldest_paged_at(team)
    }

    pub fn state(&self, team: &str) -> TeamState {
        lock_states(&self.states)
            .get(team)
            .copied()
            .unwrap_or(TeamState::Uncached)
    }

    pub fn observer_count(&self, team: &str) -> usize {
        self.observers.observer_count(team)
    }

    /// Returns the state before the call. `Uncached` means the caller now
    /// owns the initial fetch and the team has been moved to `Fetching`.
    fn claim_initial_fetch(&self, team: &str) -> TeamState {
        let mut states = lock_states(&self.states);
        let state = states.get(team).copied().unwrap_or(TeamState::Uncached);
        if state == TeamState::Uncached {
            states.insert(team.to_string(), TeamState::Fetching);
        }
        state
    }

    /// Fetch unread and the first history page concurrently, merge them and
    /// mark the team cached. The team must already be `Fetching`.
    async fn initial_fetch(&self, team: &str) -> Result<(), NotificationError> {
        let guard = FetchGuard {
            states: &self.states,
            team,
            armed: true,
        };
        info!("Fetching notifications for team {}", team);

        let result = tokio::try_join!(
            self.transport.list(NotificationFilters::unread(team), None),
            self.transport.list(
                NotificationFilters::history(team, None),
                Some(Pagination::first(self.page_size)),
            ),
        );
        let (unread, page) = match result {
            Ok(lists) => lists,
            Err(err) => {
                drop(guard);
                self.reporter.report("fetch", &err);
                return Err(err);
            }
        };

        self.counts.apply_authoritative(&unread.counts);
        self.counts.apply_authoritative(&page.counts);

        let combined = merge(&unread.notifications, &page.notifications);
        // Cached before the insert so a subscriber registering in between
        // is still part of the fan-out.
        guard.complete();
        let snapshot = self.cache.insert(
            team,
            &combined,
            InsertIntent::Page {
                oldest: page.oldest_created_at(),
            },
        );
        info!(
            "Cached {} notifications for team {} ({} unread)",
            snapshot.len(),
            team,
            self.counts.get(team)
        );
        Ok(())
    }

    fn paging_lock(&self, team: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut paging = self
            .paging
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(paging.entry(team.to_string()).or_default())
    }
}
