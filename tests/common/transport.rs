//! In-memory notifications API

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notification_sync::notifications::{
    ErrorReporter, Notification, NotificationCounts, NotificationError, NotificationFilters,
    NotificationList, NotificationSync, NotificationTransport, Pagination, TransportResult,
};

use super::constants::*;
use super::fixtures::{at, notification, read_notification, RecordingReporter};

/// Fake server holding notifications by id.
///
/// Every call yields before answering so that concurrent facade operations
/// interleave the way real network round-trips do. List results are taken
/// when the request arrives, so a slow list can answer with stale data.
#[derive(Default)]
pub struct FakeTransport {
    notifications: Mutex<HashMap<String, Notification>>,
    call_counts: Mutex<HashMap<String, usize>>,
    list_requests: Mutex<Vec<(NotificationFilters, Option<Pagination>)>>,
    fail_list: AtomicBool,
    fail_get: AtomicBool,
    fail_mark_viewed: AtomicBool,
    /// Extra yields before a list answers.
    list_delay: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A (unread), B (read) and C (read, older) in team t1.
    pub fn with_scenario() -> Arc<Self> {
        let transport = Self::new();
        transport.add(notification(NOTIFICATION_A, TEAM_1, CREATED_A));
        transport.add(read_notification(NOTIFICATION_B, TEAM_1, CREATED_B));
        transport.add(read_notification(NOTIFICATION_C, TEAM_1, CREATED_C));
        transport
    }

    /// Facade over this transport with a recording error reporter.
    pub fn sync(self: &Arc<Self>, page_size: u32) -> (NotificationSync, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        let sync = NotificationSync::new(Arc::clone(self) as Arc<dyn NotificationTransport>, page_size)
            .with_reporter(Arc::clone(&reporter) as Arc<dyn ErrorReporter>);
        (sync, reporter)
    }

    pub fn add(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap()
            .insert(notification.id.clone(), notification);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_mark_viewed(&self, fail: bool) {
        self.fail_mark_viewed.store(fail, Ordering::SeqCst);
    }

    /// Make list requests take `yields` extra scheduler turns to answer.
    pub fn set_list_delay(&self, yields: usize) {
        self.list_delay.store(yields, Ordering::SeqCst);
    }

    pub fn get_call_count(&self, method: &str) -> usize {
        *self.call_counts.lock().unwrap().get(method).unwrap_or(&0)
    }

    /// `before` cursors of every paginated list request, in order.
    pub fn paged_befores(&self) -> Vec<Option<DateTime<Utc>>> {
        self.list_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, pagination)| pagination.is_some())
            .map(|(filters, _)| filters.before)
            .collect()
    }

    fn increment_call(&self, method: &str) {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(method.to_string()).or_insert(0) += 1;
    }

    fn answer_list(
        &self,
        filters: &NotificationFilters,
        pagination: Option<Pagination>,
    ) -> NotificationList {
        let mut matching: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .values()
            .filter(|n| filters.team.as_deref().map_or(true, |team| n.team == team))
            .filter(|n| filters.viewed.map_or(true, |viewed| n.is_unread() != viewed))
            .filter(|n| filters.before.map_or(true, |before| n.created_at < before))
            .filter(|n| filters.after.map_or(true, |after| n.created_at > after))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(pagination) = pagination {
            matching = matching
                .into_iter()
                .skip(pagination.offset() as usize)
                .take(pagination.per_page as usize)
                .collect();
        }

        NotificationList {
            notifications: matching,
            counts: self.unread_counts(),
        }
    }

    fn unread_counts(&self) -> NotificationCounts {
        let mut teams: HashMap<String, u64> = HashMap::new();
        for n in self.notifications.lock().unwrap().values() {
            let count = teams.entry(n.team.clone()).or_insert(0);
            if n.is_unread() {
                *count += 1;
            }
        }
        NotificationCounts {
            total: teams.values().sum(),
            teams,
        }
    }
}

#[async_trait]
impl NotificationTransport for FakeTransport {
    async fn list(
        &self,
        filters: NotificationFilters,
        pagination: Option<Pagination>,
    ) -> TransportResult<NotificationList> {
        self.increment_call("list");
        self.list_requests
            .lock()
            .unwrap()
            .push((filters.clone(), pagination));
        let fail = self.fail_list.load(Ordering::SeqCst);
        let response = self.answer_list(&filters, pagination);

        tokio::task::yield_now().await;
        for _ in 0..self.list_delay.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        if fail {
            return Err(anyhow::anyhow!("connection refused").into());
        }
        Ok(response)
    }

    async fn get(&self, id: &str) -> TransportResult<Notification> {
        self.increment_call("get");
        tokio::task::yield_now().await;

        if self.fail_get.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection reset").into());
        }
        self.notifications
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| NotificationError::NotFound(id.to_string()))
    }

    async fn mark_viewed(&self, notification: &Notification) -> TransportResult<Notification> {
        self.increment_call("mark_viewed");
        tokio::task::yield_now().await;

        if self.fail_mark_viewed.load(Ordering::SeqCst) {
            return Err(NotificationError::Status {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        let mut notifications = self.notifications.lock().unwrap();
        let stored = notifications
            .get_mut(&notification.id)
            .ok_or_else(|| NotificationError::NotFound(notification.id.clone()))?;
        if stored.viewed_at.is_none() {
            stored.viewed_at = Some(at(CREATED_D + 100));
        }
        Ok(stored.clone())
    }
}
