//! Notification data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A team-scoped notification as returned by the notifications API.
///
/// Everything except `viewed_at` is fixed once the notification exists.
/// `viewed_at` only ever moves from `None` to `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "teamId")]
    pub team: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub viewed_at: Option<DateTime<Utc>>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub context_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.viewed_at.is_none()
    }
}

/// Filters accepted by a list request. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilters {
    #[serde(rename = "teamId", skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewed: Option<bool>,
    /// Exclusive upper bound on `createdAt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,
    /// Exclusive lower bound on `createdAt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<DateTime<Utc>>,
}

impl NotificationFilters {
    /// Every unread notification of a team.
    pub fn unread(team: &str) -> Self {
        Self {
            team: Some(team.to_string()),
            viewed: Some(false),
            ..Default::default()
        }
    }

    /// A page of the full history of a team, optionally older than `before`.
    pub fn history(team: &str, before: Option<DateTime<Utc>>) -> Self {
        Self {
            team: Some(team.to_string()),
            before,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn first(per_page: u32) -> Self {
        Self { page: 0, per_page }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.per_page)
    }
}

/// Unread totals attached to every list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationCounts {
    #[serde(default)]
    pub total: u64,
    /// Unread count per team id.
    #[serde(default)]
    pub teams: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub counts: NotificationCounts,
}

impl NotificationList {
    /// Oldest `created_at` in this batch, if it has any notification.
    pub fn oldest_created_at(&self) -> Option<DateTime<Utc>> {
        self.notifications.iter().map(|n| n.created_at).min()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEventData {
    pub team_id: String,
    pub notification_id: String,
}

/// Real-time events pushed by the server.
///
/// Serialized adjacently tagged: `{"type": "notificationCreated", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RealtimeEvent {
    NotificationCreated(RealtimeEventData),
    NotificationViewed(RealtimeEventData),
}

impl RealtimeEvent {
    pub fn data(&self) -> &RealtimeEventData {
        match self {
            RealtimeEvent::NotificationCreated(data) | RealtimeEvent::NotificationViewed(data) => {
                data
            }
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            RealtimeEvent::NotificationCreated(_) => "notificationCreated",
            RealtimeEvent::NotificationViewed(_) => "notificationViewed",
        }
    }
}

/// Returns a copy of `notifications` ordered by `created_at`, newest first.
pub fn sorted_newest_first(notifications: &[Notification]) -> Vec<Notification> {
    let mut sorted = notifications.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}
