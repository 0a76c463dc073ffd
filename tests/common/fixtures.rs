//! Notification builders and recording helpers

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use notification_sync::notifications::{
    ErrorReporter, Listener, Notification, NotificationError, Snapshot,
};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn notification(id: &str, team: &str, created_secs: i64) -> Notification {
    Notification {
        id: id.to_string(),
        team: team.to_string(),
        created_at: at(created_secs),
        viewed_at: None,
        title: format!("Notification {}", id),
        content: Some(format!("Content of {}", id)),
        link: Some(format!("/doc/{}", id.to_lowercase())),
        context: None,
        context_type: Some("document".to_string()),
        source: Some("user-1".to_string()),
        target: Some("user-2".to_string()),
    }
}

pub fn read_notification(id: &str, team: &str, created_secs: i64) -> Notification {
    Notification {
        viewed_at: Some(at(created_secs + 10)),
        ..notification(id, team, created_secs)
    }
}

/// Every snapshot a listener received, in order.
#[derive(Clone, Default)]
pub struct RecordedCalls(Arc<Mutex<Vec<Snapshot>>>);

impl RecordedCalls {
    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.0.lock().unwrap().last().cloned()
    }

    pub fn last_ids(&self) -> Vec<String> {
        self.last()
            .map(|snapshot| snapshot.iter().map(|n| n.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<Snapshot> {
        self.0.lock().unwrap().clone()
    }
}

pub fn recording_listener() -> (Listener, RecordedCalls) {
    let calls = RecordedCalls::default();
    let sink = calls.clone();
    let listener: Listener = Arc::new(move |snapshot: Snapshot| {
        sink.0.lock().unwrap().push(snapshot);
    });
    (listener, calls)
}

/// Error reporter that keeps the operation name and message of every report.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    pub fn operations(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(operation, _)| operation.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, operation: &str, error: &NotificationError) {
        self.reports
            .lock()
            .unwrap()
            .push((operation.to_string(), error.to_string()));
    }
}
