//! Merge-by-id of notification collections.

use std::collections::HashMap;

use super::models::Notification;

/// Combines `existing` and `incoming` so that every id appears exactly once.
///
/// For an id present in both, the incoming record replaces the existing one
/// in its original position. Ids only in `incoming` are appended in incoming
/// order. A record that is already viewed never becomes unread again, even
/// if a stale incoming copy lacks `viewed_at`.
pub fn merge(existing: &[Notification], incoming: &[Notification]) -> Vec<Notification> {
    let mut merged: Vec<Notification> = Vec::with_capacity(existing.len() + incoming.len());
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(merged.capacity());

    for notification in existing.iter().chain(incoming) {
        match positions.get(notification.id.as_str()) {
            Some(&index) => {
                let previous_viewed_at = merged[index].viewed_at;
                merged[index] = notification.clone();
                if merged[index].viewed_at.is_none() {
                    merged[index].viewed_at = previous_viewed_at;
                }
            }
            None => {
                positions.insert(notification.id.as_str(), merged.len());
                merged.push(notification.clone());
            }
        }
    }

    merged
}
