//! Notification Sync Library
//!
//! In-memory, per-session cache that keeps team notification lists in sync
//! with a remote notifications API and fans changes out to observers.

pub mod config;
pub mod notifications;

// Re-export commonly used types for convenience
pub use notifications::{
    HttpNotificationTransport, Notification, NotificationError, NotificationSync,
    NotificationTransport, RealtimeEvent, Subscription, TeamState,
};
