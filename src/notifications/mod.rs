//! Team-scoped notification synchronization

mod cache;
mod counts;
mod errors;
mod merge;
mod models;
mod observers;
mod sync;
mod transport;

pub use cache::{CacheStore, InsertIntent};
pub use counts::{UnreadCountMap, UnreadCounts};
pub use errors::{ErrorReporter, LogErrorReporter, NotificationError};
pub use merge::merge;
pub use models::{
    sorted_newest_first, Notification, NotificationCounts, NotificationFilters, NotificationList,
    Pagination, RealtimeEvent, RealtimeEventData,
};
pub use observers::{Listener, ObserverRegistry, Snapshot, Subscription};
pub use sync::{NotificationSync, TeamState, DEFAULT_PAGE_SIZE};
pub use transport::{HttpNotificationTransport, NotificationTransport, TransportResult};

#[cfg(feature = "mock")]
pub use transport::MockNotificationTransport;
