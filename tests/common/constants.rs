//! Shared constants for notification sync tests

pub const TEAM_1: &str = "t1";
pub const TEAM_2: &str = "t2";

/// Unread, newest in the base scenario.
pub const NOTIFICATION_A: &str = "A";
/// Already read.
pub const NOTIFICATION_B: &str = "B";
/// Older than B, only reachable through paging.
pub const NOTIFICATION_C: &str = "C";
/// Created later through a real-time event.
pub const NOTIFICATION_D: &str = "D";

pub const CREATED_A: i64 = 1_700_000_300;
pub const CREATED_B: i64 = 1_700_000_200;
pub const CREATED_C: i64 = 1_700_000_100;
pub const CREATED_D: i64 = 1_700_000_400;
