//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakeTransport, TEAM_1};
//!
//! #[tokio::test]
//! async fn test_subscribe() {
//!     let transport = FakeTransport::with_scenario();
//!     let (sync, _reporter) = transport.sync(2);
//!     let (listener, calls) = common::recording_listener();
//!     let _sub = sync.subscribe(TEAM_1, listener).await;
//!     assert_eq!(calls.count(), 1);
//! }
//! ```
#![allow(dead_code)]

mod constants;
mod fixtures;
mod transport;

pub use constants::*;
pub use fixtures::{at, notification, read_notification, recording_listener, RecordedCalls, RecordingReporter};
pub use transport::FakeTransport;
