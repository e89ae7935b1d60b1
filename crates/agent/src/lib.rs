//! The dispatch agent fans emergency alerts out to responders and emergency
//! contacts, and keeps victims and live-tracking clients informed as their
//! incident changes status.
//!
//! It has four independent entry points:
//!
//! - `ResponderNotifier` and `ContactSmsBroadcaster` are callable over HTTP
//!   (see `api`), and require an authenticated caller.
//! - `StatusPushNotifier` and `StatusSynchronizer` are invoked for every
//!   write to an incident (see `triggers`), and react only to status changes.
//!
//! None of them share in-memory state. Their only coupling is the incident
//! record they read and write through `stores`.
pub mod api;
pub mod dispatch;
mod error;
pub mod stores;
pub mod triggers;

pub use dispatch::{
    Archiver, ContactSmsBroadcaster, ResponderNotifier, StatusPushNotifier, StatusPushOutcome,
    StatusSynchronizer, SyncOutcome,
};
pub use error::DispatchError;

/// Verified identity of the caller of a callable handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub uid: String,
}
