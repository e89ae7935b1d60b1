//! Data model shared by the dispatch agent and its notification senders.
//!
//! Incidents live in the primary store and are keyed by incident id.
//! Responders and user profiles are read-only directory entries from the
//! perspective of this workspace: they are maintained by the mobile clients.
mod change;
mod directory;
mod incident;

pub use change::{IncidentChange, StatusTransition};
pub use directory::{Responder, UserProfile};
pub use incident::{IncidentRecord, IncidentStatus, LastNotification, SmsDetails, SmsStatus};

/// Returns `Some(value)` only if `value` holds something other than whitespace.
/// Blank strings written by clients are treated the same as absent ones.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
