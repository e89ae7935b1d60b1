//! Capability interfaces of the backing stores, and their implementations.
//!
//! Each handler depends only on the capabilities it uses, so any of them may
//! be substituted independently. `memory` holds in-process implementations
//! which back the test suite, and is built only for tests or with the
//! `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
mod postgres;
mod realtime;

pub use postgres::PgStore;
pub use realtime::RealtimeMirror;

use models::{IncidentStatus, Responder, SmsStatus, UserProfile};
use std::collections::BTreeMap;

/// Namespace of the mirror holding incidents which are still being tracked.
pub const ACTIVE_NAMESPACE: &str = "active_sos";
/// Namespace of the mirror holding resolved incidents.
pub const ARCHIVED_NAMESPACE: &str = "archived_sos";

/// A named subset of incident fields written by the agent.
///
/// Stores apply a patch as a field-level update of an existing incident, and
/// never as a full overwrite. The patch's timestamp is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentPatch {
    /// Outcome of broadcasting SMS to the victim's emergency contacts.
    SmsOutcome {
        sent: bool,
        status: SmsStatus,
        successful_numbers: Vec<String>,
        failed_numbers: BTreeMap<String, String>,
    },
    /// The victim was notified that their incident reached `status`.
    Notified { status: IncidentStatus },
}

/// Selects responders from the directory. Unset criteria match everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponderFilter {
    /// Service the responder must offer.
    pub service: Option<String>,
    /// Region the responder must operate within.
    pub state: Option<String>,
}

impl ResponderFilter {
    pub fn matches(&self, responder: &Responder) -> bool {
        self.service.as_deref().map_or(true, |s| responder.offers(s))
            && self
                .state
                .as_deref()
                .map_or(true, |s| responder.state.as_deref() == Some(s))
    }
}

pub trait IncidentStore: Send + Sync + 'static {
    /// Apply `patch` to the incident, failing if the incident doesn't exist.
    fn update_incident<'s>(
        &'s self,
        incident_id: &'s str,
        patch: IncidentPatch,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;
}

pub trait ResponderDirectory: Send + Sync + 'static {
    fn find_responders<'s>(
        &'s self,
        filter: &'s ResponderFilter,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<Responder>>> + Send + 's;
}

pub trait ProfileStore: Send + Sync + 'static {
    fn fetch_profile<'s>(
        &'s self,
        phone_number: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<UserProfile>>> + Send + 's;
}

/// Entry of the mirror, as an open-ended JSON object. Live-tracking clients
/// may write fields beyond the status, and these are preserved on archival.
pub type MirrorEntry = serde_json::Map<String, serde_json::Value>;

/// The low-latency mirror of incident status, with "active" and "archived" namespaces.
///
/// Implementations are cheap to clone, as removals are scheduled to run
/// after the triggering invocation has completed.
pub trait MirrorStore: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Set the status of the active entry, creating the entry if needed.
    fn set_active_status<'s>(
        &'s self,
        incident_id: &'s str,
        status: &'s IncidentStatus,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;

    fn read_active<'s>(
        &'s self,
        incident_id: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<MirrorEntry>>> + Send + 's;

    /// Write the archived entry, stamping its `resolvedAt` with the store's clock.
    fn put_archived<'s>(
        &'s self,
        incident_id: &'s str,
        entry: MirrorEntry,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;

    fn remove_active<'s>(
        &'s self,
        incident_id: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;
}
