use crate::stores::{IncidentPatch, IncidentStore, ProfileStore};
use models::IncidentChange;
use notifications::{PushSender, messages};

/// Terminal state of a `StatusPushNotifier` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPushOutcome {
    /// Status didn't change, and nothing was done.
    Unchanged,
    NoVictimPhone,
    NoProfile,
    NoPushToken,
    ProfileLookupFailed,
    DeliveryFailed,
    /// Notified, but the incident couldn't be marked as such.
    NotifiedUnrecorded,
    Notified,
}

/// Pushes a status update to the victim whenever their incident changes status.
#[derive(Debug)]
pub struct StatusPushNotifier<S, P> {
    store: S,
    push: P,
}

impl<S: IncidentStore + ProfileStore, P: PushSender> StatusPushNotifier<S, P> {
    pub fn new(store: S, push: P) -> Self {
        Self { store, push }
    }

    #[tracing::instrument(skip_all, fields(incident_id = %change.incident_id))]
    pub async fn on_incident_updated(&self, change: &IncidentChange) -> StatusPushOutcome {
        let Some(transition) = change.status_transition() else {
            tracing::debug!("status unchanged, skipping notification");
            return StatusPushOutcome::Unchanged;
        };
        let Some(phone) = change.after.victim_phone() else {
            tracing::debug!("incident has no victim phone number");
            return StatusPushOutcome::NoVictimPhone;
        };

        let profile = match self.store.fetch_profile(phone).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::debug!("victim has no profile");
                return StatusPushOutcome::NoProfile;
            }
            Err(error) => {
                tracing::error!(?error, "failed to fetch victim profile");
                return StatusPushOutcome::ProfileLookupFailed;
            }
        };
        let Some(token) = profile.push_token() else {
            tracing::debug!("victim has no push token");
            return StatusPushOutcome::NoPushToken;
        };

        let message = messages::status_update(token, &change.incident_id, transition.to);
        if let Err(error) = self.push.send(message).await {
            tracing::warn!(?error, status = %transition.to, "failed to push status update");
            return StatusPushOutcome::DeliveryFailed;
        }

        let patch = IncidentPatch::Notified {
            status: transition.to.clone(),
        };
        if let Err(error) = self.store.update_incident(&change.incident_id, patch).await {
            tracing::error!(?error, "failed to mark incident as notified");
            return StatusPushOutcome::NotifiedUnrecorded;
        }

        tracing::info!(from = %transition.from, to = %transition.to, "pushed status update");
        StatusPushOutcome::Notified
    }
}
