//! Invokes the trigger handlers for every write to an incident.
//!
//! The `incidents` table carries an `after update` trigger which publishes
//! the incident id with its before and after rows to `INCIDENT_UPDATES_CHANNEL`.
use crate::dispatch::{StatusPushNotifier, StatusPushOutcome, StatusSynchronizer, SyncOutcome};
use crate::stores::{IncidentStore, MirrorStore, ProfileStore};
use anyhow::Context;
use models::IncidentChange;
use notifications::PushSender;
use sqlx::postgres::PgListener;
use std::sync::Arc;

pub const INCIDENT_UPDATES_CHANNEL: &str = "incident_updates";

/// The handlers invoked for each incident change.
#[derive(Debug)]
pub struct IncidentTriggers<S, P, M> {
    pub status_push: StatusPushNotifier<S, P>,
    pub status_sync: StatusSynchronizer<M>,
}

impl<S, P, M> IncidentTriggers<S, P, M>
where
    S: IncidentStore + ProfileStore,
    P: PushSender,
    M: MirrorStore,
{
    /// Run both handlers concurrently. Neither observes the other's outcome.
    pub async fn dispatch(&self, change: IncidentChange) -> (StatusPushOutcome, SyncOutcome) {
        tokio::join!(
            self.status_push.on_incident_updated(&change),
            self.status_sync.on_incident_updated(&change),
        )
    }
}

pub fn decode_change(payload: &str) -> anyhow::Result<IncidentChange> {
    serde_json::from_str(payload).context("decoding incident change notification")
}

/// Listen for incident changes until `exit` resolves, spawning a dispatch of each.
pub async fn serve<S, P, M, E>(
    triggers: Arc<IncidentTriggers<S, P, M>>,
    pg_pool: sqlx::PgPool,
    exit: E,
) -> anyhow::Result<()>
where
    S: IncidentStore + ProfileStore,
    P: PushSender,
    M: MirrorStore,
    E: std::future::Future<Output = ()> + Send,
{
    let mut listener = PgListener::connect_with(&pg_pool)
        .await
        .context("connecting incident change listener")?;
    listener.listen(INCIDENT_UPDATES_CHANNEL).await?;

    tokio::pin!(exit);

    loop {
        let maybe_notification = tokio::select! {
            _ = &mut exit => {
                tracing::debug!("caught signal; no longer listening for incident changes");
                return Ok(());
            }
            notification = listener.try_recv() => notification.context("receiving incident change")?,
        };

        // try_recv returns None when the connection was lost. The listener
        // reconnects on the next call, but notifications sent meanwhile are missed.
        let Some(notification) = maybe_notification else {
            tracing::warn!("LISTEN/NOTIFY stream from postgres lost, attempting to reconnect");
            continue;
        };

        let change = match decode_change(notification.payload()) {
            Ok(change) => change,
            Err(error) => {
                tracing::warn!(?error, payload = notification.payload(), "skipping incident change");
                continue;
            }
        };
        tracing::debug!(incident_id = %change.incident_id, "received incident change");

        let triggers = triggers.clone();
        tokio::spawn(async move {
            triggers.dispatch(change).await;
        });
    }
}
