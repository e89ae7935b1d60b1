use super::Archiver;
use crate::stores::MirrorStore;
use anyhow::Context;
use models::{IncidentChange, IncidentStatus};

/// Terminal state of a `StatusSynchronizer` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    /// The new status was written to the active namespace.
    Mirrored,
    /// The incident was resolved, copied to the archive, and its active
    /// entry is scheduled for removal.
    Archived,
    /// The incident was resolved, but its active entry was already gone.
    ResolvedWithoutActiveEntry,
    Failed,
}

/// Mirrors incident status into the low-latency mirror store, archiving
/// incidents as they're resolved. The primary store is never written.
#[derive(Debug)]
pub struct StatusSynchronizer<M> {
    mirror: M,
    archiver: Archiver,
}

impl<M: MirrorStore> StatusSynchronizer<M> {
    pub fn new(mirror: M, archiver: Archiver) -> Self {
        Self { mirror, archiver }
    }

    #[tracing::instrument(skip_all, fields(incident_id = %change.incident_id))]
    pub async fn on_incident_updated(&self, change: &IncidentChange) -> SyncOutcome {
        let Some(transition) = change.status_transition() else {
            return SyncOutcome::Unchanged;
        };

        match self.try_sync(&change.incident_id, transition.to).await {
            Ok(outcome) => {
                tracing::info!(to = %transition.to, ?outcome, "synchronized incident status");
                outcome
            }
            Err(error) => {
                tracing::error!(?error, to = %transition.to, "failed to synchronize incident status");
                SyncOutcome::Failed
            }
        }
    }

    async fn try_sync(&self, incident_id: &str, status: &IncidentStatus) -> anyhow::Result<SyncOutcome> {
        self.mirror
            .set_active_status(incident_id, status)
            .await
            .context("writing active status")?;

        if !status.is_terminal() {
            return Ok(SyncOutcome::Mirrored);
        }

        let Some(mut entry) = self
            .mirror
            .read_active(incident_id)
            .await
            .context("reading active entry")?
        else {
            tracing::warn!("resolved incident has no active entry to archive");
            return Ok(SyncOutcome::ResolvedWithoutActiveEntry);
        };
        entry.insert(
            "status".to_string(),
            IncidentStatus::Resolved.to_string().into(),
        );

        self.mirror
            .put_archived(incident_id, entry)
            .await
            .context("writing archived entry")?;

        self.archiver
            .schedule_removal(self.mirror.clone(), incident_id.to_string());

        Ok(SyncOutcome::Archived)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stores::memory::{MemoryMirror, MirrorOp};
    use models::IncidentRecord;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::{Instant, advance};

    fn change(from: IncidentStatus, to: IncidentStatus) -> IncidentChange {
        let record = |status| IncidentRecord {
            id: "sos-1".to_string(),
            status,
            ..Default::default()
        };
        IncidentChange {
            incident_id: "sos-1".to_string(),
            before: record(from),
            after: record(to),
        }
    }

    fn tracked_mirror() -> MemoryMirror {
        let mirror = MemoryMirror::default();
        let serde_json::Value::Object(entry) =
            json!({"status": "RESPONDING", "latitude": 38.5816, "responderId": "r1"})
        else {
            unreachable!()
        };
        mirror.insert_active("sos-1", entry);
        mirror
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_archives_then_removes_after_delay() {
        let mirror = tracked_mirror();
        let archiver = Archiver::default();
        let synchronizer = StatusSynchronizer::new(mirror.clone(), archiver.clone());
        let start = Instant::now();

        let outcome = synchronizer
            .on_incident_updated(&change(IncidentStatus::Responding, IncidentStatus::Resolved))
            .await;
        assert_eq!(outcome, SyncOutcome::Archived);

        assert_eq!(
            mirror.ops(),
            vec![
                MirrorOp::SetActiveStatus("sos-1".to_string(), "RESOLVED".to_string()),
                MirrorOp::ReadActive("sos-1".to_string()),
                MirrorOp::PutArchived("sos-1".to_string()),
            ]
        );

        let mut archived = mirror.archived("sos-1").unwrap();
        assert!(archived.remove("resolvedAt").is_some());
        insta::assert_json_snapshot!(archived, @r###"
        {
          "latitude": 38.5816,
          "responderId": "r1",
          "status": "RESOLVED"
        }
        "###);

        // Removal is scheduled, but not yet run.
        assert_eq!(archiver.pending(), 1);
        tokio::task::yield_now().await;
        advance(Duration::from_secs(299)).await;
        tokio::task::yield_now().await;

        assert!(mirror.active("sos-1").is_some());
        assert_eq!(mirror.ops().len(), 3);

        archiver.close();
        archiver.wait().await;

        assert_eq!(start.elapsed(), Archiver::DEFAULT_DELAY);
        assert!(mirror.active("sos-1").is_none());
        assert!(mirror.archived("sos-1").is_some());
        assert_eq!(
            mirror.ops().last(),
            Some(&MirrorOp::RemoveActive("sos-1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_non_terminal_status_is_mirrored() {
        let mirror = tracked_mirror();
        let archiver = Archiver::default();
        let synchronizer = StatusSynchronizer::new(mirror.clone(), archiver.clone());

        let outcome = synchronizer
            .on_incident_updated(&change(IncidentStatus::Received, IncidentStatus::Responding))
            .await;

        assert_eq!(outcome, SyncOutcome::Mirrored);
        assert_eq!(
            mirror.ops(),
            vec![MirrorOp::SetActiveStatus(
                "sos-1".to_string(),
                "RESPONDING".to_string()
            )]
        );
        assert_eq!(archiver.pending(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_status_is_a_no_op() {
        let mirror = tracked_mirror();
        let synchronizer = StatusSynchronizer::new(mirror.clone(), Archiver::default());

        let outcome = synchronizer
            .on_incident_updated(&change(IncidentStatus::Resolved, IncidentStatus::Resolved))
            .await;

        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert!(mirror.ops().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_failure_is_contained() {
        let mirror = tracked_mirror();
        mirror.fail_writes();
        let archiver = Archiver::default();
        let synchronizer = StatusSynchronizer::new(mirror.clone(), archiver.clone());

        let outcome = synchronizer
            .on_incident_updated(&change(IncidentStatus::Responding, IncidentStatus::Resolved))
            .await;

        assert_eq!(outcome, SyncOutcome::Failed);
        assert!(mirror.archived("sos-1").is_none());
        assert_eq!(archiver.pending(), 0);
    }
}
