use crate::stores::MirrorStore;
use std::time::Duration;
use tokio_util::task::TaskTracker;

/// Schedules the delayed removal of resolved incidents from the mirror's
/// active namespace.
///
/// Removals live only in this process. Any still pending when the process
/// exits are abandoned, leaving their active entries in place.
#[derive(Debug, Clone)]
pub struct Archiver {
    delay: Duration,
    tracker: TaskTracker,
}

impl Archiver {
    /// Grace period during which live-tracking clients still observe a
    /// resolved incident in the active namespace.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5 * 60);

    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            tracker: TaskTracker::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Remove the active entry of `incident_id` once the delay has elapsed.
    /// The removal runs unconditionally and cannot be cancelled.
    pub fn schedule_removal<M: MirrorStore>(&self, mirror: M, incident_id: String) {
        let deadline = tokio::time::Instant::now() + self.delay;

        self.tracker.spawn(async move {
            tokio::time::sleep_until(deadline).await;

            match mirror.remove_active(&incident_id).await {
                Ok(()) => tracing::info!(%incident_id, "removed archived incident from active mirror"),
                Err(error) => tracing::error!(
                    %incident_id,
                    ?error,
                    "failed to remove archived incident from active mirror"
                ),
            }
        });
    }

    /// Number of scheduled removals which haven't yet run.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting new removals, returning the number still pending.
    pub fn close(&self) -> usize {
        self.tracker.close();
        self.tracker.len()
    }

    /// Wait for pending removals to complete. Resolves only after `close()`.
    pub async fn wait(&self) {
        self.tracker.wait().await
    }
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}
