//! In-process stores and recording senders. These back the test suite, and
//! allow exercising handlers without a database or network.
use super::{
    IncidentPatch, IncidentStore, MirrorEntry, MirrorStore, ProfileStore, ResponderDirectory,
    ResponderFilter,
};
use chrono::Utc;
use models::{IncidentRecord, IncidentStatus, LastNotification, Responder, SmsDetails, UserProfile};
use notifications::{PushMessage, PushSender, SmsMessage, SmsReceipt, SmsSender};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Primary store and directory, held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    incidents: BTreeMap<String, IncidentRecord>,
    responders: Vec<Responder>,
    profiles: BTreeMap<String, UserProfile>,
    patches: Vec<(String, IncidentPatch)>,
    fail_updates: bool,
    fail_queries: bool,
}

impl MemoryStore {
    pub fn insert_incident(&self, incident: IncidentRecord) {
        let mut state = self.inner.lock().unwrap();
        state.incidents.insert(incident.id.clone(), incident);
    }

    pub fn insert_responder(&self, responder: Responder) {
        self.inner.lock().unwrap().responders.push(responder);
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        let mut state = self.inner.lock().unwrap();
        state.profiles.insert(profile.phone_number.clone(), profile);
    }

    pub fn incident(&self, incident_id: &str) -> Option<IncidentRecord> {
        self.inner.lock().unwrap().incidents.get(incident_id).cloned()
    }

    /// All patches which were successfully applied, in order.
    pub fn patches(&self) -> Vec<(String, IncidentPatch)> {
        self.inner.lock().unwrap().patches.clone()
    }

    /// Cause all subsequent incident updates to fail.
    pub fn fail_updates(&self) {
        self.inner.lock().unwrap().fail_updates = true;
    }

    /// Cause all subsequent directory and profile queries to fail.
    pub fn fail_queries(&self) {
        self.inner.lock().unwrap().fail_queries = true;
    }
}

impl IncidentStore for MemoryStore {
    async fn update_incident<'s>(
        &'s self,
        incident_id: &'s str,
        patch: IncidentPatch,
    ) -> anyhow::Result<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_updates {
            anyhow::bail!("primary store is unavailable");
        }
        let Some(incident) = state.incidents.get_mut(incident_id) else {
            anyhow::bail!("incident {incident_id} does not exist");
        };

        match patch.clone() {
            IncidentPatch::SmsOutcome {
                sent,
                status,
                successful_numbers,
                failed_numbers,
            } => {
                incident.sms_sent = Some(sent);
                incident.sms_status = Some(status);
                incident.sms_details = Some(SmsDetails {
                    successful_numbers,
                    failed_numbers,
                    timestamp: Some(Utc::now()),
                });
            }
            IncidentPatch::Notified { status } => {
                incident.notification_sent = true;
                incident.last_notification = Some(LastNotification {
                    status,
                    timestamp: Some(Utc::now()),
                });
            }
        }
        state.patches.push((incident_id.to_string(), patch));
        Ok(())
    }
}

impl ResponderDirectory for MemoryStore {
    async fn find_responders<'s>(
        &'s self,
        filter: &'s ResponderFilter,
    ) -> anyhow::Result<Vec<Responder>> {
        let state = self.inner.lock().unwrap();
        if state.fail_queries {
            anyhow::bail!("responder directory is unavailable");
        }
        Ok(state
            .responders
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}

impl ProfileStore for MemoryStore {
    async fn fetch_profile<'s>(&'s self, phone_number: &'s str) -> anyhow::Result<Option<UserProfile>> {
        let state = self.inner.lock().unwrap();
        if state.fail_queries {
            anyhow::bail!("profile store is unavailable");
        }
        Ok(state.profiles.get(phone_number).cloned())
    }
}

/// An operation applied to a `MemoryMirror`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOp {
    SetActiveStatus(String, String),
    ReadActive(String),
    PutArchived(String),
    RemoveActive(String),
}

/// Mirror store held in memory, which records every operation applied to it.
#[derive(Debug, Clone, Default)]
pub struct MemoryMirror {
    inner: Arc<Mutex<MirrorState>>,
}

#[derive(Debug, Default)]
struct MirrorState {
    active: BTreeMap<String, MirrorEntry>,
    archived: BTreeMap<String, MirrorEntry>,
    ops: Vec<MirrorOp>,
    fail_writes: bool,
}

impl MemoryMirror {
    pub fn insert_active(&self, incident_id: &str, entry: MirrorEntry) {
        let mut state = self.inner.lock().unwrap();
        state.active.insert(incident_id.to_string(), entry);
    }

    pub fn active(&self, incident_id: &str) -> Option<MirrorEntry> {
        self.inner.lock().unwrap().active.get(incident_id).cloned()
    }

    pub fn archived(&self, incident_id: &str) -> Option<MirrorEntry> {
        self.inner.lock().unwrap().archived.get(incident_id).cloned()
    }

    pub fn ops(&self) -> Vec<MirrorOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    /// Cause all subsequent writes to fail.
    pub fn fail_writes(&self) {
        self.inner.lock().unwrap().fail_writes = true;
    }

    fn write(&self, op: MirrorOp) -> anyhow::Result<std::sync::MutexGuard<'_, MirrorState>> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_writes {
            anyhow::bail!("mirror is unavailable");
        }
        state.ops.push(op);
        Ok(state)
    }
}

impl MirrorStore for MemoryMirror {
    async fn set_active_status<'s>(
        &'s self,
        incident_id: &'s str,
        status: &'s IncidentStatus,
    ) -> anyhow::Result<()> {
        let mut state = self.write(MirrorOp::SetActiveStatus(
            incident_id.to_string(),
            status.to_string(),
        ))?;
        state
            .active
            .entry(incident_id.to_string())
            .or_default()
            .insert("status".to_string(), status.to_string().into());
        Ok(())
    }

    async fn read_active<'s>(&'s self, incident_id: &'s str) -> anyhow::Result<Option<MirrorEntry>> {
        let mut state = self.inner.lock().unwrap();
        state.ops.push(MirrorOp::ReadActive(incident_id.to_string()));
        Ok(state.active.get(incident_id).cloned())
    }

    async fn put_archived<'s>(
        &'s self,
        incident_id: &'s str,
        mut entry: MirrorEntry,
    ) -> anyhow::Result<()> {
        let mut state = self.write(MirrorOp::PutArchived(incident_id.to_string()))?;
        entry.insert("resolvedAt".to_string(), Utc::now().timestamp_millis().into());
        state.archived.insert(incident_id.to_string(), entry);
        Ok(())
    }

    async fn remove_active<'s>(&'s self, incident_id: &'s str) -> anyhow::Result<()> {
        let mut state = self.write(MirrorOp::RemoveActive(incident_id.to_string()))?;
        state.active.remove(incident_id);
        Ok(())
    }
}

/// Push sender which records every attempted delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingPush {
    inner: Arc<Mutex<PushState>>,
}

#[derive(Debug, Default)]
struct PushState {
    attempts: Vec<PushMessage>,
    failing_tokens: BTreeSet<String>,
    delays: BTreeMap<String, Duration>,
}

impl RecordingPush {
    /// Fail every delivery to `token`.
    pub fn fail_token(&self, token: &str) {
        let mut state = self.inner.lock().unwrap();
        state.failing_tokens.insert(token.to_string());
    }

    /// Delay every delivery to `token` by `delay` before it settles.
    pub fn delay_token(&self, token: &str, delay: Duration) {
        let mut state = self.inner.lock().unwrap();
        state.delays.insert(token.to_string(), delay);
    }

    pub fn attempts(&self) -> Vec<PushMessage> {
        self.inner.lock().unwrap().attempts.clone()
    }
}

impl PushSender for RecordingPush {
    async fn send<'s>(&'s self, message: PushMessage) -> anyhow::Result<()> {
        let delay = {
            let mut state = self.inner.lock().unwrap();
            state.attempts.push(message.clone());
            state.delays.get(&message.token).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.inner.lock().unwrap().failing_tokens.contains(&message.token) {
            anyhow::bail!("requested entity was not found");
        }
        Ok(())
    }
}

/// SMS sender which records every attempted delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingSms {
    inner: Arc<Mutex<SmsState>>,
}

#[derive(Debug, Default)]
struct SmsState {
    attempts: Vec<SmsMessage>,
    failing_numbers: BTreeMap<String, String>,
    delays: BTreeMap<String, Duration>,
}

impl RecordingSms {
    /// Fail every delivery to `number` with the given `reason`.
    pub fn fail_number(&self, number: &str, reason: &str) {
        let mut state = self.inner.lock().unwrap();
        state
            .failing_numbers
            .insert(number.to_string(), reason.to_string());
    }

    /// Delay every delivery to `number` by `delay` before it settles.
    pub fn delay_number(&self, number: &str, delay: Duration) {
        let mut state = self.inner.lock().unwrap();
        state.delays.insert(number.to_string(), delay);
    }

    pub fn attempts(&self) -> Vec<SmsMessage> {
        self.inner.lock().unwrap().attempts.clone()
    }
}

impl SmsSender for RecordingSms {
    async fn send<'s>(&'s self, message: SmsMessage) -> anyhow::Result<SmsReceipt> {
        let (attempt, delay) = {
            let mut state = self.inner.lock().unwrap();
            state.attempts.push(message.clone());
            (state.attempts.len(), state.delays.get(&message.to).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = self.inner.lock().unwrap().failing_numbers.get(&message.to) {
            anyhow::bail!("{reason}");
        }
        Ok(SmsReceipt {
            sid: Some(format!("SM{attempt:032}")),
        })
    }
}
