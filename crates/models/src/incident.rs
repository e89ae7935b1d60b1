use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of an incident.
///
/// Known states progress `PENDING`, `RECEIVED`, `RESPONDING`, then `RESOLVED`.
/// Clients may write values outside of this set, and those are carried
/// through verbatim as `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncidentStatus {
    #[default]
    Pending,
    Received,
    Responding,
    Resolved,
    Other(String),
}

impl IncidentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            IncidentStatus::Pending => "PENDING",
            IncidentStatus::Received => "RECEIVED",
            IncidentStatus::Responding => "RESPONDING",
            IncidentStatus::Resolved => "RESOLVED",
            IncidentStatus::Other(other) => other.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Resolved)
    }
}

impl From<String> for IncidentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => IncidentStatus::Pending,
            "RECEIVED" => IncidentStatus::Received,
            "RESPONDING" => IncidentStatus::Responding,
            "RESOLVED" => IncidentStatus::Resolved,
            _ => IncidentStatus::Other(value),
        }
    }
}

impl From<&str> for IncidentStatus {
    fn from(value: &str) -> Self {
        IncidentStatus::from(value.to_string())
    }
}

impl From<IncidentStatus> for String {
    fn from(value: IncidentStatus) -> Self {
        match value {
            IncidentStatus::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse outcome of a contact SMS broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmsStatus {
    Sent,
    Failed,
}

impl SmsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsStatus::Sent => "SENT",
            SmsStatus::Failed => "FAILED",
        }
    }
}

/// Per-number detail of a contact SMS broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsDetails {
    pub successful_numbers: Vec<String>,
    /// Failure reason, keyed on phone number.
    pub failed_numbers: BTreeMap<String, String>,
    /// Assigned by the primary store when the details are written.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastNotification {
    pub status: IncidentStatus,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// An incident as stored in the primary store.
///
/// The reporting client owns most fields. The dispatch agent only ever
/// writes the SMS outcome and notification fields, and never the status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentRecord {
    pub id: String,
    pub emergency_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub status: IncidentStatus,
    /// Phone number of the victim, which keys their `UserProfile`.
    pub user_phone_number: Option<String>,
    pub sms_sent: Option<bool>,
    pub sms_status: Option<SmsStatus>,
    pub sms_details: Option<SmsDetails>,
    pub notification_sent: bool,
    pub last_notification: Option<LastNotification>,
}

impl IncidentRecord {
    pub fn victim_phone(&self) -> Option<&str> {
        crate::non_blank(self.user_phone_number.as_deref())
    }
}
