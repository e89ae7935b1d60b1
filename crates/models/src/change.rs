use crate::{IncidentRecord, IncidentStatus};
use serde::{Deserialize, Serialize};

/// A write to an incident in the primary store, as delivered by its change trigger.
///
/// Snapshots may be partial, carrying only the status and the victim's phone
/// number. Absent fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentChange {
    pub incident_id: String,
    pub before: IncidentRecord,
    pub after: IncidentRecord,
}

/// A change of incident status between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition<'a> {
    pub from: &'a IncidentStatus,
    pub to: &'a IncidentStatus,
}

impl IncidentChange {
    /// Returns the status transition of this change, or None if the status is unchanged.
    /// Updates which touch only other fields, and re-deliveries of an already
    /// observed status, both map to None.
    pub fn status_transition(&self) -> Option<StatusTransition<'_>> {
        if self.before.status == self.after.status {
            None
        } else {
            Some(StatusTransition {
                from: &self.before.status,
                to: &self.after.status,
            })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn change(before: &str, after: &str) -> IncidentChange {
        IncidentChange {
            incident_id: "sos-1".to_string(),
            before: IncidentRecord {
                status: before.into(),
                ..Default::default()
            },
            after: IncidentRecord {
                status: after.into(),
                notification_sent: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_unchanged_status_has_no_transition() {
        assert_eq!(change("RECEIVED", "RECEIVED").status_transition(), None);
    }

    #[test]
    fn test_changed_status_yields_transition() {
        let change = change("RECEIVED", "RESOLVED");
        let transition = change.status_transition().unwrap();
        assert_eq!(transition.from, &IncidentStatus::Received);
        assert_eq!(transition.to, &IncidentStatus::Resolved);
    }

    #[test]
    fn test_decodes_trigger_payload() {
        let change: IncidentChange = serde_json::from_str(
            r#"{"incident_id":"sos-9","before":{"id":"sos-9","status":"PENDING"},"after":{"id":"sos-9","status":"RECEIVED"}}"#,
        )
        .unwrap();

        let transition = change.status_transition().unwrap();
        assert_eq!(transition.from, &IncidentStatus::Pending);
        assert_eq!(transition.to, &IncidentStatus::Received);
    }
}
