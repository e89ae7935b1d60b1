//! Message content for each kind of alert the agent dispatches.
use crate::PushMessage;
use models::{IncidentStatus, non_blank};
use std::collections::BTreeMap;

/// Data key naming the client screen a notification opens.
pub const CLICK_ACTION: &str = "clickAction";
pub const OPEN_EMERGENCY_DETAILS: &str = "OPEN_EMERGENCY_DETAILS";
pub const OPEN_SOS_DETAILS: &str = "OPEN_SOS_DETAILS";

const UNKNOWN_ADDRESS: &str = "Unknown address";
const UNNAMED_REPORTER: &str = "A person";
const STATUS_UPDATE_TITLE: &str = "SOS Status Update";
const SMS_DISCLAIMER: &str =
    "This is an automated emergency alert. Please contact emergency services if needed.";

/// Where an incident was reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct Location<'a> {
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
}

impl<'a> Location<'a> {
    pub fn address_or_unknown(&self) -> &'a str {
        non_blank(self.address).unwrap_or(UNKNOWN_ADDRESS)
    }

    /// Human-readable location, skipping empty parts.
    pub fn describe(&self) -> String {
        [
            Some(self.address_or_unknown()),
            non_blank(self.city),
            non_blank(self.state),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Alert pushed to each responder near a newly reported incident.
#[derive(Debug, Clone, Copy)]
pub struct ResponderAlert<'a> {
    pub incident_id: &'a str,
    pub emergency_type: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: Location<'a>,
}

impl ResponderAlert<'_> {
    pub fn title(&self) -> String {
        match non_blank(self.emergency_type) {
            Some(kind) => format!("{kind} Emergency Alert"),
            None => "Emergency Alert".to_string(),
        }
    }

    pub fn to_message(&self, token: &str) -> PushMessage {
        let coordinate = |c: Option<f64>| c.map(|c| c.to_string()).unwrap_or_default();

        let data: BTreeMap<String, String> = [
            ("incidentId", self.incident_id.to_string()),
            (
                "emergencyType",
                self.emergency_type.unwrap_or_default().to_string(),
            ),
            ("latitude", coordinate(self.latitude)),
            ("longitude", coordinate(self.longitude)),
            ("address", self.location.address_or_unknown().to_string()),
            ("city", self.location.city.unwrap_or_default().to_string()),
            ("state", self.location.state.unwrap_or_default().to_string()),
            (CLICK_ACTION, OPEN_EMERGENCY_DETAILS.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        PushMessage {
            token: token.to_string(),
            title: self.title(),
            body: format!("Emergency at {}. Tap to respond.", self.location.describe()),
            data,
        }
    }
}

/// Nearest emergency service to the victim, as resolved by their device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestService<'a> {
    pub name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub distance: Option<&'a str>,
}

/// SMS broadcast to a victim's emergency contacts.
#[derive(Debug, Clone, Copy)]
pub struct ContactAlert<'a> {
    pub incident_id: Option<&'a str>,
    pub emergency_type: Option<&'a str>,
    pub user_name: Option<&'a str>,
    pub location: Location<'a>,
    pub nearest_service: NearestService<'a>,
}

impl ContactAlert<'_> {
    /// Renders the message body. Lines for absent optional fields are left
    /// out entirely, rather than rendered blank.
    pub fn body(&self) -> String {
        let name = non_blank(self.user_name).unwrap_or(UNNAMED_REPORTER);
        let kind = non_blank(self.emergency_type);

        let mut paragraphs = vec![
            match kind {
                Some(kind) => format!("EMERGENCY ALERT: {name} has reported a {kind} emergency."),
                None => format!("EMERGENCY ALERT: {name} has reported an emergency."),
            },
            format!("Location: {}", self.location.describe()),
        ];

        let NearestService {
            name: service_name,
            phone: service_phone,
            distance: service_distance,
        } = self.nearest_service;

        let mut nearest = Vec::new();
        if let Some(service_name) = non_blank(service_name) {
            let label = kind.unwrap_or("service");
            nearest.push(match non_blank(service_distance) {
                Some(distance) => format!("Nearest {label}: {service_name} ({distance})"),
                None => format!("Nearest {label}: {service_name}"),
            });
        }
        if let Some(service_phone) = non_blank(service_phone) {
            nearest.push(format!("Emergency service #: {service_phone}"));
        }
        if !nearest.is_empty() {
            paragraphs.push(nearest.join("\n"));
        }

        if let Some(incident_id) = non_blank(self.incident_id) {
            paragraphs.push(format!("SOS ID: {incident_id} for status tracking."));
        }
        paragraphs.push(SMS_DISCLAIMER.to_string());

        paragraphs.join("\n\n")
    }
}

/// Body of the push sent to a victim when their incident changes status.
pub fn status_update_body(status: &IncidentStatus) -> String {
    match status {
        IncidentStatus::Received => "Your emergency has been received by our system".to_string(),
        IncidentStatus::Responding => "Help is on the way to your location".to_string(),
        IncidentStatus::Resolved => "Your emergency has been marked as resolved".to_string(),
        other => format!("Your SOS report status has changed to {other}"),
    }
}

pub fn status_update(token: &str, incident_id: &str, status: &IncidentStatus) -> PushMessage {
    let data = [
        ("incidentId", incident_id.to_string()),
        ("status", status.to_string()),
        (CLICK_ACTION, OPEN_SOS_DETAILS.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    PushMessage {
        token: token.to_string(),
        title: STATUS_UPDATE_TITLE.to_string(),
        body: status_update_body(status),
        data,
    }
}
