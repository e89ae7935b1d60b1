use super::{require_caller, settle_all};
use crate::stores::{IncidentPatch, IncidentStore};
use crate::{Caller, DispatchError};
use models::{SmsStatus, non_blank};
use notifications::messages::{ContactAlert, Location, NearestService};
use notifications::{SmsMessage, SmsSender, truncate_detail};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendContactSmsRequest {
    #[serde(alias = "reportId")]
    pub incident_id: Option<String>,
    pub phone_numbers: Vec<String>,
    pub emergency_type: Option<String>,
    pub user_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub nearest_service_name: Option<String>,
    pub nearest_service_phone: Option<String>,
    pub nearest_service_distance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendContactSmsResponse {
    pub success: bool,
    pub messages_sent: usize,
    pub successful_numbers: Vec<String>,
    pub failed_numbers: BTreeMap<String, String>,
    /// Set if delivery outcomes couldn't be recorded onto the incident.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_update_error: Option<String>,
}

/// Broadcasts an SMS alert to a victim's emergency contacts, and records
/// the per-number outcome onto their incident.
#[derive(Debug)]
pub struct ContactSmsBroadcaster<S, T> {
    store: S,
    sms: T,
}

impl<S: IncidentStore, T: SmsSender> ContactSmsBroadcaster<S, T> {
    pub fn new(store: S, sms: T) -> Self {
        Self { store, sms }
    }

    #[tracing::instrument(
        skip_all,
        fields(incident_id = request.incident_id.as_deref().unwrap_or_default())
    )]
    pub async fn broadcast(
        &self,
        caller: Option<&Caller>,
        request: SendContactSmsRequest,
    ) -> Result<SendContactSmsResponse, DispatchError> {
        let caller = require_caller(caller)?;

        let mut phone_numbers: Vec<&str> = Vec::with_capacity(request.phone_numbers.len());
        for number in request.phone_numbers.iter().map(|n| n.trim()) {
            if !number.is_empty() && !phone_numbers.contains(&number) {
                phone_numbers.push(number);
            }
        }
        if phone_numbers.is_empty() {
            return Err(DispatchError::InvalidArgument(
                "No phone numbers provided".to_string(),
            ));
        }
        let incident_id = non_blank(request.incident_id.as_deref());

        let body = ContactAlert {
            incident_id,
            emergency_type: request.emergency_type.as_deref(),
            user_name: request.user_name.as_deref(),
            location: Location {
                address: request.address.as_deref(),
                city: request.city.as_deref(),
                state: request.state.as_deref(),
            },
            nearest_service: NearestService {
                name: request.nearest_service_name.as_deref(),
                phone: request.nearest_service_phone.as_deref(),
                distance: request.nearest_service_distance.as_deref(),
            },
        }
        .body();

        let deliveries = phone_numbers.iter().map(|&to| {
            let message = SmsMessage {
                to: to.to_string(),
                body: body.clone(),
            };
            (to, self.sms.send(message))
        });

        let mut successful_numbers = Vec::new();
        let mut failed_numbers = BTreeMap::new();

        for (to, outcome) in settle_all(deliveries).await {
            match outcome {
                Ok(receipt) => {
                    tracing::debug!(to, sid = ?receipt.sid, "sent SMS");
                    successful_numbers.push(to.to_string());
                }
                Err(error) => {
                    tracing::warn!(to, ?error, "failed to send SMS");
                    // Reasons are recorded onto the incident, so bound their size.
                    let reason = format!("{error:#}");
                    failed_numbers.insert(to.to_string(), truncate_detail(&reason).into_owned());
                }
            }
        }
        let sent = !successful_numbers.is_empty();

        let mut incident_update_error = None;
        if let Some(incident_id) = incident_id {
            let patch = IncidentPatch::SmsOutcome {
                sent,
                status: if sent {
                    SmsStatus::Sent
                } else {
                    SmsStatus::Failed
                },
                successful_numbers: successful_numbers.clone(),
                failed_numbers: failed_numbers.clone(),
            };
            if let Err(error) = self.store.update_incident(incident_id, patch).await {
                tracing::error!(?error, "failed to record SMS outcome onto incident");
                incident_update_error = Some(format!("{error:#}"));
            }
        }

        tracing::info!(
            messages_sent = successful_numbers.len(),
            failed = failed_numbers.len(),
            uid = %caller.uid,
            "broadcast contact SMS"
        );
        Ok(SendContactSmsResponse {
            success: sent,
            messages_sent: successful_numbers.len(),
            successful_numbers,
            failed_numbers,
            incident_update_error,
        })
    }
}
