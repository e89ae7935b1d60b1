use super::{require_caller, settle_all};
use crate::stores::{ResponderDirectory, ResponderFilter};
use crate::{Caller, DispatchError};
use anyhow::Context;
use models::non_blank;
use notifications::messages::{Location, ResponderAlert};
use notifications::PushSender;

const NO_MATCHING_RESPONDERS: &str = "No matching responders found";

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotifyRespondersRequest {
    #[serde(alias = "reportId")]
    pub incident_id: Option<String>,
    pub emergency_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRespondersResponse {
    pub success: bool,
    pub notified_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pushes an alert about a new incident to every matching responder.
#[derive(Debug)]
pub struct ResponderNotifier<D, P> {
    directory: D,
    push: P,
}

impl<D: ResponderDirectory, P: PushSender> ResponderNotifier<D, P> {
    pub fn new(directory: D, push: P) -> Self {
        Self { directory, push }
    }

    /// Notify responders who offer the incident's emergency type within its state.
    /// Succeeds once every delivery has settled, counting those which were accepted.
    #[tracing::instrument(
        skip_all,
        fields(incident_id = request.incident_id.as_deref().unwrap_or_default())
    )]
    pub async fn notify(
        &self,
        caller: Option<&Caller>,
        request: NotifyRespondersRequest,
    ) -> Result<NotifyRespondersResponse, DispatchError> {
        let caller = require_caller(caller)?;

        let filter = ResponderFilter {
            service: non_blank(request.emergency_type.as_deref()).map(str::to_string),
            state: non_blank(request.state.as_deref()).map(str::to_string),
        };
        let responders = self
            .directory
            .find_responders(&filter)
            .await
            .context("querying responder directory")?;

        if responders.is_empty() {
            tracing::info!(?filter, uid = %caller.uid, "no matching responders");
            return Ok(NotifyRespondersResponse {
                success: false,
                notified_count: 0,
                message: Some(NO_MATCHING_RESPONDERS.to_string()),
            });
        }

        let alert = ResponderAlert {
            incident_id: request.incident_id.as_deref().unwrap_or_default(),
            emergency_type: request.emergency_type.as_deref(),
            latitude: request.latitude,
            longitude: request.longitude,
            location: Location {
                address: request.address.as_deref(),
                city: request.city.as_deref(),
                state: request.state.as_deref(),
            },
        };

        let deliveries = responders.iter().filter_map(|responder| {
            let Some(token) = responder.push_token() else {
                tracing::debug!(responder = %responder.id, "skipping responder without a push token");
                return None;
            };
            Some((responder.id.as_str(), self.push.send(alert.to_message(token))))
        });

        let mut notified_count = 0;
        for (responder, outcome) in settle_all(deliveries).await {
            match outcome {
                Ok(()) => notified_count += 1,
                Err(error) => tracing::warn!(responder, ?error, "failed to notify responder"),
            }
        }

        tracing::info!(
            notified_count,
            candidates = responders.len(),
            uid = %caller.uid,
            "notified responders"
        );
        Ok(NotifyRespondersResponse {
            success: true,
            notified_count,
            message: None,
        })
    }
}
