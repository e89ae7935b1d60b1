use crate::PushMessage;
use anyhow::Context;

/// Sends push notifications through the FCM HTTP v1 API.
#[derive(derivative::Derivative, Clone)]
#[derivative(Debug)]
pub struct FcmSender {
    endpoint: url::Url,
    #[derivative(Debug = "ignore")]
    access_token: String,
    #[derivative(Debug = "ignore")]
    http_client: reqwest::Client,
}

#[derive(serde::Deserialize)]
struct SendResponse {
    /// Resource name of the accepted message, `projects/*/messages/{id}`.
    name: String,
}

impl FcmSender {
    pub fn new(
        project_id: &str,
        access_token: String,
        http_client: reqwest::Client,
    ) -> anyhow::Result<FcmSender> {
        if project_id.trim().is_empty() {
            anyhow::bail!("FCM project id must not be empty");
        }
        let endpoint = url::Url::parse(&format!(
            "https://fcm.googleapis.com/v1/projects/{project_id}/messages:send"
        ))
        .context("building FCM send endpoint")?;

        Ok(FcmSender {
            endpoint,
            access_token,
            http_client,
        })
    }

    pub(crate) async fn send(&self, message: PushMessage) -> anyhow::Result<()> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(&self.access_token)
            .json(&request_body(message))
            .send()
            .await
            .context("calling FCM send API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "FCM send API responded with {status}: {}",
                crate::truncate_detail(&body)
            );
        }

        let SendResponse { name } = response
            .json()
            .await
            .context("decoding FCM send response")?;
        tracing::debug!(%name, "successfully sent push notification");

        Ok(())
    }
}

fn request_body(message: PushMessage) -> serde_json::Value {
    let PushMessage {
        token,
        title,
        body,
        data,
    } = message;

    serde_json::json!({
        "message": {
            "token": token,
            "notification": {
                "title": title,
                "body": body,
            },
            "data": data,
        }
    })
}
