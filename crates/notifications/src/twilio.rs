use crate::{SmsMessage, SmsReceipt};
use anyhow::Context;

/// Sends SMS through the Twilio Messages REST API.
#[derive(derivative::Derivative, Clone)]
#[derivative(Debug)]
pub struct TwilioSender {
    account_sid: String,
    #[derivative(Debug = "ignore")]
    auth_token: String,
    from_number: String,
    endpoint: url::Url,
    #[derivative(Debug = "ignore")]
    http_client: reqwest::Client,
}

#[derive(serde::Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(serde::Deserialize)]
struct ErrorResource {
    code: Option<i64>,
    message: String,
}

impl TwilioSender {
    pub fn new(
        account_sid: String,
        auth_token: String,
        from_number: String,
        http_client: reqwest::Client,
    ) -> anyhow::Result<TwilioSender> {
        let endpoint = url::Url::parse(&format!(
            "https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json"
        ))
        .context("building Twilio messages endpoint")?;

        Ok(TwilioSender {
            account_sid,
            auth_token,
            from_number,
            endpoint,
            http_client,
        })
    }

    pub(crate) async fn send(&self, message: SmsMessage) -> anyhow::Result<SmsReceipt> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form(&self.from_number, &message))
            .send()
            .await
            .context("calling Twilio messages API")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!(error_reason(status, &text));
        }

        let MessageResource { sid } = response
            .json()
            .await
            .context("decoding Twilio message resource")?;
        tracing::debug!(to = %message.to, %sid, "successfully sent SMS");

        Ok(SmsReceipt { sid: Some(sid) })
    }
}

fn form<'m>(from_number: &'m str, message: &'m SmsMessage) -> [(&'static str, &'m str); 3] {
    [
        ("To", message.to.as_str()),
        ("From", from_number),
        ("Body", message.body.as_str()),
    ]
}

/// Reason of a rejected message, preferring Twilio's own error resource.
fn error_reason(status: reqwest::StatusCode, text: &str) -> String {
    match serde_json::from_str::<ErrorResource>(text) {
        Ok(ErrorResource {
            code: Some(code),
            message,
        }) => format!("{} (twilio error {code})", crate::truncate_detail(&message)),
        Ok(ErrorResource { message, .. }) => crate::truncate_detail(&message).into_owned(),
        Err(_) => format!(
            "Twilio messages API responded with {status}: {}",
            crate::truncate_detail(text)
        ),
    }
}
