//! Construction and delivery of outbound push notifications and SMS messages.
//!
//! Every delivery addresses exactly one recipient, and reports only whether
//! that one delivery succeeded. Fanning a message out to many recipients, and
//! aggregating the outcomes, is the responsibility of the caller.
mod fcm;
pub mod messages;
mod twilio;

pub use fcm::FcmSender;
pub use twilio::TwilioSender;

use std::collections::BTreeMap;

/// A push notification addressed to a single device token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// Key/value payload handed to the receiving app.
    pub data: BTreeMap<String, String>,
}

/// An SMS addressed to a single phone number.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// Acknowledgement of an accepted SMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    /// Gateway-assigned message identifier, if the gateway produced one.
    pub sid: Option<String>,
}

pub trait PushSender: std::fmt::Debug + Send + Sync + 'static {
    fn send<'s>(
        &'s self,
        message: PushMessage,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;
}

pub trait SmsSender: std::fmt::Debug + Send + Sync + 'static {
    fn send<'s>(
        &'s self,
        message: SmsMessage,
    ) -> impl std::future::Future<Output = anyhow::Result<SmsReceipt>> + Send + 's;
}

/// Maximum number of characters of a failure detail, such as a gateway's
/// response body, which is carried into an error.
pub const MAX_DETAIL_CHARS: usize = 200;

/// Truncate `detail` to at most `MAX_DETAIL_CHARS` characters, marking the cut.
pub fn truncate_detail(detail: &str) -> std::borrow::Cow<'_, str> {
    match detail.char_indices().nth(MAX_DETAIL_CHARS) {
        None => std::borrow::Cow::Borrowed(detail),
        Some((end, _)) => std::borrow::Cow::Owned(format!("{}...", &detail[..end])),
    }
}

#[derive(Debug, Clone)]
pub enum PushService {
    Disabled,
    Fcm(FcmSender),
}

impl PushService {
    pub fn fcm(
        project_id: &str,
        access_token: String,
        http_client: reqwest::Client,
    ) -> anyhow::Result<PushService> {
        Ok(PushService::Fcm(FcmSender::new(
            project_id,
            access_token,
            http_client,
        )?))
    }
}

impl PushSender for PushService {
    async fn send<'s>(&'s self, message: PushMessage) -> anyhow::Result<()> {
        match self {
            PushService::Disabled => {
                tracing::warn!(
                    title = %message.title,
                    click_action = ?message.data.get(messages::CLICK_ACTION),
                    "skipping sending push notification (disabled)"
                );
                Ok(())
            }
            PushService::Fcm(fcm) => fcm.send(message).await,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SmsService {
    Disabled,
    Twilio(TwilioSender),
}

impl SmsService {
    pub fn twilio(
        account_sid: String,
        auth_token: String,
        from_number: String,
        http_client: reqwest::Client,
    ) -> anyhow::Result<SmsService> {
        Ok(SmsService::Twilio(TwilioSender::new(
            account_sid,
            auth_token,
            from_number,
            http_client,
        )?))
    }
}

impl SmsSender for SmsService {
    async fn send<'s>(&'s self, message: SmsMessage) -> anyhow::Result<SmsReceipt> {
        match self {
            SmsService::Disabled => {
                tracing::warn!(to = %message.to, "skipping sending SMS (disabled)");
                Ok(SmsReceipt { sid: None })
            }
            SmsService::Twilio(twilio) => twilio.send(message).await,
        }
    }
}
