use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::warn;

use super::{NotificationSender, SenderError};
use crate::config::AppConfig;
use crate::db::models::Recipient;
use crate::notifications::{Channel, ComposedMessage};

const VERIFICATION_ATTEMPTS: u32 = 3;
const VERIFICATION_RETRY_DELAY: Duration = Duration::from_secs(2);
/// The SMS gateway can take a long time to accept a single verification
/// message; this path gets its own generous request timeout.
const VERIFICATION_TIMEOUT: Duration = Duration::from_secs(50);

/// Sender for the SMS gateway. One POST per batch; the gateway fans out to
/// the individual phone numbers.
pub struct SmsSender {
    client: Client,
    gateway_url: String,
    api_key: String,
    sender_name: String,
}

#[derive(Serialize)]
struct SmsBatchPayload<'a> {
    to: Vec<&'a str>,
    message: &'a str,
    from: &'a str,
    #[serde(rename = "shortLinks")]
    short_links: bool,
}

impl SmsSender {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            gateway_url: config.sms_gateway_url.clone(),
            api_key: config.gateway_api_key.clone(),
            sender_name: config.sms_sender_name.clone(),
        })
    }

    async fn post_batch(
        &self,
        to: Vec<&str>,
        message: &str,
        timeout: Option<Duration>,
    ) -> Result<(), SenderError> {
        let payload = SmsBatchPayload {
            to,
            message,
            from: &self.sender_name,
            short_links: true,
        };

        let mut request = self
            .client
            .post(&self.gateway_url)
            .header("X-API-KEY", &self.api_key)
            .json(&payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(SenderError::SendFailed { status, body });
        }
        Ok(())
    }

    /// Sends a single verification code SMS.
    ///
    /// Unlike deviation broadcasts, this path retries transient failures up
    /// to three attempts with a short pause, since there is no poll cycle
    /// behind it to try again.
    pub async fn send_verification_code(
        &self,
        phone: &str,
        code: &str,
    ) -> Result<(), SenderError> {
        let message = format!("Din verifieringskod är: {code}");

        let mut attempt = 1;
        loop {
            match self
                .post_batch(vec![phone], &message, Some(VERIFICATION_TIMEOUT))
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if attempt < VERIFICATION_ATTEMPTS && e.is_transient() => {
                    warn!(attempt, error = %e, "verification code send failed, retrying");
                    tokio::time::sleep(VERIFICATION_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl NotificationSender for SmsSender {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send_batch(
        &self,
        recipients: &[Recipient],
        message: &ComposedMessage,
    ) -> Result<(), SenderError> {
        let text = match message {
            ComposedMessage::Sms(text) => text,
            other => {
                return Err(SenderError::WrongChannel {
                    expected: Channel::Sms,
                    got: other.channel(),
                });
            }
        };

        let phones: Vec<&str> = recipients.iter().map(|r| r.address.as_str()).collect();
        self.post_batch(phones, text, None).await
    }
}
