use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationSender, SenderError};
use crate::config::AppConfig;
use crate::db::models::Recipient;
use crate::notifications::{Channel, ComposedMessage};

/// Sender for the email gateway. One POST per batch, carrying both the
/// plaintext fallback and the HTML body.
pub struct EmailSender {
    client: Client,
    gateway_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct EmailBatchPayload<'a> {
    to: Vec<&'a str>,
    subject: &'a str,
    message: &'a str,
    html_message: &'a str,
}

impl EmailSender {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            gateway_url: config.email_gateway_url.clone(),
            api_key: config.gateway_api_key.clone(),
        })
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send_batch(
        &self,
        recipients: &[Recipient],
        message: &ComposedMessage,
    ) -> Result<(), SenderError> {
        let email = match message {
            ComposedMessage::Email(email) => email,
            other => {
                return Err(SenderError::WrongChannel {
                    expected: Channel::Email,
                    got: other.channel(),
                });
            }
        };

        let payload = EmailBatchPayload {
            to: recipients.iter().map(|r| r.address.as_str()).collect(),
            subject: &email.subject,
            message: &email.text,
            html_message: &email.html,
        };

        let response = self
            .client
            .post(&self.gateway_url)
            .header("X-API-KEY", &self.api_key)
            .json(&payload)
            .send()
            .await?;

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
}
