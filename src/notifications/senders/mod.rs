use async_trait::async_trait;
use thiserror::Error;

use super::{Channel, ComposedMessage};
use crate::db::models::Recipient;

pub mod email;
pub mod sms;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("gateway returned status {status}: {body}")]
    SendFailed {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("message was composed for channel {got}, sender handles {expected}")]
    WrongChannel { expected: Channel, got: Channel },
}

impl SenderError {
    /// Whether a retry could plausibly succeed. Gateway 4xx responses and
    /// channel mismatches are permanent; network errors and 5xx are not.
    pub fn is_transient(&self) -> bool {
        match self {
            SenderError::Network(_) => true,
            SenderError::SendFailed { status, .. } => status.is_server_error(),
            SenderError::WrongChannel { .. } => false,
        }
    }
}

/// A transport for one delivery channel.
///
/// `send_batch` makes exactly one outbound gateway call for the whole
/// recipient list; there is no per-recipient delivery status. A failed batch
/// means nothing was recorded as sent, so the next poll cycle retries all of
/// it. Broadcast sends are never retried here.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send_batch(
        &self,
        recipients: &[Recipient],
        message: &ComposedMessage,
    ) -> Result<(), SenderError>;
}
