use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod composer;
pub mod senders;

/// A delivery medium. Deduplication is keyed per channel, so the same user
/// may receive both an SMS and an email for one deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Channel::Sms),
            "email" => Ok(Channel::Email),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// A fully rendered email: plaintext fallback plus HTML body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// A message rendered for exactly one channel. Composed once per deviation
/// and channel, then handed to the matching sender as a batch.
#[derive(Debug, Clone)]
pub enum ComposedMessage {
    Sms(String),
    Email(EmailMessage),
}

impl ComposedMessage {
    pub fn channel(&self) -> Channel {
        match self {
            ComposedMessage::Sms(_) => Channel::Sms,
            ComposedMessage::Email(_) => Channel::Email,
        }
    }
}
