use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::notifications::Channel;

/// Runtime configuration, read once at process start and handed to each
/// component constructor. Secrets have no defaults and fail loudly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub trafikverket_api_url: String,
    pub trafikverket_api_key: String,
    pub sms_gateway_url: String,
    pub email_gateway_url: String,
    pub gateway_api_key: String,
    pub sms_sender_name: String,
    pub http_addr: SocketAddr,
    pub poll_interval: Duration,
    pub poll_channels: Vec<Channel>,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let trafikverket_api_url = env::var("TRAFIKVERKET_API_URL")
            .unwrap_or_else(|_| "https://api.trafikinfo.trafikverket.se/v2/data.json".to_string());
        let trafikverket_api_key = env::var("TRAFIKVERKET_API_KEY")
            .map_err(|_| "TRAFIKVERKET_API_KEY must be set".to_string())?;

        let sms_gateway_url =
            env::var("SMS_GATEWAY_URL").map_err(|_| "SMS_GATEWAY_URL must be set".to_string())?;
        let email_gateway_url = env::var("EMAIL_GATEWAY_URL")
            .map_err(|_| "EMAIL_GATEWAY_URL must be set".to_string())?;
        let gateway_api_key =
            env::var("X_API_KEY").map_err(|_| "X_API_KEY must be set".to_string())?;

        let sms_sender_name =
            env::var("SMS_SENDER_NAME").unwrap_or_else(|_| "TrafikInfo".to_string());

        let http_addr = env::var("HTTP_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("HTTP_LISTEN_ADDR is not a valid socket address: {e}"))?;

        let poll_interval_secs = env::var("POLL_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "600".to_string())
            .parse::<u64>()
            .map_err(|e| format!("POLL_INTERVAL_SECONDS must be an integer: {e}"))?;

        let poll_channels = parse_channel_list(
            &env::var("POLL_CHANNELS").unwrap_or_else(|_| "sms".to_string()),
        )?;

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|e| format!("REQUEST_TIMEOUT_SECONDS must be an integer: {e}"))?;

        Ok(AppConfig {
            database_url,
            trafikverket_api_url,
            trafikverket_api_key,
            sms_gateway_url,
            email_gateway_url,
            gateway_api_key,
            sms_sender_name,
            http_addr,
            poll_interval: Duration::from_secs(poll_interval_secs),
            poll_channels,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

fn parse_channel_list(raw: &str) -> Result<Vec<Channel>, String> {
    let mut channels = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let channel = part
            .parse::<Channel>()
            .map_err(|_| format!("POLL_CHANNELS contains unknown channel: {part}"))?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    if channels.is_empty() {
        return Err("POLL_CHANNELS must name at least one channel".to_string());
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_channel_list_with_whitespace_and_duplicates() {
        let channels = parse_channel_list("sms, email,sms").unwrap();
        assert_eq!(channels, vec![Channel::Sms, Channel::Email]);
    }

    #[test]
    fn rejects_unknown_channel() {
        assert!(parse_channel_list("sms,pigeon").is_err());
    }

    #[test]
    fn rejects_empty_channel_list() {
        assert!(parse_channel_list(" , ").is_err());
    }
}
