use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Header substituted when the upstream record carries none.
pub const DEFAULT_HEADER: &str = "Trafikstörning";

/// Classification of a deviation, from `Deviation.MessageTypeValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Accident,
    Roadwork,
    Other,
}

impl MessageType {
    fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("Accident") => MessageType::Accident,
            Some("Roadwork") => MessageType::Roadwork,
            _ => MessageType::Other,
        }
    }
}

/// A single traffic event in canonical form. Immutable once fetched; the
/// ledger stores only its `id`.
#[derive(Debug, Clone)]
pub struct Deviation {
    pub id: String,
    pub county_no: i32,
    pub header: String,
    pub message: String,
    pub message_type: MessageType,
    pub created_at: Option<DateTime<Utc>>,
}

// Wire shape of the Trafikverket data API: deviations arrive wrapped in
// RESPONSE.RESULT[].Situation[].Deviation[].

#[derive(Debug, Deserialize)]
pub struct TrafikverketResponse {
    #[serde(rename = "RESPONSE")]
    pub response: ResponseBody,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "RESULT", default)]
    pub result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
pub struct QueryResult {
    #[serde(rename = "Situation", default)]
    pub situations: Vec<Situation>,
}

#[derive(Debug, Deserialize)]
pub struct Situation {
    #[serde(rename = "Deviation", default)]
    pub deviations: Vec<RawDeviation>,
}

#[derive(Debug, Deserialize)]
pub struct RawDeviation {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Header")]
    pub header: Option<String>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
    #[serde(rename = "MessageTypeValue")]
    pub message_type_value: Option<String>,
    #[serde(rename = "CountyNo", default)]
    pub county_no: Vec<i32>,
    #[serde(rename = "CreationTime")]
    pub creation_time: Option<DateTime<Utc>>,
}

impl RawDeviation {
    /// Normalizes an upstream record, substituting documented defaults for
    /// missing optional fields. Records without a stable id (or without any
    /// county when no fallback is known) are unusable and yield `None`.
    pub fn normalize(self, fallback_county: Option<i32>) -> Option<Deviation> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let county_no = self.county_no.first().copied().or(fallback_county)?;

        let header = self
            .header
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HEADER.to_string());

        Some(Deviation {
            id,
            county_no,
            header,
            message: self.message.unwrap_or_default(),
            message_type: MessageType::from_value(self.message_type_value.as_deref()),
            created_at: self.creation_time,
        })
    }
}
