use async_trait::async_trait;
use thiserror::Error;

pub mod client;
pub mod counties;
pub mod models;

pub use client::TrafikverketClient;
pub use models::{Deviation, MessageType};

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("unknown county number: {0}")]
    InvalidRegion(i32),
    #[error("Trafikverket request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("Trafikverket returned status {0}")]
    UpstreamStatus(reqwest::StatusCode),
}

/// Read-only source of current traffic deviations.
///
/// Implementations perform no retries; retry policy belongs to the caller.
#[async_trait]
pub trait DeviationSource: Send + Sync {
    /// Current deviations for one county, newest first.
    async fn fetch_deviations(&self, county_no: i32) -> Result<Vec<Deviation>, TrafficError>;

    /// A single deviation by its stable external id.
    async fn fetch_deviation_by_id(&self, id: &str) -> Result<Option<Deviation>, TrafficError>;
}
