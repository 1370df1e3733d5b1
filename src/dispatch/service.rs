use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::db::models::Region;
use crate::db::services::{ledger_service, region_service, subscriber_service};
use crate::notifications::senders::{NotificationSender, SenderError};
use crate::notifications::{Channel, ComposedMessage, composer};
use crate::traffic::{Deviation, DeviationSource, TrafficError};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no region with county number {0}")]
    UnknownRegion(i32),
    #[error("no deviation with id {0}")]
    DeviationNotFound(String),
    #[error("traffic source error: {0}")]
    Source(#[from] TrafficError),
    #[error("transport error: {0}")]
    Transport(#[from] SenderError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of one dispatch sequence. A zero count is a normal outcome, not an
/// error; `message` carries the human-readable summary shown to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub message: String,
    pub count: usize,
}

impl DispatchOutcome {
    fn nothing_to_do(message: &str) -> Self {
        Self {
            message: message.to_string(),
            count: 0,
        }
    }
}

/// Orchestrates the notification pipeline: fetch deviations, deduplicate
/// against the ledger, resolve recipients, compose once, dispatch one batch
/// per channel, record each delivery.
///
/// All collaborators are constructed once at startup and shared; handlers
/// never build their own clients.
pub struct DispatchService {
    pool: PgPool,
    source: Arc<dyn DeviationSource>,
    sms_sender: Arc<dyn NotificationSender>,
    email_sender: Arc<dyn NotificationSender>,
    poll_channels: Vec<Channel>,
}

impl DispatchService {
    pub fn new(
        pool: PgPool,
        source: Arc<dyn DeviationSource>,
        sms_sender: Arc<dyn NotificationSender>,
        email_sender: Arc<dyn NotificationSender>,
        poll_channels: Vec<Channel>,
    ) -> Self {
        Self {
            pool,
            source,
            sms_sender,
            email_sender,
            poll_channels,
        }
    }

    fn sender_for(&self, channel: Channel) -> &Arc<dyn NotificationSender> {
        match channel {
            Channel::Sms => &self.sms_sender,
            Channel::Email => &self.email_sender,
        }
    }

    /// Runs poll cycles forever with a fixed pause between them. There is no
    /// cancellation hook; the loop ends with the process.
    pub async fn start_periodic_dispatch(self: Arc<Self>, period: Duration) {
        info!(period_secs = period.as_secs(), "deviation poll loop started");
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_poll_cycle().await {
                error!(error = %e, "poll cycle failed");
            }
        }
    }

    /// One full cycle over all known regions in ascending county order.
    /// A failing region is logged and skipped; it never aborts the cycle.
    pub async fn run_poll_cycle(&self) -> Result<(), DispatchError> {
        let regions = region_service::list_regions(&self.pool).await?;
        info!(regions = regions.len(), "starting poll cycle");

        for region in &regions {
            if let Err(e) = self.process_region(region).await {
                warn!(
                    county = region.county_no,
                    error = %e,
                    "region processing failed, continuing with next region"
                );
            }
        }
        Ok(())
    }

    async fn process_region(&self, region: &Region) -> Result<(), DispatchError> {
        let deviations = self.source.fetch_deviations(region.county_no).await?;

        for deviation in &deviations {
            // Coarse pre-filter by external id alone; the per-recipient,
            // per-channel check below is the authoritative one.
            if ledger_service::any_sent_for_deviation(&self.pool, &deviation.id).await? {
                continue;
            }

            for channel in &self.poll_channels {
                match self.dispatch_to_region(*channel, deviation, region).await {
                    Ok(outcome) if outcome.count > 0 => {
                        info!(
                            dev_id = %deviation.id,
                            county = region.county_no,
                            channel = %channel,
                            count = outcome.count,
                            "deviation dispatched"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // No ledger rows were written, so the next cycle
                        // picks this deviation up again.
                        warn!(
                            dev_id = %deviation.id,
                            channel = %channel,
                            error = %e,
                            "dispatch failed"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Synchronous single-deviation path used by the HTTP layer: re-fetches
    /// the deviation from the source and runs the same sequence as the loop.
    pub async fn dispatch_by_id(
        &self,
        channel: Channel,
        dev_id: &str,
        county_no: i32,
    ) -> Result<DispatchOutcome, DispatchError> {
        let deviation = self
            .source
            .fetch_deviation_by_id(dev_id)
            .await?
            .ok_or_else(|| DispatchError::DeviationNotFound(dev_id.to_string()))?;
        self.dispatch_for_deviation(channel, &deviation, county_no).await
    }

    /// Dedup → resolve → compose → dispatch → record, for one deviation on
    /// one channel.
    pub async fn dispatch_for_deviation(
        &self,
        channel: Channel,
        deviation: &Deviation,
        county_no: i32,
    ) -> Result<DispatchOutcome, DispatchError> {
        let region = region_service::get_region_by_county(&self.pool, county_no)
            .await?
            .ok_or(DispatchError::UnknownRegion(county_no))?;
        self.dispatch_to_region(channel, deviation, &region).await
    }

    async fn dispatch_to_region(
        &self,
        channel: Channel,
        deviation: &Deviation,
        region: &Region,
    ) -> Result<DispatchOutcome, DispatchError> {
        let candidates =
            subscriber_service::resolve_recipients(&self.pool, region.location_id, channel)
                .await?;
        if candidates.is_empty() {
            return Ok(DispatchOutcome::nothing_to_do(no_subscribers_message(
                channel,
            )));
        }

        let mut recipients = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !ledger_service::has_been_sent(&self.pool, candidate.user_id, &deviation.id, channel)
                .await?
            {
                recipients.push(candidate);
            }
        }
        if recipients.is_empty() {
            return Ok(DispatchOutcome::nothing_to_do(already_notified_message(
                channel,
            )));
        }

        let message = match channel {
            Channel::Sms => ComposedMessage::Sms(composer::compose_sms(deviation)),
            Channel::Email => {
                ComposedMessage::Email(composer::compose_email(deviation, &region.region))
            }
        };

        // One gateway call for the whole batch. On failure nothing is
        // recorded and the error propagates to the caller.
        self.sender_for(channel)
            .send_batch(&recipients, &message)
            .await?;

        // Transport succeeded: record each delivery. A failed insert here is
        // an audit gap, not a delivery failure; the message is already out.
        for recipient in &recipients {
            if let Err(e) =
                ledger_service::record_sent(&self.pool, recipient.user_id, &deviation.id, channel)
                    .await
            {
                warn!(
                    user_id = %recipient.user_id,
                    dev_id = %deviation.id,
                    channel = %channel,
                    error = %e,
                    "ledger write failed after successful send"
                );
            }
        }

        Ok(DispatchOutcome {
            message: success_message(channel, recipients.len()),
            count: recipients.len(),
        })
    }
}

fn no_subscribers_message(channel: Channel) -> &'static str {
    match channel {
        Channel::Sms => "Inga aktiva prenumeranter",
        Channel::Email => "Inga aktiva e-postprenumeranter",
    }
}

fn already_notified_message(channel: Channel) -> &'static str {
    match channel {
        Channel::Sms => "Alla har redan fått detta sms eller saknar telefonnummer",
        Channel::Email => "Alla har redan fått mail eller saknar e-post",
    }
}

fn success_message(channel: Channel, count: usize) -> String {
    match channel {
        Channel::Sms => format!("Skickade till {count} mottagare"),
        Channel::Email => format!("Skickade mail till {count} mottagare"),
    }
}
