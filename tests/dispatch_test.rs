//! Dispatch-sequence properties against a live Postgres.
//!
//! These tests need a database; set DATABASE_URL and run them explicitly:
//! `cargo test -- --ignored`. The schema is applied idempotently on startup.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use trafiknotis::db;
use trafiknotis::db::models::Recipient;
use trafiknotis::dispatch::{DispatchError, DispatchService};
use trafiknotis::notifications::senders::{NotificationSender, SenderError};
use trafiknotis::notifications::{Channel, ComposedMessage};
use trafiknotis::traffic::{Deviation, DeviationSource, MessageType, TrafficError};

#[derive(Default)]
struct FakeSource {
    by_county: HashMap<i32, Vec<Deviation>>,
    failing_counties: HashSet<i32>,
}

#[async_trait]
impl DeviationSource for FakeSource {
    async fn fetch_deviations(&self, county_no: i32) -> Result<Vec<Deviation>, TrafficError> {
        if self.failing_counties.contains(&county_no) {
            return Err(TrafficError::UpstreamStatus(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        Ok(self.by_county.get(&county_no).cloned().unwrap_or_default())
    }

    async fn fetch_deviation_by_id(&self, id: &str) -> Result<Option<Deviation>, TrafficError> {
        Ok(self
            .by_county
            .values()
            .flatten()
            .find(|d| d.id == id)
            .cloned())
    }
}

/// Records every batch instead of calling a gateway.
struct RecordingSender {
    channel: Channel,
    batches: Mutex<Vec<Vec<Recipient>>>,
}

impl RecordingSender {
    fn new(channel: Channel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            batches: Mutex::new(Vec::new()),
        })
    }

    fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send_batch(
        &self,
        recipients: &[Recipient],
        _message: &ComposedMessage,
    ) -> Result<(), SenderError> {
        self.batches.lock().unwrap().push(recipients.to_vec());
        Ok(())
    }
}

/// Fails every batch the way a dead gateway would.
struct FailingSender(Channel);

#[async_trait]
impl NotificationSender for FailingSender {
    fn channel(&self) -> Channel {
        self.0
    }

    async fn send_batch(
        &self,
        _recipients: &[Recipient],
        _message: &ComposedMessage,
    ) -> Result<(), SenderError> {
        Err(SenderError::SendFailed {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "gateway down".to_string(),
        })
    }
}

fn deviation(id: &str, county_no: i32) -> Deviation {
    Deviation {
        id: id.to_string(),
        county_no,
        header: "Olycka".to_string(),
        message: "Väg avstängd. Omled via E4. Beräknad tid 2 tim.".to_string(),
        message_type: MessageType::Accident,
        created_at: None,
    }
}

fn unique_dev_id() -> String {
    format!("TEST-{}", Uuid::new_v4())
}

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for DB tests");
    let pool = db::init_pool(&url).await.expect("failed to connect");
    sqlx::raw_sql(include_str!("../migrations/0001_init.sql"))
        .execute(&pool)
        .await
        .expect("failed to apply schema");
    pool
}

/// Upserts a region and clears its subscriptions from earlier runs.
async fn seed_region(pool: &PgPool, county_no: i32, name: &str) -> i32 {
    let location_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO location (county_no, region) VALUES ($1, $2)
        ON CONFLICT (county_no) DO UPDATE SET region = EXCLUDED.region
        RETURNING location_id
        "#,
    )
    .bind(county_no)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM subscriptions WHERE location_id = $1")
        .bind(location_id)
        .execute(pool)
        .await
        .unwrap();

    location_id
}

async fn seed_subscriber(
    pool: &PgPool,
    location_id: i32,
    phone: Option<&str>,
    email: Option<&str>,
) -> Uuid {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (user_id, name, email, phone) VALUES ($1, 'Testperson', $2, $3)")
        .bind(user_id)
        .bind(email)
        .bind(phone)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO subscriptions (user_id, location_id, active) VALUES ($1, $2, TRUE)")
        .bind(user_id)
        .bind(location_id)
        .execute(pool)
        .await
        .unwrap();
    user_id
}

async fn ledger_rows_for(pool: &PgPool, external_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE external_id = $1")
        .bind(external_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn service_with(
    pool: PgPool,
    source: FakeSource,
    sms: Arc<dyn NotificationSender>,
    email: Arc<dyn NotificationSender>,
) -> DispatchService {
    DispatchService::new(pool, Arc::new(source), sms, email, vec![Channel::Sms])
}

#[tokio::test]
#[ignore]
async fn dedup_second_dispatch_resolves_zero_eligible() {
    let pool = test_pool().await;
    let location_id = seed_region(&pool, 9101, "Testlän A").await;
    seed_subscriber(&pool, location_id, Some("+46700000000"), None).await;

    let sms = RecordingSender::new(Channel::Sms);
    let email = RecordingSender::new(Channel::Email);
    let service = service_with(pool.clone(), FakeSource::default(), sms.clone(), email);

    let dev = deviation(&unique_dev_id(), 9101);

    let first = service
        .dispatch_for_deviation(Channel::Sms, &dev, 9101)
        .await
        .unwrap();
    assert_eq!(first.count, 1);
    assert_eq!(sms.batch_count(), 1);

    let second = service
        .dispatch_for_deviation(Channel::Sms, &dev, 9101)
        .await
        .unwrap();
    assert_eq!(second.count, 0);
    assert_eq!(sms.batch_count(), 1, "no second gateway call");

    assert_eq!(ledger_rows_for(&pool, &dev.id).await, 1);
}

#[tokio::test]
#[ignore]
async fn sms_and_email_dedup_independently() {
    let pool = test_pool().await;
    let location_id = seed_region(&pool, 9102, "Testlän B").await;
    seed_subscriber(
        &pool,
        location_id,
        Some("+46700000001"),
        Some("test@example.com"),
    )
    .await;

    let sms = RecordingSender::new(Channel::Sms);
    let email = RecordingSender::new(Channel::Email);
    let service = service_with(
        pool.clone(),
        FakeSource::default(),
        sms.clone(),
        email.clone(),
    );

    let dev = deviation(&unique_dev_id(), 9102);

    let sms_outcome = service
        .dispatch_for_deviation(Channel::Sms, &dev, 9102)
        .await
        .unwrap();
    let email_outcome = service
        .dispatch_for_deviation(Channel::Email, &dev, 9102)
        .await
        .unwrap();

    assert_eq!(sms_outcome.count, 1);
    assert_eq!(email_outcome.count, 1);
    assert_eq!(ledger_rows_for(&pool, &dev.id).await, 2);
}

#[tokio::test]
#[ignore]
async fn zero_subscribers_short_circuits_without_ledger_writes() {
    let pool = test_pool().await;
    seed_region(&pool, 9103, "Testlän C").await;

    let sms = RecordingSender::new(Channel::Sms);
    let email = RecordingSender::new(Channel::Email);
    let service = service_with(pool.clone(), FakeSource::default(), sms.clone(), email);

    let dev = deviation(&unique_dev_id(), 9103);
    let outcome = service
        .dispatch_for_deviation(Channel::Sms, &dev, 9103)
        .await
        .unwrap();

    assert_eq!(outcome.count, 0);
    assert_eq!(outcome.message, "Inga aktiva prenumeranter");
    assert_eq!(sms.batch_count(), 0);
    assert_eq!(ledger_rows_for(&pool, &dev.id).await, 0);
}

#[tokio::test]
#[ignore]
async fn failing_region_does_not_block_other_regions() {
    let pool = test_pool().await;
    seed_region(&pool, 9104, "Trasigt län").await;
    let location_b = seed_region(&pool, 9105, "Friskt län").await;
    let user_b = seed_subscriber(&pool, location_b, Some("+46700000002"), None).await;

    let dev = deviation(&unique_dev_id(), 9105);
    let source = FakeSource {
        by_county: HashMap::from([(9105, vec![dev.clone()])]),
        failing_counties: HashSet::from([9104]),
    };

    let sms = RecordingSender::new(Channel::Sms);
    let email = RecordingSender::new(Channel::Email);
    let service = service_with(pool.clone(), source, sms.clone(), email);

    service.run_poll_cycle().await.unwrap();

    let sent: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM notifications WHERE user_id = $1 AND external_id = $2 AND channel = 'sms')",
    )
    .bind(user_b)
    .bind(&dev.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(sent, "healthy region must be processed despite the broken one");
}

#[tokio::test]
#[ignore]
async fn transport_failure_records_nothing() {
    let pool = test_pool().await;
    let location_id = seed_region(&pool, 9106, "Testlän D").await;
    seed_subscriber(&pool, location_id, Some("+46700000003"), None).await;

    let email = RecordingSender::new(Channel::Email);
    let service = service_with(
        pool.clone(),
        FakeSource::default(),
        Arc::new(FailingSender(Channel::Sms)),
        email,
    );

    let dev = deviation(&unique_dev_id(), 9106);
    let err = service
        .dispatch_for_deviation(Channel::Sms, &dev, 9106)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Transport(_)));
    assert_eq!(
        ledger_rows_for(&pool, &dev.id).await,
        0,
        "failed batch must leave no ledger rows, so the next cycle retries it"
    );
}

#[tokio::test]
#[ignore]
async fn unknown_region_is_reported_as_such() {
    let pool = test_pool().await;

    let sms = RecordingSender::new(Channel::Sms);
    let email = RecordingSender::new(Channel::Email);
    let service = service_with(pool, FakeSource::default(), sms, email);

    let dev = deviation(&unique_dev_id(), 9999);
    let err = service
        .dispatch_for_deviation(Channel::Sms, &dev, 9999)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownRegion(9999)));
}
