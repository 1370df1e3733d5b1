use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A county known to the service, mapping Trafikverket's county number to the
/// internal subscription key. Corresponds to the `location` table.
/// Reference data; never written by this service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Region {
    pub location_id: i32,
    pub county_no: i32,
    pub region: String,
}

/// A user's subscription to one region. Corresponds to the `subscriptions`
/// table, owned by the account-management subsystem; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i32,
    pub user_id: Uuid,
    pub location_id: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Contact fields for a user, from the `users` table (account subsystem).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserContact {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A delivery address for one channel, produced by joining active
/// subscriptions against user contact fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recipient {
    pub user_id: Uuid,
    pub address: String,
}

/// One row of the notification ledger (`notifications` table).
///
/// At most one row with status `sent` may exist per
/// (user_id, external_id, channel); rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRecord {
    pub id: i32,
    pub user_id: Uuid,
    pub external_id: String,
    pub channel: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
