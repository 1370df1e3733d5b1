use sqlx::PgPool;

use crate::db::models::Recipient;
use crate::notifications::Channel;

/// Resolves the delivery addresses for all active subscribers of a region on
/// one channel. Users without a usable address for the channel are dropped.
///
/// An empty result is a normal, frequent state and must not be treated as a
/// failure by callers.
pub async fn resolve_recipients(
    pool: &PgPool,
    location_id: i32,
    channel: Channel,
) -> sqlx::Result<Vec<Recipient>> {
    let sql = match channel {
        Channel::Sms => {
            r#"
            SELECT u.user_id, u.phone AS address
            FROM subscriptions s
            JOIN users u ON u.user_id = s.user_id
            WHERE s.location_id = $1
              AND s.active = TRUE
              AND u.phone IS NOT NULL AND u.phone <> ''
            "#
        }
        Channel::Email => {
            r#"
            SELECT u.user_id, u.email AS address
            FROM subscriptions s
            JOIN users u ON u.user_id = s.user_id
            WHERE s.location_id = $1
              AND s.active = TRUE
              AND u.email IS NOT NULL AND u.email <> ''
            "#
        }
    };

    sqlx::query_as::<_, Recipient>(sql)
        .bind(location_id)
        .fetch_all(pool)
        .await
}
