use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::NotificationRecord;
use crate::notifications::Channel;

/// Whether a notification for this (user, deviation, channel) tuple has
/// already been sent. This check is the sole deduplication mechanism and must
/// run before every dispatch.
pub async fn has_been_sent(
    pool: &PgPool,
    user_id: Uuid,
    external_id: &str,
    channel: Channel,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM notifications
            WHERE user_id = $1 AND external_id = $2 AND channel = $3 AND status = 'sent'
        )
        "#,
    )
    .bind(user_id)
    .bind(external_id)
    .bind(channel.as_str())
    .fetch_one(pool)
    .await
}

/// Coarse pre-filter: has any notification at all gone out for this
/// deviation, on any channel to any user. Lets the poll loop skip a deviation
/// without resolving recipients.
pub async fn any_sent_for_deviation(pool: &PgPool, external_id: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM notifications WHERE external_id = $1)",
    )
    .bind(external_id)
    .fetch_one(pool)
    .await
}

/// Records one successful delivery. The insert is idempotent on the dedup
/// key, so a concurrent or repeated dispatch cannot produce a second row.
pub async fn record_sent(
    pool: &PgPool,
    user_id: Uuid,
    external_id: &str,
    channel: Channel,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, external_id, channel, status)
        VALUES ($1, $2, $3, 'sent')
        ON CONFLICT (user_id, external_id, channel) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(external_id)
    .bind(channel.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Audit query: the most recent ledger rows, newest first.
pub async fn list_recent(pool: &PgPool, limit: i64) -> sqlx::Result<Vec<NotificationRecord>> {
    sqlx::query_as::<_, NotificationRecord>(
        r#"
        SELECT id, user_id, external_id, channel, status, created_at
        FROM notifications
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
