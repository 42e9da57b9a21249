//! Transport item ledger: inbound items still being handled, with the
//! processing status the retry scheduler works from. Rows leave the ledger
//! once their item settles or its channel is removed.

use bazaar_common::models::{ItemDirection, ItemStatus, WaitingItem};
use sqlx::{Any, AnyPool, Executor};

const COLUMNS: &str = "transport_id, direction, status, processed_count, processed_at, \
                       received_at, sender, receiver, sent_at, payload";

/// A transport item about to be recorded.
#[derive(Debug, Clone)]
pub struct NewTransportItem {
    pub transport_id: String,
    pub direction: ItemDirection,
    pub status: ItemStatus,
    pub received_at: i64,
    pub sender: String,
    pub receiver: String,
    pub sent_at: Option<i64>,
    pub payload: String,
}

/// Record an item. Returns false if the transport id is already known; the
/// existing row (and its attempt history) is kept.
pub async fn record<'e, E>(executor: E, item: &NewTransportItem) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO transport_items
            (transport_id, direction, status, processed_count, processed_at,
             received_at, sender, receiver, sent_at, payload)
        VALUES (?, ?, ?, 0, 0, ?, ?, ?, ?, ?)
        ON CONFLICT (transport_id) DO NOTHING
        "#,
    )
    .bind(&item.transport_id)
    .bind(item.direction.as_str())
    .bind(item.status.as_str())
    .bind(item.received_at)
    .bind(&item.sender)
    .bind(&item.receiver)
    .bind(item.sent_at)
    .bind(&item.payload)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find(pool: &AnyPool, transport_id: &str) -> Result<Option<WaitingItem>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM transport_items WHERE transport_id = ?");
    sqlx::query_as::<_, WaitingItem>(&sql)
        .bind(transport_id)
        .fetch_optional(pool)
        .await
}

/// Incoming items still `WAITING` that were received at or before
/// `received_before`, newest first.
pub async fn fetch_waiting(
    pool: &AnyPool,
    received_before: i64,
    limit: u32,
) -> Result<Vec<WaitingItem>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {COLUMNS} FROM transport_items
        WHERE status = ? AND direction = ? AND received_at <= ?
        ORDER BY received_at DESC, id DESC
        LIMIT ?
        "#
    );
    sqlx::query_as::<_, WaitingItem>(&sql)
        .bind(ItemStatus::Waiting.as_str())
        .bind(ItemDirection::Incoming.as_str())
        .bind(received_before)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
}

/// Count one processing attempt and settle the item's status.
pub async fn mark_attempt(
    pool: &AnyPool,
    transport_id: &str,
    status: ItemStatus,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE transport_items
        SET status = ?, processed_count = processed_count + 1, processed_at = ?
        WHERE transport_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(now)
    .bind(transport_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &AnyPool, transport_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transport_items WHERE transport_id = ?")
        .bind(transport_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
