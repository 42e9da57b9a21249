//! Message repository.
//!
//! Rows are immutable once written; `transport_id` is the global dedup key.
//! Listing is ordered by the insertion id, never by `created_at`, so pages stay
//! stable when timestamps collide or are backfilled.

use bazaar_common::models::{ChannelId, IdentityId, MessageView, ParticipantId, SortDirection};
use sqlx::{AnyConnection, AnyPool};

/// Largest page `list_channel_messages` returns.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A message about to be stored.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub transport_id: String,
    pub channel_id: ChannelId,
    pub participant_id: ParticipantId,
    pub receiver: String,
    pub created_at: i64,
    pub body: String,
}

/// Insert a message. Returns false if a row with the same transport id already
/// exists; the stored row is left untouched.
pub async fn insert_message(conn: &mut AnyConnection, msg: &NewMessage) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO messages (transport_id, channel_id, participant_id, receiver, created_at, body)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (transport_id) DO NOTHING
        "#,
    )
    .bind(&msg.transport_id)
    .bind(msg.channel_id)
    .bind(msg.participant_id)
    .bind(&msg.receiver)
    .bind(msg.created_at)
    .bind(&msg.body)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Whether a message with this transport id is stored.
pub async fn exists(pool: &AnyPool, transport_id: &str) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE transport_id = ?")
        .bind(transport_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// List a page of channel messages as seen by one identity.
///
/// `anchor` is the transport id of a message from a previous page; the page
/// continues after it in `direction`. An anchor that matches no message of
/// this channel yields an empty page. `count` is clamped to `1..=MAX_PAGE_SIZE`.
pub async fn list_channel_messages(
    pool: &AnyPool,
    channel_id: ChannelId,
    identity_id: IdentityId,
    identity_address: &str,
    count: i64,
    direction: SortDirection,
    anchor: Option<&str>,
) -> Result<Vec<MessageView>, sqlx::Error> {
    let (order, cmp) = match direction {
        SortDirection::Asc => ("ASC", ">"),
        SortDirection::Desc => ("DESC", "<"),
    };
    let anchor_filter = if anchor.is_some() {
        format!("AND m.id {cmp} (SELECT a.id FROM messages a WHERE a.transport_id = ? AND a.channel_id = m.channel_id)")
    } else {
        String::new()
    };

    let sql = format!(
        r#"
        SELECT
            m.transport_id,
            c.hash AS channel,
            c.channel_type,
            p.address AS sender,
            p.label AS sender_label,
            m.receiver,
            m.body,
            m.created_at,
            CASE WHEN COALESCE(f.last_read, 0) >= m.created_at THEN 1 ELSE 0 END AS is_read,
            CASE WHEN p.address = ? THEN 1 ELSE 0 END AS is_own
        FROM messages m
        JOIN channels c ON c.id = m.channel_id
        JOIN participants p ON p.id = m.participant_id
        LEFT JOIN follows f ON f.channel_id = m.channel_id AND f.identity_id = ?
        WHERE m.channel_id = ?
        {anchor_filter}
        ORDER BY m.id {order}
        LIMIT ?
        "#
    );

    let mut query = sqlx::query_as::<_, MessageView>(&sql)
        .bind(identity_address)
        .bind(identity_id)
        .bind(channel_id);
    if let Some(anchor) = anchor {
        query = query.bind(anchor);
    }
    query
        .bind(count.clamp(1, MAX_PAGE_SIZE))
        .fetch_all(pool)
        .await
}
