//! Channel repository.
//!
//! Channels are provisioned lazily by the delivery pipeline. Provisioning is an
//! insert-or-ignore on `(hash, channel_type)` followed by a lookup, so two
//! concurrent first messages on the same object resolve to the same row.

use std::cmp::Reverse;

use bazaar_common::models::{Channel, ChannelId, ChannelSummary, ChannelType, IdentityId};
use sqlx::{AnyConnection, AnyPool, Row};

/// Return the id of the `(hash, channel_type)` channel, creating it if absent.
/// An existing row always wins; a concurrent insert is not an error.
pub async fn ensure_channel(
    conn: &mut AnyConnection,
    hash: &str,
    channel_type: ChannelType,
    now: i64,
) -> Result<ChannelId, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO channels (hash, channel_type, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT (hash, channel_type) DO NOTHING
        "#,
    )
    .bind(hash)
    .bind(channel_type.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query("SELECT id FROM channels WHERE hash = ? AND channel_type = ?")
        .bind(hash)
        .bind(channel_type.as_str())
        .fetch_one(&mut *conn)
        .await?;
    row.try_get("id")
}

/// Find a channel by its natural key.
pub async fn find_channel(
    pool: &AnyPool,
    hash: &str,
    channel_type: ChannelType,
) -> Result<Option<Channel>, sqlx::Error> {
    sqlx::query_as::<_, Channel>(
        "SELECT id, hash, channel_type, created_at FROM channels WHERE hash = ? AND channel_type = ?",
    )
    .bind(hash)
    .bind(channel_type.as_str())
    .fetch_optional(pool)
    .await
}

/// Find a channel by ID.
pub async fn find_by_id(pool: &AnyPool, id: ChannelId) -> Result<Option<Channel>, sqlx::Error> {
    sqlx::query_as::<_, Channel>("SELECT id, hash, channel_type, created_at FROM channels WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List the channels an identity follows, newest activity first, each annotated
/// with participant count, newest message time, and the identity's watermark.
pub async fn list_followed(
    pool: &AnyPool,
    identity_id: IdentityId,
    channel_type: Option<ChannelType>,
) -> Result<Vec<ChannelSummary>, sqlx::Error> {
    let type_filter = if channel_type.is_some() { "AND c.channel_type = ?" } else { "" };
    let sql = format!(
        r#"
        SELECT
            c.id,
            c.hash,
            c.channel_type,
            f.last_read,
            (SELECT COUNT(DISTINCT m.participant_id) FROM messages m WHERE m.channel_id = c.id)
                AS participant_count,
            (SELECT MAX(m.created_at) FROM messages m WHERE m.channel_id = c.id)
                AS newest_message_at
        FROM follows f
        JOIN channels c ON c.id = f.channel_id
        WHERE f.identity_id = ?
        {type_filter}
        "#
    );

    let mut query = sqlx::query_as::<_, ChannelSummary>(&sql).bind(identity_id);
    if let Some(ty) = channel_type {
        query = query.bind(ty.as_str());
    }
    let mut rows = query.fetch_all(pool).await?;
    // Most recent activity first; channels without messages last.
    rows.sort_by_key(|s| Reverse((s.newest_message_at.unwrap_or(i64::MIN), s.id)));
    Ok(rows)
}

/// Channels nobody follows: candidates for orphan cleanup.
pub async fn list_unfollowed(pool: &AnyPool) -> Result<Vec<Channel>, sqlx::Error> {
    sqlx::query_as::<_, Channel>(
        r#"
        SELECT c.id, c.hash, c.channel_type, c.created_at
        FROM channels c
        WHERE NOT EXISTS (SELECT 1 FROM follows f WHERE f.channel_id = c.id)
        ORDER BY c.id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Delete a channel and everything hanging off it, unless someone followed it
/// in the meantime. Returns whether the channel was removed.
pub async fn delete_if_unfollowed(pool: &AnyPool, id: ChannelId) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let followed: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE channel_id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if followed.0 > 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "DELETE FROM transport_items WHERE transport_id IN \
         (SELECT transport_id FROM messages WHERE channel_id = ?)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM messages WHERE channel_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM channels WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{follows, identities, messages, participants, transport_items};
    use bazaar_common::models::{ItemDirection, ItemStatus};
    use crate::Database;

    #[tokio::test]
    async fn ensure_channel_is_stable_per_hash_and_type() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        let a = ensure_channel(&mut conn, "abc123", ChannelType::Listing, 10).await.unwrap();
        let b = ensure_channel(&mut conn, "abc123", ChannelType::Listing, 20).await.unwrap();
        let c = ensure_channel(&mut conn, "abc123", ChannelType::Order, 30).await.unwrap();
        drop(conn);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let stored = find_channel(&db.pool, "abc123", ChannelType::Listing).await.unwrap().unwrap();
        assert_eq!(stored.id, a);
        // first writer's timestamp is kept
        assert_eq!(stored.created_at, 10);
    }

    #[tokio::test]
    async fn followed_summary_reports_unread_and_counts() {
        let db = Database::connect_in_memory().await.unwrap();
        let me = identities::create_identity(&db.pool, "market", "addr-me", "00", 0).await.unwrap();

        let mut conn = db.pool.acquire().await.unwrap();
        let listing = ensure_channel(&mut conn, "l1", ChannelType::Listing, 0).await.unwrap();
        let order = ensure_channel(&mut conn, "o1", ChannelType::Order, 0).await.unwrap();
        let alice = participants::ensure_participant(&mut conn, "alice").await.unwrap();
        let bob = participants::ensure_participant(&mut conn, "bob").await.unwrap();
        for (tid, ch, who, at) in [("t1", listing, alice, 100), ("t2", listing, bob, 200), ("t3", listing, alice, 300)] {
            let msg = messages::NewMessage {
                transport_id: tid.into(),
                channel_id: ch,
                participant_id: who,
                receiver: "addr-me".into(),
                created_at: at,
                body: "hi".into(),
            };
            assert!(messages::insert_message(&mut conn, &msg).await.unwrap());
        }
        drop(conn);

        follows::follow(&db.pool, listing, me.id).await.unwrap();
        follows::follow(&db.pool, order, me.id).await.unwrap();
        follows::set_last_read(&db.pool, listing, me.id, 300).await.unwrap();

        let all = list_followed(&db.pool, me.id, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let l = all.iter().find(|s| s.id == listing).unwrap();
        assert_eq!(l.participant_count, 2);
        assert_eq!(l.newest_message_at, Some(300));
        // newest == last_read is read
        assert!(!l.has_unread);
        let o = all.iter().find(|s| s.id == order).unwrap();
        assert_eq!(o.participant_count, 0);
        assert_eq!(o.newest_message_at, None);
        assert!(!o.has_unread);

        follows::set_last_read(&db.pool, listing, me.id, 250).await.unwrap();
        let only_listing = list_followed(&db.pool, me.id, Some(ChannelType::Listing)).await.unwrap();
        assert_eq!(only_listing.len(), 1);
        assert_eq!(only_listing[0].last_read, 300);
    }

    #[tokio::test]
    async fn delete_if_unfollowed_respects_followers() {
        let db = Database::connect_in_memory().await.unwrap();
        let me = identities::create_identity(&db.pool, "market", "addr-me", "00", 0).await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let kept = ensure_channel(&mut conn, "keep", ChannelType::Order, 0).await.unwrap();
        let gone = ensure_channel(&mut conn, "gone", ChannelType::Order, 0).await.unwrap();
        let p = participants::ensure_participant(&mut conn, "alice").await.unwrap();
        let msg = messages::NewMessage {
            transport_id: "t-gone".into(),
            channel_id: gone,
            participant_id: p,
            receiver: "bob".into(),
            created_at: 1,
            body: "bye".into(),
        };
        messages::insert_message(&mut conn, &msg).await.unwrap();
        drop(conn);
        follows::follow(&db.pool, kept, me.id).await.unwrap();
        let ledger = transport_items::NewTransportItem {
            transport_id: "t-gone".into(),
            direction: ItemDirection::Incoming,
            status: ItemStatus::Waiting,
            received_at: 1,
            sender: "alice".into(),
            receiver: "bob".into(),
            sent_at: None,
            payload: "{}".into(),
        };
        transport_items::record(&db.pool, &ledger).await.unwrap();

        let candidates = list_unfollowed(&db.pool).await.unwrap();
        assert_eq!(candidates.iter().map(|c| c.id).collect::<Vec<_>>(), vec![gone]);

        assert!(!delete_if_unfollowed(&db.pool, kept).await.unwrap());
        assert!(delete_if_unfollowed(&db.pool, gone).await.unwrap());
        assert!(find_by_id(&db.pool, gone).await.unwrap().is_none());
        assert!(!messages::exists(&db.pool, "t-gone").await.unwrap());
        assert!(transport_items::find(&db.pool, "t-gone").await.unwrap().is_none());
    }
}
