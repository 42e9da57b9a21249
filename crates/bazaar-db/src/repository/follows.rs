//! Follow repository: which local identity subscribes to which channel, and
//! how far it has read.
//!
//! The read watermark only moves forward: `set_last_read` is a conditional
//! update, so out-of-order "mark read" calls can never regress it.

use bazaar_common::models::{ChannelId, IdentityId};
use sqlx::{Any, AnyPool, Executor, Row};

/// Follow row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowRow {
    pub channel_id: ChannelId,
    pub identity_id: IdentityId,
    pub last_read: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for FollowRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        Ok(FollowRow {
            channel_id: row.try_get("channel_id")?,
            identity_id: row.try_get("identity_id")?,
            last_read: row.try_get("last_read")?,
        })
    }
}

/// Subscribe an identity to a channel. Returns true if a new follow was created;
/// following an already-followed channel is a no-op.
pub async fn follow<'e, E>(
    executor: E,
    channel_id: ChannelId,
    identity_id: IdentityId,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO follows (channel_id, identity_id, last_read)
        VALUES (?, ?, 0)
        ON CONFLICT (channel_id, identity_id) DO NOTHING
        "#,
    )
    .bind(channel_id)
    .bind(identity_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove a follow. Returns true if one existed.
pub async fn unfollow<'e, E>(
    executor: E,
    channel_id: ChannelId,
    identity_id: IdentityId,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query("DELETE FROM follows WHERE channel_id = ? AND identity_id = ?")
        .bind(channel_id)
        .bind(identity_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Advance the read watermark to `timestamp` if it is ahead of the stored one.
/// Returns true if the watermark moved.
pub async fn set_last_read<'e, E>(
    executor: E,
    channel_id: ChannelId,
    identity_id: IdentityId,
    timestamp: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query(
        r#"
        UPDATE follows SET last_read = ?
        WHERE channel_id = ? AND identity_id = ? AND last_read < ?
        "#,
    )
    .bind(timestamp)
    .bind(channel_id)
    .bind(identity_id)
    .bind(timestamp)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Get an identity's follow of a channel.
pub async fn get_follow(
    pool: &AnyPool,
    channel_id: ChannelId,
    identity_id: IdentityId,
) -> Result<Option<FollowRow>, sqlx::Error> {
    sqlx::query_as::<_, FollowRow>(
        "SELECT channel_id, identity_id, last_read FROM follows WHERE channel_id = ? AND identity_id = ?",
    )
    .bind(channel_id)
    .bind(identity_id)
    .fetch_optional(pool)
    .await
}

/// Identities following a channel (fan-out audience).
pub async fn list_followers(
    pool: &AnyPool,
    channel_id: ChannelId,
) -> Result<Vec<IdentityId>, sqlx::Error> {
    let rows = sqlx::query("SELECT identity_id FROM follows WHERE channel_id = ? ORDER BY identity_id")
        .bind(channel_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(|r| r.try_get("identity_id")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{channels, identities};
    use crate::Database;
    use bazaar_common::models::ChannelType;

    async fn setup() -> (Database, ChannelId, IdentityId) {
        let db = Database::connect_in_memory().await.unwrap();
        let me = identities::create_identity(&db.pool, "market", "addr-me", "00", 0).await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let ch = channels::ensure_channel(&mut conn, "abc123", ChannelType::Listing, 0).await.unwrap();
        drop(conn);
        (db, ch, me.id)
    }

    #[tokio::test]
    async fn follow_and_unfollow_are_idempotent() {
        let (db, ch, me) = setup().await;

        assert!(follow(&db.pool, ch, me).await.unwrap());
        assert!(!follow(&db.pool, ch, me).await.unwrap());
        assert_eq!(list_followers(&db.pool, ch).await.unwrap(), vec![me]);

        assert!(unfollow(&db.pool, ch, me).await.unwrap());
        assert!(!unfollow(&db.pool, ch, me).await.unwrap());
        assert!(list_followers(&db.pool, ch).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_watermark_never_regresses() {
        let (db, ch, me) = setup().await;
        follow(&db.pool, ch, me).await.unwrap();

        assert!(set_last_read(&db.pool, ch, me, 2_000).await.unwrap());
        assert!(!set_last_read(&db.pool, ch, me, 1_000).await.unwrap());
        assert!(!set_last_read(&db.pool, ch, me, 2_000).await.unwrap());

        let row = get_follow(&db.pool, ch, me).await.unwrap().unwrap();
        assert_eq!(row.last_read, 2_000);
    }

    #[tokio::test]
    async fn following_again_keeps_the_watermark() {
        let (db, ch, me) = setup().await;
        follow(&db.pool, ch, me).await.unwrap();
        set_last_read(&db.pool, ch, me, 500).await.unwrap();
        follow(&db.pool, ch, me).await.unwrap();
        assert_eq!(get_follow(&db.pool, ch, me).await.unwrap().unwrap().last_read, 500);
    }
}
