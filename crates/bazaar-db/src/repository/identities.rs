//! Local identity repository: addresses this node holds signing keys for.

use bazaar_common::models::{Identity, IdentityId};
use sqlx::{any::AnyRow, AnyPool, Row};

/// An identity together with its persisted Ed25519 seed.
#[derive(Debug, Clone)]
pub struct IdentityKey {
    pub identity: Identity,
    pub seed_hex: String,
}

impl<'r> sqlx::FromRow<'r, AnyRow> for IdentityKey {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(IdentityKey {
            identity: Identity::from_row(row)?,
            seed_hex: row.try_get("seed_hex")?,
        })
    }
}

/// Register an identity. Registering an address twice keeps the first row.
pub async fn create_identity(
    pool: &AnyPool,
    wallet: &str,
    address: &str,
    seed_hex: &str,
    now: i64,
) -> Result<Identity, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO identities (wallet, address, seed_hex, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (address) DO NOTHING
        "#,
    )
    .bind(wallet)
    .bind(address)
    .bind(seed_hex)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Identity>("SELECT id, wallet, address FROM identities WHERE address = ?")
        .bind(address)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &AnyPool, id: IdentityId) -> Result<Option<Identity>, sqlx::Error> {
    sqlx::query_as::<_, Identity>("SELECT id, wallet, address FROM identities WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_address(pool: &AnyPool, address: &str) -> Result<Option<Identity>, sqlx::Error> {
    sqlx::query_as::<_, Identity>("SELECT id, wallet, address FROM identities WHERE address = ?")
        .bind(address)
        .fetch_optional(pool)
        .await
}

/// All identities of a wallet with their seeds, oldest first.
pub async fn list_for_wallet(pool: &AnyPool, wallet: &str) -> Result<Vec<IdentityKey>, sqlx::Error> {
    sqlx::query_as::<_, IdentityKey>(
        "SELECT id, wallet, address, seed_hex FROM identities WHERE wallet = ? ORDER BY id",
    )
    .bind(wallet)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn create_is_idempotent_per_address() {
        let db = Database::connect_in_memory().await.unwrap();
        let a = create_identity(&db.pool, "market", "addr-1", "aa", 1).await.unwrap();
        let b = create_identity(&db.pool, "market", "addr-1", "bb", 2).await.unwrap();
        assert_eq!(a, b);

        let keys = list_for_wallet(&db.pool, "market").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].seed_hex, "aa");

        assert_eq!(find_by_id(&db.pool, a.id).await.unwrap(), Some(a.clone()));
        assert_eq!(find_by_address(&db.pool, "addr-1").await.unwrap(), Some(a));
        assert!(list_for_wallet(&db.pool, "other").await.unwrap().is_empty());
    }
}
