//! Participant repository: authors of channel messages and their labels.

use bazaar_common::models::{normalize_label, Participant, ParticipantId};
use sqlx::{AnyConnection, AnyPool, Row};

/// Return the id of the participant with `address`, creating it if absent.
pub async fn ensure_participant(
    conn: &mut AnyConnection,
    address: &str,
) -> Result<ParticipantId, sqlx::Error> {
    sqlx::query("INSERT INTO participants (address) VALUES (?) ON CONFLICT (address) DO NOTHING")
        .bind(address)
        .execute(&mut *conn)
        .await?;

    let row = sqlx::query("SELECT id FROM participants WHERE address = ?")
        .bind(address)
        .fetch_one(&mut *conn)
        .await?;
    row.try_get("id")
}

/// Find a participant by address.
pub async fn find_by_address(
    pool: &AnyPool,
    address: &str,
) -> Result<Option<Participant>, sqlx::Error> {
    sqlx::query_as::<_, Participant>("SELECT id, address, label FROM participants WHERE address = ?")
        .bind(address)
        .fetch_optional(pool)
        .await
}

/// Set or clear the label of a participant, creating the participant if it
/// has never posted. Blank labels are stored as NULL.
pub async fn upsert_label(
    pool: &AnyPool,
    address: &str,
    label: Option<&str>,
) -> Result<Participant, sqlx::Error> {
    let label = normalize_label(label);
    sqlx::query(
        r#"
        INSERT INTO participants (address, label) VALUES (?, ?)
        ON CONFLICT (address) DO UPDATE SET label = excluded.label
        "#,
    )
    .bind(address)
    .bind(label)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Participant>("SELECT id, address, label FROM participants WHERE address = ?")
        .bind(address)
        .fetch_one(pool)
        .await
}

/// Participants carrying a label (the saved / known list).
pub async fn list_labelled(pool: &AnyPool) -> Result<Vec<Participant>, sqlx::Error> {
    sqlx::query_as::<_, Participant>(
        "SELECT id, address, label FROM participants WHERE label IS NOT NULL ORDER BY label, id",
    )
    .fetch_all(pool)
    .await
}

/// Delete participants that have neither a message nor a label. Returns count deleted.
pub async fn delete_orphans(pool: &AnyPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM participants
        WHERE label IS NULL
          AND NOT EXISTS (SELECT 1 FROM messages m WHERE m.participant_id = participants.id)
        "#,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
