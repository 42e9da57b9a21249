//! Manual `sqlx::FromRow<'_, sqlx::any::AnyRow>` implementations for the
//! bazaar-common model types.
//!
//! `sqlx::AnyPool` only decodes primitive types natively (i64, f64, bool,
//! String, bytes). Enum columns are stored as text and parsed here; computed
//! flags (`CASE WHEN ... THEN 1 ELSE 0 END`) come back as integers.
//!
//! The impls live next to the models because both the trait and the row type
//! are foreign to the repository crate.

use sqlx::{any::AnyRow, Row};

use crate::models::{
    channel::{has_unread, Channel, ChannelSummary, ChannelType},
    identity::Identity,
    message::MessageView,
    participant::Participant,
    transport_item::{ItemDirection, ItemStatus, WaitingItem},
};

// ── Internal helpers ──────────────────────────────────────────────────────────

fn parse_enum<T>(
    row: &AnyRow,
    col: &str,
    f: impl Fn(&str) -> Option<T>,
) -> Result<T, sqlx::Error> {
    let s: String = row.try_get(col)?;
    f(&s).ok_or_else(|| sqlx::Error::Decode(format!("unknown enum variant in {col}: {s}").into()))
}

fn flag(row: &AnyRow, col: &str) -> Result<bool, sqlx::Error> {
    let v: i64 = row.try_get(col)?;
    Ok(v != 0)
}

// ── Channel ───────────────────────────────────────────────────────────────────

impl<'r> sqlx::FromRow<'r, AnyRow> for Channel {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Channel {
            id: row.try_get("id")?,
            hash: row.try_get("hash")?,
            channel_type: parse_enum(row, "channel_type", ChannelType::parse)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, AnyRow> for ChannelSummary {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        let newest_message_at: Option<i64> = row.try_get("newest_message_at")?;
        let last_read: i64 = row.try_get("last_read")?;
        Ok(ChannelSummary {
            id: row.try_get("id")?,
            hash: row.try_get("hash")?,
            channel_type: parse_enum(row, "channel_type", ChannelType::parse)?,
            participant_count: row.try_get("participant_count")?,
            newest_message_at,
            last_read,
            has_unread: has_unread(newest_message_at, last_read),
        })
    }
}

// ── Participant / Identity ───────────────────────────────────────────────────

impl<'r> sqlx::FromRow<'r, AnyRow> for Participant {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Participant {
            id: row.try_get("id")?,
            address: row.try_get("address")?,
            label: row.try_get("label")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, AnyRow> for Identity {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Identity {
            id: row.try_get("id")?,
            wallet: row.try_get("wallet")?,
            address: row.try_get("address")?,
        })
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

impl<'r> sqlx::FromRow<'r, AnyRow> for MessageView {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(MessageView {
            transport_id: row.try_get("transport_id")?,
            channel: row.try_get("channel")?,
            channel_type: parse_enum(row, "channel_type", ChannelType::parse)?,
            sender: row.try_get("sender")?,
            sender_label: row.try_get("sender_label")?,
            receiver: row.try_get("receiver")?,
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
            is_read: flag(row, "is_read")?,
            is_own: flag(row, "is_own")?,
        })
    }
}

// ── Transport items ───────────────────────────────────────────────────────────

impl<'r> sqlx::FromRow<'r, AnyRow> for WaitingItem {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(WaitingItem {
            transport_id: row.try_get("transport_id")?,
            direction: parse_enum(row, "direction", ItemDirection::parse)?,
            status: parse_enum(row, "status", ItemStatus::parse)?,
            processed_count: row.try_get("processed_count")?,
            processed_at: row.try_get("processed_at")?,
            received_at: row.try_get("received_at")?,
            sender: row.try_get("sender")?,
            receiver: row.try_get("receiver")?,
            sent_at: row.try_get("sent_at")?,
            payload: row.try_get("payload")?,
        })
    }
}
