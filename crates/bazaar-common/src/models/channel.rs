//! Channel model: a conversation bound to a business object.
//!
//! A channel is addressed by the content hash of a listing or an order. The
//! channel type keeps the two hash spaces apart, so `(hash, channel_type)` is
//! the natural key and `id` is only a stable store handle.

use serde::{Deserialize, Serialize};

use super::ChannelId;

/// A channel as persisted by the channel store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,

    /// Content address of the business object
    pub hash: String,

    pub channel_type: ChannelType,

    /// Unix ms when the first message provisioned this channel
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelType {
    /// Questions and answers around a listing
    Listing,
    /// Buyer/seller conversation on an order
    Order,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "LISTING",
            Self::Order => "ORDER",
        }
    }

    /// Parse the stored / wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LISTING" => Some(Self::Listing),
            "ORDER" => Some(Self::Order),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A followed channel, annotated for a channel list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub hash: String,
    pub channel_type: ChannelType,
    /// Distinct authors that have posted on the channel
    pub participant_count: i64,
    pub newest_message_at: Option<i64>,
    pub last_read: i64,
    pub has_unread: bool,
}

/// Whether a channel has something newer than the reader's watermark.
///
/// Strict comparison: a message created exactly at `last_read` counts as read.
pub fn has_unread(newest_message_at: Option<i64>, last_read: i64) -> bool {
    newest_message_at.is_some_and(|newest| newest > last_read)
}
