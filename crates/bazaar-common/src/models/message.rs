//! Message models: the wire envelope, the transport item that carries it,
//! and the annotated view returned by channel listings.
//!
//! The envelope is symmetric: the sender builds exactly this object, the
//! receiver decodes exactly this object, and both compute the same canonical
//! digest over it.

use serde::{Deserialize, Serialize};

use super::ChannelType;

/// Application action carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    ChannelMessage,
}

/// Signed, content-addressed message envelope (wire format).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// Content address of the listing or order the channel is bound to
    pub channel: String,

    pub channel_type: ChannelType,

    pub sender: String,

    pub receiver: String,

    /// UTF-8 body text
    pub message: String,

    /// Unix ms at which the sender generated the envelope
    pub generated: i64,

    /// Sender signature over the signable field set
    pub signature: String,

    /// Content digest over the hashable field set
    pub hash: String,
}

/// One item as delivered by the store-and-forward transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportItem {
    /// Transport-assigned id; global dedup key
    pub transport_id: String,

    pub from: String,

    pub to: String,

    /// Unix ms the transport claims the item was sent at
    #[serde(default)]
    pub sent_at: Option<i64>,

    /// Undecoded application payload (expected to be a [`MessageEnvelope`])
    pub payload: serde_json::Value,
}

/// Sort direction for channel message pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// A channel message annotated for one reading identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub transport_id: String,
    pub channel: String,
    pub channel_type: ChannelType,
    pub sender: String,
    pub sender_label: Option<String>,
    pub receiver: String,
    pub body: String,
    pub created_at: i64,
    /// Reader's watermark has reached this message
    pub is_read: bool,
    /// The reading identity authored this message
    pub is_own: bool,
}
