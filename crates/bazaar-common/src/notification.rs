//! Notification events: shared between the delivery engine and whatever
//! transport forwards them to clients.
//!
//! The delivery pipeline emits one event per accepted message, addressed to
//! every local identity following the channel. The consumer side (websocket
//! gateway, push relay, ...) lives outside this workspace.

use serde::{Deserialize, Serialize};

use crate::models::{ChannelType, IdentityId};

/// Event type for a newly stored channel message.
pub const CHANNEL_MESSAGE: &str = "CHANNEL_MESSAGE";

/// Event broadcast to the notification transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Event type (e.g., "CHANNEL_MESSAGE")
    pub event_type: String,
    pub sender: String,
    pub receiver: String,
    /// Channel hash
    pub channel: String,
    pub channel_type: ChannelType,
    /// Unix ms the message was stored as created
    pub created: i64,
    /// Local identities following the channel
    pub identities: Vec<IdentityId>,
}
