//! Transport item bookkeeping: the waiting set of the retry scheduler.
//!
//! Every inbound item is recorded before processing. Items that could not be
//! accepted for a transient reason stay `WAITING` and are picked up again by
//! the retry poller according to their attempt count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemDirection {
    Incoming,
    Outgoing,
}

impl ItemDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "INCOMING",
            Self::Outgoing => "OUTGOING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INCOMING" => Some(Self::Incoming),
            "OUTGOING" => Some(Self::Outgoing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    /// Recorded, first pass not finished
    New,
    /// Not yet accepted; eligible for scheduler-driven retries
    Waiting,
    /// Accepted (or found to be already stored)
    Processed,
    /// Permanently rejected (forged, malformed, tampered)
    Ignored,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Waiting => "WAITING",
            Self::Processed => "PROCESSED",
            Self::Ignored => "IGNORED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "WAITING" => Some(Self::Waiting),
            "PROCESSED" => Some(Self::Processed),
            "IGNORED" => Some(Self::Ignored),
            _ => None,
        }
    }
}

/// A recorded transport item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingItem {
    pub transport_id: String,
    pub direction: ItemDirection,
    pub status: ItemStatus,
    pub processed_count: i64,
    /// Unix ms of the last processing attempt (0 if never attempted)
    pub processed_at: i64,
    pub received_at: i64,
    pub sender: String,
    pub receiver: String,
    pub sent_at: Option<i64>,
    /// Raw application payload, JSON text
    pub payload: String,
}
