//! Participant model: a network address that authored a message.

use serde::{Deserialize, Serialize};

use super::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,

    /// Network address of the author
    pub address: String,

    /// User-assigned name; independent of message history
    pub label: Option<String>,
}

/// Normalize a label for storage: blank labels are stored as NULL.
pub fn normalize_label(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
}
