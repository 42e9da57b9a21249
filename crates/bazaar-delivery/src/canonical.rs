//! Canonical payloads and content digests for message envelopes.
//!
//! A [`FieldSet`] is an explicit, versioned, ordered list of
//! `(source field, canonical name)` pairs. The canonical payload is a compact
//! JSON object written pair by pair in declared order, never in map iteration
//! order, so sender and receiver produce byte-identical output:
//!
//! ```text
//! {"v":1,"type":"CHANNEL_MESSAGE","sender":"...","channel":"...", ...}
//! ```
//!
//! Two sets cover the same envelope. [`SIGNABLE_V1`] is what the sender signs;
//! [`HASHABLE_V1`] is what the content digest covers. They differ on purpose:
//! the digest also binds `receiver`, `generated` and the signature itself.
//!
//! | # | signable      | hashable      |
//! |---|---------------|---------------|
//! | 1 | `type`        | `type`        |
//! | 2 | `sender`      | `sender`      |
//! | 3 | `channel`     | `receiver`    |
//! | 4 | `channelType` | `channel`     |
//! | 5 | `message`     | `channelType` |
//! | 6 |               | `message`     |
//! | 7 |               | `generated`   |
//! | 8 |               | `signature`   |

use bazaar_common::models::MessageEnvelope;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Versioned, ordered field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet {
    pub version: u32,
    /// `(source field, canonical name)` pairs in serialization order.
    pub fields: &'static [(&'static str, &'static str)],
}

/// Fields covered by the sender's signature.
pub const SIGNABLE_V1: FieldSet = FieldSet {
    version: 1,
    fields: &[
        ("type", "type"),
        ("sender", "sender"),
        ("channel", "channel"),
        ("channelType", "channelType"),
        ("message", "message"),
    ],
};

/// Fields covered by the content digest.
pub const HASHABLE_V1: FieldSet = FieldSet {
    version: 1,
    fields: &[
        ("type", "type"),
        ("sender", "sender"),
        ("receiver", "receiver"),
        ("channel", "channel"),
        ("channelType", "channelType"),
        ("message", "message"),
        ("generated", "generated"),
        ("signature", "signature"),
    ],
};

/// Canonical payload of `source` under `set`. Missing source fields are
/// written as `null`.
pub fn payload(set: &FieldSet, source: &Value) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("{\"v\":");
    out.push_str(&set.version.to_string());
    for (src, name) in set.fields {
        out.push(',');
        // Value and &str serialization cannot fail.
        out.push_str(&Value::from(*name).to_string());
        out.push(':');
        out.push_str(&source.get(*src).unwrap_or(&Value::Null).to_string());
    }
    out.push('}');
    out
}

/// SHA-256 of the canonical payload, hex-encoded.
pub fn digest(set: &FieldSet, source: &Value) -> String {
    hex::encode(Sha256::digest(payload(set, source).as_bytes()))
}

/// Signable payload of an envelope.
pub fn signable_payload(envelope: &MessageEnvelope) -> Result<String, serde_json::Error> {
    Ok(payload(&SIGNABLE_V1, &serde_json::to_value(envelope)?))
}

/// Content digest of an envelope.
pub fn envelope_digest(envelope: &MessageEnvelope) -> Result<String, serde_json::Error> {
    Ok(digest(&HASHABLE_V1, &serde_json::to_value(envelope)?))
}
