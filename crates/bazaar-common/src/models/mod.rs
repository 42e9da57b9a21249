//! Core domain models shared across all Bazaar crates.
//!
//! These are the "truth" types: what the channel store persists, what the
//! transport carries, and what the channel service hands back to callers.
//! Row ids are store-assigned integers; the transport id of a message is the
//! global dedup key.

pub mod channel;
pub mod identity;
pub mod message;
pub mod participant;
pub mod transport_item;

/// Re-export all model types for convenience.
pub use channel::*;
pub use identity::*;
pub use message::*;
pub use participant::*;
pub use transport_item::*;

/// Store id of a channel row.
pub type ChannelId = i64;
/// Store id of a local identity row.
pub type IdentityId = i64;
/// Store id of a participant row.
pub type ParticipantId = i64;
