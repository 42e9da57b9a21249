//! Repository layer: query functions organized by table.

pub mod channels;
pub mod follows;
pub mod identities;
pub mod messages;
pub mod participants;
pub mod transport_items;
