//! # bazaar-delivery
//!
//! Authenticated, content-addressed channel messaging over a store-and-forward
//! transport.
//!
//! ```text
//!  caller ── send ──► OutboundPipeline ── sign / hash / size ──► Transport ──► relay
//!                            │
//!                            └── persist ──► channel store
//!
//!  relay ── deliver ──► InboundProcessor ──► InboundPipeline ── verify / hash ──► channel store
//!                            │                      └── auto-follow, fan-out
//!                            └── WAITING ◄── Poller<WaitingRetry>
//! ```
//!
//! - **Canonical payloads** (`canonical.rs`): versioned ordered field sets and
//!   the SHA-256 content digest.
//! - **Signing** (`signatures.rs`, `keys.rs`, `key_manager.rs`): the
//!   `MessageSigner` adapter and the local Ed25519 keyring.
//! - **Pipelines** (`outbound.rs`, `inbound.rs`): send and receive.
//! - **Channel service** (`channels.rs`): listing, read state, follows, cleanup.
//! - **Scheduling** (`poller.rs`, `retry.rs`): the generic poll loop and its tasks.
//! - **Collaborators** (`transport.rs`, `directory.rs`): relay and
//!   business-object directory clients.

pub mod canonical;
pub mod channels;
pub mod clock;
pub mod directory;
pub mod error;
pub mod fanout;
pub mod inbound;
pub mod key_manager;
pub mod keys;
pub mod outbound;
pub mod poller;
pub mod retry;
pub mod signatures;
pub mod transport;

pub use channels::{ChannelService, CleanupReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DirectoryError, Rejection, SigningError, TransportError};
pub use fanout::Fanout;
pub use inbound::{InboundPipeline, InboundProcessor, ProcessOutcome};
pub use key_manager::KeyManager;
pub use keys::WalletKeyPair;
pub use outbound::{OutboundPipeline, SendParams};
pub use poller::{PollTask, Poller, PollerHandle, PollerStatus};
pub use retry::{should_reprocess, ChannelCleanup, WaitingRetry};
pub use signatures::{LocalWallet, MessageSigner};
pub use transport::{MessageClass, SendOptions, SizeLimits, TransmitReceipt, Transport};
