//! Shared fixtures for the delivery integration tests: an in-memory store, a
//! local keyring, and scripted transport / directory collaborators.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use bazaar_common::{
    models::{ChannelType, Identity, MessageEnvelope, TransportItem},
    notification::NotificationEvent,
};
use bazaar_db::{repository::identities, Database};
use bazaar_delivery::{
    directory::ChannelDirectory, ChannelService, DirectoryError, Fanout, InboundPipeline,
    InboundProcessor, LocalWallet, ManualClock, OutboundPipeline, SendOptions, SizeLimits,
    TransmitReceipt, Transport, TransportError, WalletKeyPair,
};
use tokio::sync::broadcast;

pub const NOW: i64 = 1_700_000_000_000;
pub const WALLET: &str = "market";

/// Relay double: records every envelope and hands out sequential ids.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Mutex<Vec<(MessageEnvelope, SendOptions)>>,
    next_id: AtomicU64,
    pub fail_with: Mutex<Option<String>>,
    pub status: Mutex<Option<String>>,
}

impl MockTransport {
    pub fn sent(&self) -> Vec<(MessageEnvelope, SendOptions)> {
        self.sent.lock().unwrap().clone()
    }

    /// The last transmitted envelope as the receiving side gets it.
    pub fn delivered(&self, transport_id: &str) -> TransportItem {
        let (envelope, options) = self.sent.lock().unwrap().last().cloned().unwrap();
        TransportItem {
            transport_id: transport_id.to_owned(),
            from: envelope.sender.clone(),
            to: options.receiver,
            sent_at: Some(envelope.generated),
            payload: serde_json::to_value(&envelope).unwrap(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        envelope: &MessageEnvelope,
        options: &SendOptions,
    ) -> Result<TransmitReceipt, TransportError> {
        if let Some(msg) = self.fail_with.lock().unwrap().clone() {
            return Err(TransportError::Http(msg));
        }
        self.sent.lock().unwrap().push((envelope.clone(), options.clone()));
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let status = self.status.lock().unwrap().clone().unwrap_or_else(|| "sent".into());
        if status != "sent" {
            return Err(TransportError::MalformedResponse(format!("status '{status}'")));
        }
        Ok(TransmitReceipt { transport_id: format!("relay-{n}"), status })
    }
}

/// Directory double with a fixed set of live objects and entitlements.
#[derive(Default)]
pub struct MockDirectory {
    pub live: Mutex<HashSet<(ChannelType, String)>>,
    pub entitled: Mutex<HashMap<(ChannelType, String), Vec<String>>>,
    pub down: Mutex<bool>,
}

impl MockDirectory {
    pub fn add_live(&self, ty: ChannelType, hash: &str) {
        self.live.lock().unwrap().insert((ty, hash.to_owned()));
    }

    pub fn entitle(&self, ty: ChannelType, hash: &str, address: &str) {
        self.entitled
            .lock()
            .unwrap()
            .entry((ty, hash.to_owned()))
            .or_default()
            .push(address.to_owned());
    }
}

#[async_trait]
impl ChannelDirectory for MockDirectory {
    async fn exists(&self, channel_type: ChannelType, hash: &str) -> Result<bool, DirectoryError> {
        if *self.down.lock().unwrap() {
            return Err(DirectoryError::UnexpectedStatus(503));
        }
        Ok(self.live.lock().unwrap().contains(&(channel_type, hash.to_owned())))
    }

    async fn entitled_identities(
        &self,
        channel_type: ChannelType,
        hash: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        if *self.down.lock().unwrap() {
            return Err(DirectoryError::UnexpectedStatus(503));
        }
        Ok(self
            .entitled
            .lock()
            .unwrap()
            .get(&(channel_type, hash.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}

/// One node: store, keyring, pipelines, and its collaborators.
pub struct Node {
    pub db: Database,
    pub wallet: Arc<LocalWallet>,
    pub transport: Arc<MockTransport>,
    pub directory: Arc<MockDirectory>,
    pub clock: Arc<ManualClock>,
    pub outbound: OutboundPipeline,
    pub processor: Arc<InboundProcessor>,
    pub service: Arc<ChannelService>,
    pub events: broadcast::Receiver<NotificationEvent>,
}

impl Node {
    pub async fn new() -> Self {
        Self::with_limits(SizeLimits::default()).await
    }

    pub async fn with_limits(limits: SizeLimits) -> Self {
        let db = Database::connect_in_memory().await.unwrap();
        let wallet = Arc::new(LocalWallet::new());
        let transport = Arc::new(MockTransport::default());
        let directory = Arc::new(MockDirectory::default());
        let clock = Arc::new(ManualClock::new(NOW));
        let (tx, events) = broadcast::channel(64);

        let outbound = OutboundPipeline::new(
            db.clone(),
            wallet.clone(),
            transport.clone(),
            clock.clone(),
            limits,
            2000,
        );
        let pipeline = InboundPipeline::new(
            db.clone(),
            wallet.clone(),
            directory.clone(),
            Fanout::new(db.clone(), tx),
            clock.clone(),
        );
        let processor = Arc::new(InboundProcessor::new(pipeline, db.clone(), clock.clone()));
        let service = Arc::new(ChannelService::new(db.clone(), directory.clone()));

        Self { db, wallet, transport, directory, clock, outbound, processor, service, events }
    }

    /// Register a fresh local identity in the default wallet.
    pub async fn identity(&self) -> Identity {
        let kp = WalletKeyPair::generate();
        let seed = kp.seed_hex();
        let address = self.wallet.insert_key(WALLET, kp).await;
        identities::create_identity(&self.db.pool, WALLET, &address, &seed, NOW).await.unwrap()
    }
}

/// Count stored message rows.
pub async fn message_count(db: &Database) -> i64 {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages").fetch_one(&db.pool).await.unwrap();
    n
}

/// Make every message read or write fail until [`messages_online`] runs.
pub async fn messages_offline(db: &Database) {
    sqlx::query("ALTER TABLE messages RENAME TO messages_offline").execute(&db.pool).await.unwrap();
}

pub async fn messages_online(db: &Database) {
    sqlx::query("ALTER TABLE messages_offline RENAME TO messages").execute(&db.pool).await.unwrap();
}
