//! Inbound validation pipeline and the processor that owns transport items.
//!
//! [`InboundPipeline::accept`] takes one transport item through:
//!
//! 1. typed decode of the envelope plus non-empty checks
//! 2. dedup on the transport id
//! 3. signature check against the claimed sender
//! 4. content digest check
//! 5. `createdAt` from `sentAt` when it is a sane past timestamp
//! 6. channel / participant / message insert in one transaction
//! 7. auto-follow of entitled local identities (best effort)
//! 8. fan-out to followers (best effort)
//!
//! Steps 1-6 are hard rejects with nothing persisted. [`InboundProcessor`]
//! records each item in the transport ledger and settles it from the outcome:
//! retryable failures stay `WAITING` for the retry scheduler, anything settled
//! for good is removed from the ledger.

use std::sync::Arc;

use bazaar_common::models::{
    ChannelId, ItemDirection, ItemStatus, MessageEnvelope, TransportItem, WaitingItem,
};
use bazaar_db::{
    repository::{channels, follows, identities, messages, participants, transport_items},
    Database,
};
use tracing::{debug, info, warn};

use crate::{
    canonical::{envelope_digest, signable_payload},
    clock::Clock,
    directory::ChannelDirectory,
    error::Rejection,
    fanout::Fanout,
    signatures::MessageSigner,
};

/// A message that passed every check and was stored.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub channel_id: ChannelId,
    pub envelope: MessageEnvelope,
    pub created_at: i64,
}

pub struct InboundPipeline {
    db: Database,
    signer: Arc<dyn MessageSigner>,
    directory: Arc<dyn ChannelDirectory>,
    fanout: Fanout,
    clock: Arc<dyn Clock>,
}

impl InboundPipeline {
    pub fn new(
        db: Database,
        signer: Arc<dyn MessageSigner>,
        directory: Arc<dyn ChannelDirectory>,
        fanout: Fanout,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, signer, directory, fanout, clock }
    }

    /// Accept or drop one item. Rejections are logged, never returned.
    pub async fn receive(&self, item: &TransportItem) -> bool {
        match self.accept(item).await {
            Ok(_) => true,
            Err(rejection) => {
                warn!(transport_id = %item.transport_id, from = %item.from, "Inbound message rejected: {rejection}");
                false
            }
        }
    }

    pub async fn accept(&self, item: &TransportItem) -> Result<Accepted, Rejection> {
        let envelope = decode(item)?;

        if messages::exists(&self.db.pool, &item.transport_id).await? {
            return Err(Rejection::DuplicateRejected(item.transport_id.clone()));
        }

        let signable = signable_payload(&envelope).map_err(|e| Rejection::ValidationRejected(e.to_string()))?;
        if !self
            .signer
            .verify(&envelope.sender, &envelope.signature, signable.as_bytes())
            .await
        {
            return Err(Rejection::SignatureInvalid(envelope.sender.clone()));
        }

        let computed = envelope_digest(&envelope).map_err(|e| Rejection::ValidationRejected(e.to_string()))?;
        if computed != envelope.hash {
            return Err(Rejection::HashMismatch { claimed: envelope.hash.clone(), computed });
        }

        let now = self.clock.now_ms();
        let created_at = item.sent_at.filter(|&t| t > 0 && t <= now).unwrap_or(now);

        let channel_id = self.persist(&item.transport_id, &envelope, created_at).await?;
        info!(
            transport_id = %item.transport_id,
            channel = %envelope.channel,
            channel_type = %envelope.channel_type,
            "Inbound message stored"
        );

        self.auto_follow(channel_id, &envelope).await;

        if let Err(e) = self.fanout.notify(channel_id, &envelope, created_at).await {
            warn!(channel_id, "Fan-out failed: {e}");
        }

        Ok(Accepted { channel_id, envelope, created_at })
    }

    async fn persist(
        &self,
        transport_id: &str,
        envelope: &MessageEnvelope,
        created_at: i64,
    ) -> Result<ChannelId, Rejection> {
        let mut tx = self.db.pool.begin().await?;

        let channel_id =
            channels::ensure_channel(&mut *tx, &envelope.channel, envelope.channel_type, created_at).await?;
        let participant_id = participants::ensure_participant(&mut *tx, &envelope.sender).await?;
        let msg = messages::NewMessage {
            transport_id: transport_id.to_owned(),
            channel_id,
            participant_id,
            receiver: envelope.receiver.clone(),
            created_at,
            body: envelope.message.clone(),
        };
        if !messages::insert_message(&mut *tx, &msg).await? {
            // Lost the race against another path storing the same item.
            tx.rollback().await?;
            return Err(Rejection::DuplicateRejected(transport_id.to_owned()));
        }

        tx.commit().await?;
        Ok(channel_id)
    }

    async fn auto_follow(&self, channel_id: ChannelId, envelope: &MessageEnvelope) {
        let addresses = match self
            .directory
            .entitled_identities(envelope.channel_type, &envelope.channel)
            .await
        {
            Ok(a) => a,
            Err(e) => {
                warn!(channel = %envelope.channel, "Auto-follow lookup failed: {e}");
                return;
            }
        };

        for address in addresses {
            let identity = match identities::find_by_address(&self.db.pool, &address).await {
                Ok(Some(identity)) => identity,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%address, "Auto-follow identity lookup failed: {e}");
                    continue;
                }
            };
            match follows::follow(&self.db.pool, channel_id, identity.id).await {
                Ok(true) => debug!(channel_id, identity_id = identity.id, "Auto-followed channel"),
                Ok(false) => {}
                Err(e) => warn!(channel_id, identity_id = identity.id, "Auto-follow failed: {e}"),
            }
        }
    }
}

fn decode(item: &TransportItem) -> Result<MessageEnvelope, Rejection> {
    if item.transport_id.trim().is_empty() {
        return Err(Rejection::ValidationRejected("empty transport id".into()));
    }
    let envelope: MessageEnvelope = serde_json::from_value(item.payload.clone())
        .map_err(|e| Rejection::ValidationRejected(e.to_string()))?;

    let required = [
        ("channel", &envelope.channel),
        ("sender", &envelope.sender),
        ("receiver", &envelope.receiver),
        ("message", &envelope.message),
        ("signature", &envelope.signature),
        ("hash", &envelope.hash),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(Rejection::ValidationRejected(format!("empty {field}")));
    }
    Ok(envelope)
}

/// Settled status of an item after one processing attempt.
pub fn settle(outcome: &Result<Accepted, Rejection>) -> ItemStatus {
    match outcome {
        Ok(_) | Err(Rejection::DuplicateRejected(_)) => ItemStatus::Processed,
        Err(r) if r.is_retryable() => ItemStatus::Waiting,
        Err(_) => ItemStatus::Ignored,
    }
}

/// Result of handing one item to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub accepted: bool,
    pub status: ItemStatus,
}

/// Owner of the transport ledger: records items, runs them through the
/// pipeline, and settles their status.
pub struct InboundProcessor {
    pipeline: InboundPipeline,
    db: Database,
    clock: Arc<dyn Clock>,
}

impl InboundProcessor {
    pub fn new(pipeline: InboundPipeline, db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { pipeline, db, clock }
    }

    pub fn pipeline(&self) -> &InboundPipeline {
        &self.pipeline
    }

    /// First-pass handling of an item fresh off the transport.
    pub async fn process(&self, item: &TransportItem) -> Result<ProcessOutcome, sqlx::Error> {
        if item.transport_id.trim().is_empty() {
            warn!(from = %item.from, "Transport item without id dropped");
            return Ok(ProcessOutcome { accepted: false, status: ItemStatus::Ignored });
        }
        let record = transport_items::NewTransportItem {
            transport_id: item.transport_id.clone(),
            direction: ItemDirection::Incoming,
            status: ItemStatus::New,
            received_at: self.clock.now_ms(),
            sender: item.from.clone(),
            receiver: item.to.clone(),
            sent_at: item.sent_at,
            payload: item.payload.to_string(),
        };
        if !transport_items::record(&self.db.pool, &record).await? {
            debug!(transport_id = %item.transport_id, "Transport item redelivered");
        }
        self.attempt(item).await
    }

    /// Scheduler-driven retry of a waiting item.
    pub async fn reprocess(&self, waiting: &WaitingItem) -> Result<ProcessOutcome, sqlx::Error> {
        let payload = match serde_json::from_str(&waiting.payload) {
            Ok(p) => p,
            Err(e) => {
                warn!(transport_id = %waiting.transport_id, "Stored payload unreadable: {e}");
                transport_items::delete(&self.db.pool, &waiting.transport_id).await?;
                return Ok(ProcessOutcome { accepted: false, status: ItemStatus::Ignored });
            }
        };
        let item = TransportItem {
            transport_id: waiting.transport_id.clone(),
            from: waiting.sender.clone(),
            to: waiting.receiver.clone(),
            sent_at: waiting.sent_at,
            payload,
        };
        self.attempt(&item).await
    }

    async fn attempt(&self, item: &TransportItem) -> Result<ProcessOutcome, sqlx::Error> {
        let outcome = self.pipeline.accept(item).await;
        if let Err(rejection) = &outcome {
            warn!(transport_id = %item.transport_id, from = %item.from, "Inbound message rejected: {rejection}");
        }
        let status = settle(&outcome);
        if status == ItemStatus::Waiting {
            transport_items::mark_attempt(&self.db.pool, &item.transport_id, status, self.clock.now_ms()).await?;
        } else {
            transport_items::delete(&self.db.pool, &item.transport_id).await?;
        }
        Ok(ProcessOutcome { accepted: outcome.is_ok(), status })
    }
}
