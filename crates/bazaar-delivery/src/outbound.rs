//! Outbound delivery pipeline.
//!
//! `send` is linear with early exit:
//!
//! 1. build the envelope from the caller's fields
//! 2. sign the signable payload
//! 3. stamp `generated` and compute the content digest
//! 4. check the serialized envelope against the class ceiling
//! 5. transmit
//! 6. persist channel, participant, message and follow in one transaction
//!
//! Steps 2-5 fail the send with a typed error and leave no trace. Step 6 runs
//! only after the relay accepted the message, so its failures are logged and
//! the transport id is still returned.

use std::sync::Arc;

use bazaar_common::{
    models::{ActionKind, ChannelType, IdentityId, MessageEnvelope},
    validation::{validate_body, validate_channel_hash, validate_request},
    BazaarError, BazaarResult,
};
use bazaar_db::{
    repository::{channels, follows, messages, participants},
    Database,
};
use serde::Deserialize;
use tracing::{error, info};
use validator::Validate;

use crate::{
    canonical::{envelope_digest, signable_payload},
    clock::Clock,
    signatures::MessageSigner,
    transport::{MessageClass, SendOptions, SizeLimits, Transport},
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    /// Wallet holding the sender's key
    #[validate(length(min = 1, message = "Wallet is required"))]
    pub wallet: String,

    #[validate(length(min = 1, message = "Sender is required"))]
    pub sender: String,

    #[validate(length(min = 1, message = "Receiver is required"))]
    pub receiver: String,

    pub channel: String,

    pub channel_type: ChannelType,

    pub body: String,

    #[serde(default)]
    pub class: MessageClass,

    /// Local identity to subscribe to the channel once the message is stored
    #[serde(default)]
    pub subscriber: Option<IdentityId>,
}

pub struct OutboundPipeline {
    db: Database,
    signer: Arc<dyn MessageSigner>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    limits: SizeLimits,
    max_message_length: u32,
}

impl OutboundPipeline {
    pub fn new(
        db: Database,
        signer: Arc<dyn MessageSigner>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        limits: SizeLimits,
        max_message_length: u32,
    ) -> Self {
        Self { db, signer, transport, clock, limits, max_message_length }
    }

    /// Send a channel message. Returns the transport-assigned id.
    pub async fn send(&self, params: SendParams) -> BazaarResult<String> {
        validate_request(&params)?;
        validate_channel_hash(&params.channel)?;
        validate_body(&params.body, self.max_message_length)?;

        // Build
        let mut envelope = MessageEnvelope {
            kind: ActionKind::ChannelMessage,
            channel: params.channel.clone(),
            channel_type: params.channel_type,
            sender: params.sender.clone(),
            receiver: params.receiver.clone(),
            message: params.body.clone(),
            generated: 0,
            signature: String::new(),
            hash: String::new(),
        };

        // Sign
        let signable = signable_payload(&envelope).map_err(anyhow::Error::from)?;
        envelope.signature = self
            .signer
            .sign(&params.wallet, &params.sender, signable.as_bytes())
            .await?;

        // Hash
        envelope.generated = self.clock.now_ms();
        envelope.hash = envelope_digest(&envelope).map_err(anyhow::Error::from)?;

        // Size check
        let wire = serde_json::to_string(&envelope).map_err(anyhow::Error::from)?;
        let limit = self.limits.ceiling(params.class);
        if wire.len() as u64 > limit {
            return Err(BazaarError::Size { size: wire.len(), limit });
        }

        // Transmit
        let options = SendOptions { receiver: params.receiver.clone(), class: params.class };
        let receipt = self.transport.send(&envelope, &options).await?;
        info!(
            transport_id = %receipt.transport_id,
            channel = %envelope.channel,
            channel_type = %envelope.channel_type,
            "Message transmitted"
        );

        // Persist
        if let Err(e) = self.persist(&receipt.transport_id, &envelope, params.subscriber).await {
            error!(
                transport_id = %receipt.transport_id,
                "Transmitted message could not be stored locally: {e}"
            );
        }

        Ok(receipt.transport_id)
    }

    async fn persist(
        &self,
        transport_id: &str,
        envelope: &MessageEnvelope,
        subscriber: Option<IdentityId>,
    ) -> Result<(), sqlx::Error> {
        let now = envelope.generated;
        let mut tx = self.db.pool.begin().await?;

        let channel_id = channels::ensure_channel(&mut *tx, &envelope.channel, envelope.channel_type, now).await?;
        let participant_id = participants::ensure_participant(&mut *tx, &envelope.sender).await?;
        let msg = messages::NewMessage {
            transport_id: transport_id.to_owned(),
            channel_id,
            participant_id,
            receiver: envelope.receiver.clone(),
            created_at: now,
            body: envelope.message.clone(),
        };
        messages::insert_message(&mut *tx, &msg).await?;

        if let Some(identity_id) = subscriber {
            follows::follow(&mut *tx, channel_id, identity_id).await?;
        }

        tx.commit().await
    }
}
