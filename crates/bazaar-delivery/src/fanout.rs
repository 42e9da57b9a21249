//! Notification fan-out.
//!
//! After a message is stored, every identity following its channel gets one
//! [`NotificationEvent`] on the broadcast channel the notification transport
//! subscribes to.

use bazaar_common::{
    models::{ChannelId, MessageEnvelope},
    notification::{NotificationEvent, CHANNEL_MESSAGE},
};
use bazaar_db::{repository::follows, Database};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Clone)]
pub struct Fanout {
    db: Database,
    tx: broadcast::Sender<NotificationEvent>,
}

impl Fanout {
    pub fn new(db: Database, tx: broadcast::Sender<NotificationEvent>) -> Self {
        Self { db, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    /// Emit a channel-message event to the channel's followers. Returns the
    /// number of identities addressed; no followers means nothing is emitted.
    pub async fn notify(
        &self,
        channel_id: ChannelId,
        envelope: &MessageEnvelope,
        created: i64,
    ) -> Result<usize, sqlx::Error> {
        let identities = follows::list_followers(&self.db.pool, channel_id).await?;
        if identities.is_empty() {
            return Ok(0);
        }
        let count = identities.len();
        let event = NotificationEvent {
            event_type: CHANNEL_MESSAGE.to_owned(),
            sender: envelope.sender.clone(),
            receiver: envelope.receiver.clone(),
            channel: envelope.channel.clone(),
            channel_type: envelope.channel_type,
            created,
            identities,
        };
        if self.tx.send(event).is_err() {
            debug!(channel_id, "No notification subscribers");
        }
        Ok(count)
    }
}
