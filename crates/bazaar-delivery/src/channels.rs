//! Channel service: the read/write surface over the channel store that the
//! rest of the application calls. Channels are addressed by their natural
//! key `(hash, channel_type)`, identities by store id.

use std::sync::Arc;

use bazaar_common::{
    models::{ChannelSummary, ChannelType, IdentityId, MessageView, Participant, SortDirection},
    BazaarError, BazaarResult,
};
use bazaar_db::{
    repository::{channels, follows, identities, messages, participants},
    Database,
};
use tracing::{info, warn};

use crate::directory::ChannelDirectory;

/// What one cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub channels_removed: u64,
    pub participants_removed: u64,
}

pub struct ChannelService {
    db: Database,
    directory: Arc<dyn ChannelDirectory>,
}

impl ChannelService {
    pub fn new(db: Database, directory: Arc<dyn ChannelDirectory>) -> Self {
        Self { db, directory }
    }

    pub async fn list_channels(
        &self,
        identity_id: IdentityId,
        channel_type: Option<ChannelType>,
    ) -> BazaarResult<Vec<ChannelSummary>> {
        Ok(channels::list_followed(&self.db.pool, identity_id, channel_type).await?)
    }

    /// A page of messages as seen by `identity_id`. Unknown channels have no
    /// messages.
    pub async fn list_messages(
        &self,
        identity_id: IdentityId,
        channel: &str,
        channel_type: ChannelType,
        count: i64,
        direction: SortDirection,
        anchor: Option<&str>,
    ) -> BazaarResult<Vec<MessageView>> {
        let identity = identities::find_by_id(&self.db.pool, identity_id)
            .await?
            .ok_or_else(|| BazaarError::NotFound { resource: format!("Identity {identity_id}") })?;
        let Some(ch) = channels::find_channel(&self.db.pool, channel, channel_type).await? else {
            return Ok(Vec::new());
        };
        Ok(messages::list_channel_messages(
            &self.db.pool,
            ch.id,
            identity.id,
            &identity.address,
            count,
            direction,
            anchor,
        )
        .await?)
    }

    /// Move the identity's read watermark forward to `timestamp`. Returns
    /// whether the identity follows the channel; an older timestamp is a no-op.
    pub async fn set_read(
        &self,
        identity_id: IdentityId,
        channel: &str,
        channel_type: ChannelType,
        timestamp: i64,
    ) -> BazaarResult<bool> {
        let Some(ch) = channels::find_channel(&self.db.pool, channel, channel_type).await? else {
            return Ok(false);
        };
        follows::set_last_read(&self.db.pool, ch.id, identity_id, timestamp).await?;
        Ok(follows::get_follow(&self.db.pool, ch.id, identity_id).await?.is_some())
    }

    /// Subscribe to a channel. Following twice is a success; a channel that
    /// was never provisioned cannot be followed.
    pub async fn follow(
        &self,
        identity_id: IdentityId,
        channel: &str,
        channel_type: ChannelType,
    ) -> BazaarResult<bool> {
        let Some(ch) = channels::find_channel(&self.db.pool, channel, channel_type).await? else {
            return Ok(false);
        };
        follows::follow(&self.db.pool, ch.id, identity_id).await?;
        Ok(true)
    }

    /// Unsubscribe. Unfollowing something not followed is a success.
    pub async fn unfollow(
        &self,
        identity_id: IdentityId,
        channel: &str,
        channel_type: ChannelType,
    ) -> BazaarResult<bool> {
        if let Some(ch) = channels::find_channel(&self.db.pool, channel, channel_type).await? {
            follows::unfollow(&self.db.pool, ch.id, identity_id).await?;
        }
        Ok(true)
    }

    pub async fn update_participant_label(
        &self,
        address: &str,
        label: Option<&str>,
    ) -> BazaarResult<Participant> {
        Ok(participants::upsert_label(&self.db.pool, address, label).await?)
    }

    pub async fn list_known_participants(&self) -> BazaarResult<Vec<Participant>> {
        Ok(participants::list_labelled(&self.db.pool).await?)
    }

    /// Remove channels nobody follows whose business object is gone, then
    /// participants left with no message and no label. Channels whose object
    /// cannot be checked right now are kept.
    pub async fn cleanup(&self) -> BazaarResult<CleanupReport> {
        let mut report = CleanupReport::default();

        for ch in channels::list_unfollowed(&self.db.pool).await? {
            match self.directory.exists(ch.channel_type, &ch.hash).await {
                Ok(true) => {}
                Ok(false) => {
                    if channels::delete_if_unfollowed(&self.db.pool, ch.id).await? {
                        report.channels_removed += 1;
                    }
                }
                Err(e) => warn!(channel = %ch.hash, "Skipping channel cleanup: {e}"),
            }
        }

        report.participants_removed = participants::delete_orphans(&self.db.pool).await?;
        if report != CleanupReport::default() {
            info!(
                channels = report.channels_removed,
                participants = report.participants_removed,
                "Channel store cleanup"
            );
        }
        Ok(report)
    }
}
