//! Poll tasks: waiting-item retry and channel store cleanup.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bazaar_db::{repository::transport_items, Database};
use tracing::{debug, warn};

use crate::{
    channels::ChannelService,
    clock::Clock,
    inbound::InboundProcessor,
    poller::{PollTask, PollerStatus},
};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Backoff tiers by prior attempt count: up to 10 attempts wait 2 minutes
/// between tries, up to 20 wait 10 minutes, up to 30 an hour, then a day.
pub fn should_reprocess(processed_count: i64, processed_at: i64, now: i64) -> bool {
    let wait = match processed_count {
        ..=10 => 2 * MINUTE_MS,
        ..=20 => 10 * MINUTE_MS,
        ..=30 => HOUR_MS,
        _ => DAY_MS,
    };
    now - processed_at >= wait
}

/// Re-submits `WAITING` incoming items to the inbound processor.
pub struct WaitingRetry {
    db: Database,
    processor: Arc<InboundProcessor>,
    clock: Arc<dyn Clock>,
    batch_size: u32,
    min_age: Duration,
}

impl WaitingRetry {
    pub fn new(
        db: Database,
        processor: Arc<InboundProcessor>,
        clock: Arc<dyn Clock>,
        batch_size: u32,
        min_age: Duration,
    ) -> Self {
        Self { db, processor, clock, batch_size, min_age }
    }
}

#[async_trait]
impl PollTask for WaitingRetry {
    fn name(&self) -> &'static str {
        "waiting-retry"
    }

    async fn run(&self, mut status: PollerStatus) -> anyhow::Result<PollerStatus> {
        let now = self.clock.now_ms();
        let min_age_ms = i64::try_from(self.min_age.as_millis())?;
        let waiting = transport_items::fetch_waiting(&self.db.pool, now - min_age_ms, self.batch_size).await?;

        for item in waiting {
            if !should_reprocess(item.processed_count, item.processed_at, now) {
                continue;
            }
            match self.processor.reprocess(&item).await {
                Ok(outcome) => {
                    status.processed += 1;
                    debug!(transport_id = %item.transport_id, status = item.status.as_str(), settled = outcome.status.as_str(), "Reprocessed waiting item");
                }
                Err(e) => warn!(transport_id = %item.transport_id, "Reprocessing failed: {e}"),
            }
        }
        Ok(status)
    }
}

/// Runs the channel store cleanup.
pub struct ChannelCleanup {
    service: Arc<ChannelService>,
}

impl ChannelCleanup {
    pub fn new(service: Arc<ChannelService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl PollTask for ChannelCleanup {
    fn name(&self) -> &'static str {
        "channel-cleanup"
    }

    async fn run(&self, mut status: PollerStatus) -> anyhow::Result<PollerStatus> {
        let report = self.service.cleanup().await?;
        status.processed += report.channels_removed + report.participants_removed;
        Ok(status)
    }
}
