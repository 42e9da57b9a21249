//! Generic poll loop.
//!
//! A [`Poller`] owns its interval, stop flag, and status; the work done on each
//! tick is a [`PollTask`]. The loop is cooperative: the stop flag is read at
//! the top of each iteration, so a stop request takes effect after the
//! in-flight tick and sleep have finished.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::clock::Clock;

/// Running state of a poller, threaded through each tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerStatus {
    pub ticks: u64,
    /// Items handled by the task over the poller's lifetime
    pub processed: u64,
    pub last_run_at: Option<i64>,
    pub last_error: Option<String>,
}

#[async_trait]
pub trait PollTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// One tick of work. Receives the current status and returns the next one.
    async fn run(&self, status: PollerStatus) -> anyhow::Result<PollerStatus>;
}

/// Shared view of a running poller.
#[derive(Clone)]
pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    status: Arc<RwLock<PollerStatus>>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> PollerStatus {
        self.status.read().await.clone()
    }
}

pub struct Poller<T: PollTask> {
    task: T,
    interval: Duration,
    clock: Arc<dyn Clock>,
    handle: PollerHandle,
}

impl<T: PollTask> Poller<T> {
    pub fn new(task: T, interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let handle = PollerHandle {
            stop: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(PollerStatus::default())),
        };
        Self { task, interval, clock, handle }
    }

    pub fn handle(&self) -> PollerHandle {
        self.handle.clone()
    }

    /// Run one tick. Task errors are recorded in the status and logged.
    pub async fn tick(&self) {
        let current = self.handle.status().await;
        let ticks = current.ticks + 1;
        let now = self.clock.now_ms();

        let next = match self.task.run(current.clone()).await {
            Ok(next) => PollerStatus { ticks, last_run_at: Some(now), last_error: None, ..next },
            Err(e) => {
                error!(poller = self.task.name(), "Poll tick failed: {e:#}");
                PollerStatus { ticks, last_run_at: Some(now), last_error: Some(e.to_string()), ..current }
            }
        };
        *self.handle.status.write().await = next;
    }

    /// Tick, sleep, repeat until stopped.
    pub async fn run(self) {
        info!(poller = self.task.name(), interval_secs = self.interval.as_secs(), "Poller started");
        while !self.handle.is_stopped() {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
        debug!(poller = self.task.name(), "Poller stopped");
    }

    /// Spawn the loop on the runtime and return its handle.
    pub fn spawn(self) -> (PollerHandle, tokio::task::JoinHandle<()>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }
}
