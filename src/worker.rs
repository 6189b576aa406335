//! Background polling worker
//!
//! Drives the resolver on a fixed cadence and forwards change events to the
//! consumer over a channel. The worker owns the resolver, so every tick runs
//! on one task and resolutions can never overlap; a tick that would fire
//! while a slow one is still running is skipped, not queued.

use crate::models::ChangeEvent;
use crate::resolver::MetadataResolver;
use anyhow::{anyhow, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Commands sent to the background worker
#[derive(Debug)]
pub enum WorkerCommand {
    /// Run a resolution cycle now, outside the normal cadence
    Refresh,
    /// Stop scheduling further ticks; an in-flight tick runs to completion
    Shutdown,
}

/// Handle to the spawned worker task
pub struct ResolverWorker {
    join_handle: JoinHandle<()>,
}

impl ResolverWorker {
    /// Spawn the polling loop.
    ///
    /// Change events go out on `events`; at most one per tick, never
    /// concurrently. The worker stops on [`WorkerCommand::Shutdown`], when
    /// the command channel closes, or when the event consumer goes away.
    pub fn spawn(
        mut resolver: MetadataResolver,
        poll_interval: Duration,
        events: mpsc::Sender<ChangeEvent>,
    ) -> (Self, mpsc::Sender<WorkerCommand>) {
        let (tx, mut rx) = mpsc::channel(8);

        let join_handle = tokio::spawn(async move {
            info!(interval = ?poll_interval, "Starting now-playing worker");

            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    cmd = rx.recv() => match cmd {
                        Some(WorkerCommand::Refresh) => {
                            debug!("Out-of-cadence refresh requested");
                            if !run_tick(&mut resolver, &events).await {
                                break;
                            }
                        }
                        Some(WorkerCommand::Shutdown) => {
                            debug!("Shutdown requested");
                            break;
                        }
                        // Command channel closed, terminate
                        None => break,
                    },
                    _ = ticker.tick() => {
                        if !run_tick(&mut resolver, &events).await {
                            break;
                        }
                    }
                }
            }

            info!("Now-playing worker stopped");
        });

        (Self { join_handle }, tx)
    }

    /// Wait for the worker task to finish
    pub async fn wait(self) -> Result<()> {
        if let Err(err) = self.join_handle.await {
            if err.is_cancelled() {
                warn!("Now-playing worker cancelled: {err}");
                return Ok(());
            }
            return Err(anyhow!("Now-playing worker join error: {}", err));
        }
        Ok(())
    }
}

/// Returns `false` when the event consumer is gone and polling should stop.
async fn run_tick(resolver: &mut MetadataResolver, events: &mpsc::Sender<ChangeEvent>) -> bool {
    if let Some(event) = resolver.resolve().await {
        if events.send(event).await.is_err() {
            debug!("Event consumer dropped, stopping worker");
            return false;
        }
    }
    true
}
