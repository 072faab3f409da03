// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::digest::{ChannelConfig, DigestOptions, DigestService};

/// Spawn a background task that force-refreshes the digest every `interval`.
/// The first tick fires immediately, which warms the cache at startup.
pub fn spawn_refresh_scheduler(
    service: Arc<DigestService>,
    channels: Arc<Vec<ChannelConfig>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match service
                .produce_digest(&channels, DigestOptions::forced())
                .await
            {
                Ok(d) => tracing::info!(
                    target: "scheduler",
                    channels = d.channels.len(),
                    casts = d.total_casts(),
                    "scheduled refresh tick"
                ),
                Err(e) => tracing::error!(target: "scheduler", error = %e, "scheduled refresh failed"),
            }
        }
    })
}
