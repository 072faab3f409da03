// src/digest/aggregator.rs
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use metrics::counter;

use crate::analyze::window::rank_recent;
use crate::digest::types::{AuthorFailureNote, Cast, ChannelConfig, ChannelEntry};
use crate::ingest::SourceFetcher;

/// Authors beyond this are ignored, bounding per-channel latency and rate usage.
pub const MAX_AUTHORS_PER_CHANNEL: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel aggregation panicked: {0}")]
    Panicked(String),
}

/// Build one channel's entry. Authors are fetched strictly one after another.
/// Author failures are recorded on the entry; anything worse becomes `entry.error`.
pub async fn aggregate_channel(
    fetcher: &SourceFetcher,
    channel: &ChannelConfig,
    now: DateTime<Utc>,
) -> ChannelEntry {
    let run = AssertUnwindSafe(collect_channel(fetcher, channel, now)).catch_unwind();
    match run.await {
        Ok(entry) => entry,
        Err(panic) => {
            let err = ChannelError::Panicked(panic_message(panic.as_ref()));
            tracing::error!(channel = %channel.id, error = %err, "channel failed");
            counter!("digest_channel_failures_total").increment(1);
            ChannelEntry::failed(channel.id.clone(), err.to_string())
        }
    }
}

async fn collect_channel(
    fetcher: &SourceFetcher,
    channel: &ChannelConfig,
    now: DateTime<Utc>,
) -> ChannelEntry {
    if channel.authors.len() > MAX_AUTHORS_PER_CHANNEL {
        tracing::debug!(
            channel = %channel.id,
            configured = channel.authors.len(),
            max = MAX_AUTHORS_PER_CHANNEL,
            "roster truncated"
        );
    }

    let mut pool: Vec<Cast> = Vec::new();
    let mut author_failures = Vec::new();
    for author in channel.authors.iter().take(MAX_AUTHORS_PER_CHANNEL) {
        match fetcher.fetch_author(author).await {
            Ok(raw) => pool.extend(raw.into_iter().map(Cast::from)),
            Err(f) => {
                counter!("digest_author_failures_total").increment(1);
                author_failures.push(AuthorFailureNote::from(&f));
            }
        }
    }

    let fetched = pool.len();
    let casts = rank_recent(pool, now);
    tracing::info!(
        channel = %channel.id,
        fetched,
        kept = casts.len(),
        failed_authors = author_failures.len(),
        "channel aggregated"
    );

    ChannelEntry {
        channel_id: channel.id.clone(),
        casts,
        error: None,
        author_failures,
    }
}

fn panic_message(p: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = p.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = p.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
