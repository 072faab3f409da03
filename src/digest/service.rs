//! # Digest orchestrator
//!
//! `produce_digest` serves the cached digest while it is fresh, otherwise walks
//! the configured channels one at a time, builds a new `Digest`, and stores it.
//!
//! Refresh passes are single-flight: concurrent callers that miss the cache
//! queue on one async mutex, and a non-forced caller that gets in after a pass
//! has finished reuses its result instead of fetching again.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::digest::aggregator::aggregate_channel;
use crate::digest::cache::{CacheLookup, CachePoisoned, DigestCache};
use crate::digest::clock::Clock;
use crate::digest::types::{ChannelConfig, Digest};
use crate::ingest::SourceFetcher;

#[derive(Debug, Clone, Copy, Default)]
pub struct DigestOptions {
    pub force_refresh: bool,
}

impl DigestOptions {
    pub fn forced() -> Self {
        Self {
            force_refresh: true,
        }
    }
}

/// How a `produce_digest` call was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Served {
    /// Fresh cached digest, no provider calls.
    Hit,
    /// This call ran a full fetch pass.
    Refreshed,
    /// Another caller's pass finished while this one waited; its result was reused.
    Coalesced,
}

impl Served {
    pub fn as_header(&self) -> &'static str {
        match self {
            Served::Hit => "HIT",
            Served::Refreshed => "MISS",
            Served::Coalesced => "COALESCED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestOutcome {
    pub digest: Arc<Digest>,
    pub served: Served,
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error(transparent)]
    Cache(#[from] CachePoisoned),
}

pub struct DigestService {
    fetcher: SourceFetcher,
    cache: DigestCache,
    clock: Arc<dyn Clock>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl DigestService {
    pub fn new(fetcher: SourceFetcher, cache: DigestCache, clock: Arc<dyn Clock>) -> Self {
        crate::metrics::describe_once();
        Self {
            fetcher,
            cache,
            clock,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Capture time of the cached digest, for "last updated" displays.
    pub fn last_capture(&self) -> Option<DateTime<Utc>> {
        self.cache.last_capture()
    }

    pub fn cache(&self) -> &DigestCache {
        &self.cache
    }

    pub async fn produce_digest(
        &self,
        channels: &[ChannelConfig],
        opts: DigestOptions,
    ) -> Result<Arc<Digest>, DigestError> {
        Ok(self.produce_digest_with_status(channels, opts).await?.digest)
    }

    pub async fn produce_digest_with_status(
        &self,
        channels: &[ChannelConfig],
        opts: DigestOptions,
    ) -> Result<DigestOutcome, DigestError> {
        match self.cache.lookup(opts.force_refresh)? {
            CacheLookup::Hit(digest) => {
                counter!("digest_cache_hits_total").increment(1);
                tracing::debug!("digest served from cache");
                return Ok(DigestOutcome {
                    digest,
                    served: Served::Hit,
                });
            }
            CacheLookup::Miss => counter!("digest_cache_misses_total").increment(1),
            CacheLookup::Bypassed => tracing::debug!("cache bypass requested"),
        }

        let _guard = self.refresh_lock.lock().await;

        // A pass may have finished while we were queued. Forced callers still
        // run their own pass; they only wait so passes never overlap.
        if !opts.force_refresh {
            if let Some(digest) = self.cache.read()? {
                tracing::debug!("reusing digest from concurrent refresh");
                return Ok(DigestOutcome {
                    digest,
                    served: Served::Coalesced,
                });
            }
        }

        let digest = self.refresh(channels).await;
        let digest = self.cache.write(digest)?;
        Ok(DigestOutcome {
            digest,
            served: Served::Refreshed,
        })
    }

    /// One full sequential pass over all channels, in configured order.
    async fn refresh(&self, channels: &[ChannelConfig]) -> Digest {
        let t0 = Instant::now();
        let now = self.clock.now();
        tracing::info!(
            channels = channels.len(),
            provider = self.fetcher.provider_name(),
            "digest refresh started"
        );

        let mut entries = Vec::with_capacity(channels.len());
        for channel in channels {
            // Each channel's window ends when that channel starts; a pass can
            // outlast the cool-downs of many calls.
            entries.push(aggregate_channel(&self.fetcher, channel, self.clock.now()).await);
        }

        let digest = Digest {
            generated_at: now,
            channels: entries,
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("digest_refresh_ms").record(ms);
        counter!("digest_refresh_total").increment(1);
        gauge!("digest_last_capture_ts").set(now.timestamp() as f64);
        tracing::info!(
            channels = digest.channels.len(),
            casts = digest.total_casts(),
            elapsed_ms = ms as u64,
            "digest refresh finished"
        );
        digest
    }
}
