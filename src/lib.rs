// src/lib.rs
// Public library surface for the server binary, the CLI and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod digest;
pub mod ingest;
pub mod metrics;
pub mod render;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::api::create_router;
pub use crate::digest::{Digest, DigestOptions, DigestService};

use crate::config::{DigestSettings, ProviderKind};
use crate::digest::cache::DigestCache;
use crate::digest::clock::{Clock, SystemClock};
use crate::digest::ChannelConfig;
use crate::ingest::gate::{FixedIntervalGate, RateGate, Unthrottled};
use crate::ingest::providers::{mock::MockProvider, neynar::NeynarProvider};
use crate::ingest::types::CastProvider;
use crate::ingest::SourceFetcher;

/// Install the global tracing subscriber.
/// `RUST_LOG` wins over the default filter; `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cast_digest=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Wire provider, gate, cache and clock according to `settings`.
pub fn build_service(
    settings: &DigestSettings,
    channels: &[ChannelConfig],
) -> anyhow::Result<DigestService> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (provider, gate) = match settings.provider {
        ProviderKind::Neynar => {
            let key = settings
                .api_key
                .clone()
                .context("NEYNAR_API_KEY missing")?;
            let p = NeynarProvider::new(key, Some(&settings.base_url))
                .context("building neynar client")?;
            let provider: Arc<dyn CastProvider> = Arc::new(p);
            let gate: Arc<dyn RateGate> = Arc::new(FixedIntervalGate::new(settings.cooldown));
            (provider, gate)
        }
        ProviderKind::Mock => {
            tracing::warn!("using offline mock provider");
            let provider: Arc<dyn CastProvider> = Arc::new(MockProvider::demo(channels, clock.now()));
            let gate: Arc<dyn RateGate> = Arc::new(Unthrottled);
            (provider, gate)
        }
    };

    tracing::info!(
        provider = provider.name(),
        ttl_secs = settings.cache_ttl_secs,
        cooldown_ms = settings.cooldown.as_millis() as u64,
        channels = channels.len(),
        "digest service configured"
    );

    let cache = DigestCache::new(
        chrono::Duration::seconds(settings.cache_ttl_secs),
        clock.clone(),
    );
    Ok(DigestService::new(
        SourceFetcher::new(provider, gate),
        cache,
        clock,
    ))
}
