//! Cast Digest - Binary Entrypoint
//! Boots the Axum HTTP server: loads settings and the channel roster, wires the
//! digest service, optionally starts the background refresher, and mounts routes.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use cast_digest::api::{create_router, AppState};
use cast_digest::config::{load_channels_default, DigestSettings};
use cast_digest::ingest::scheduler::spawn_refresh_scheduler;
use cast_digest::metrics::Metrics;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    cast_digest::init_tracing();

    let settings = DigestSettings::from_env().context("loading settings")?;
    let channels = load_channels_default().context("loading channel roster")?;

    // Recorder must be installed before the service describes its series.
    let metrics = match Metrics::init(settings.cache_ttl_secs) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    };

    let service = Arc::new(cast_digest::build_service(&settings, &channels)?);
    let state = AppState::new(service.clone(), channels);

    if let Some(every) = settings.refresh_interval {
        tracing::info!(interval_secs = every.as_secs(), "starting background refresher");
        spawn_refresh_scheduler(service, state.channels.clone(), every);
    }

    let mut router = create_router(state);
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }

    Ok(router.into())
}
