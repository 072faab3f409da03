use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_once() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_cache_hits_total", "Digest requests served from cache.");
        describe_counter!(
            "digest_cache_misses_total",
            "Digest requests that found no fresh cached digest."
        );
        describe_counter!("digest_refresh_total", "Completed refresh passes.");
        describe_counter!(
            "digest_provider_calls_total",
            "Calls issued to the cast provider (resolution + fetch)."
        );
        describe_counter!(
            "digest_author_failures_total",
            "Authors skipped due to resolution or fetch failures."
        );
        describe_counter!(
            "digest_channel_failures_total",
            "Channels that failed as a whole."
        );
        describe_histogram!("digest_refresh_ms", "Refresh pass duration in milliseconds.");
        describe_gauge!(
            "digest_last_capture_ts",
            "Unix ts of the last completed refresh pass."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init(ttl_secs: i64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_once();
        gauge!("digest_cache_ttl_secs").set(ttl_secs as f64);
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
