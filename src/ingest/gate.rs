//! Pacing for provider calls.
//!
//! Every remote call the fetcher makes is bracketed by `acquire` / `release`.
//! `FixedIntervalGate` holds `acquire` until `cooldown` has passed since the
//! previous `release`, so two calls are never issued back-to-back no matter how
//! many authors or channels are processed.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

#[async_trait::async_trait]
pub trait RateGate: Send + Sync {
    /// Wait until a call may be issued.
    async fn acquire(&self);
    /// Mark the end of a call (successful or not).
    fn release(&self);
}

/// Fixed cool-down between the end of one call and the start of the next.
#[derive(Debug)]
pub struct FixedIntervalGate {
    cooldown: Duration,
    last_release: Mutex<Option<Instant>>,
}

impl FixedIntervalGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_release: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn ready_at(&self) -> Option<Instant> {
        let last = match self.last_release.lock() {
            Ok(g) => *g,
            Err(poison) => *poison.into_inner(),
        };
        last.map(|t| t + self.cooldown)
    }
}

impl Default for FixedIntervalGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

#[async_trait::async_trait]
impl RateGate for FixedIntervalGate {
    async fn acquire(&self) {
        if let Some(at) = self.ready_at() {
            if at > Instant::now() {
                tracing::trace!(wait_ms = (at - Instant::now()).as_millis() as u64, "rate gate cooling down");
                sleep_until(at).await;
            }
        }
    }

    fn release(&self) {
        let mut g = match self.last_release.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        *g = Some(Instant::now());
    }
}

/// Held for the duration of one call. Dropping it releases the gate, so a call
/// that panics or is cancelled mid-flight still starts the cool-down.
#[must_use = "dropping the permit releases the gate immediately"]
pub struct GatePermit<'a> {
    gate: &'a dyn RateGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Wait for the gate, then hand back a permit that releases it on drop.
pub async fn enter(gate: &dyn RateGate) -> GatePermit<'_> {
    gate.acquire().await;
    GatePermit { gate }
}

/// No pacing at all. Handy for tests and the offline mock provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unthrottled;

#[async_trait::async_trait]
impl RateGate for Unthrottled {
    async fn acquire(&self) {}
    fn release(&self) {}
}
