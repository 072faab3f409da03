//! # Digest cache
//!
//! Single slot holding the last computed `Digest` and the moment it was captured.
//! A read is a hit only while `now - captured_at < ttl`; expiry is absolute
//! (reads never extend it). Writes replace the slot wholesale.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::digest::clock::Clock;
use crate::digest::types::Digest;

pub const DEFAULT_TTL_SECS: i64 = 30 * 60;

#[derive(Debug, thiserror::Error)]
#[error("digest cache slot is unavailable (lock poisoned)")]
pub struct CachePoisoned;

/// Outcome of asking the cache for a digest.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Arc<Digest>),
    /// Nothing cached, or the cached digest is older than the TTL.
    Miss,
    /// Caller asked to skip the cache.
    Bypassed,
}

#[derive(Debug)]
struct Slot {
    digest: Arc<Digest>,
    captured_at: DateTime<Utc>,
}


pub struct DigestCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: RwLock<Option<Slot>>,
}

impl DigestCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            inner: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached digest if it is still within the TTL.
    pub fn read(&self) -> Result<Option<Arc<Digest>>, CachePoisoned> {
        let now = self.clock.now();
        let g = self.inner.read().map_err(|_| CachePoisoned)?;
        Ok(g.as_ref()
            .filter(|s| now - s.captured_at < self.ttl)
            .map(|s| s.digest.clone()))
    }

    /// `read`, unless the caller wants to bypass the cache.
    pub fn lookup(&self, bypass: bool) -> Result<CacheLookup, CachePoisoned> {
        if bypass {
            return Ok(CacheLookup::Bypassed);
        }
        Ok(match self.read()? {
            Some(d) => CacheLookup::Hit(d),
            None => CacheLookup::Miss,
        })
    }

    /// Replace the slot and stamp it with the current time.
    pub fn write(&self, digest: Digest) -> Result<Arc<Digest>, CachePoisoned> {
        let digest = Arc::new(digest);
        let captured_at = self.clock.now();
        let mut g = self.inner.write().map_err(|_| CachePoisoned)?;
        *g = Some(Slot {
            digest: digest.clone(),
            captured_at,
        });
        Ok(digest)
    }

    /// When the current slot was written, regardless of TTL.
    pub fn last_capture(&self) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .ok()
            .and_then(|g| g.as_ref().map(|s| s.captured_at))
    }
}
