// src/ingest/providers/mock.rs
//! Scripted in-memory provider. Used by tests and by `DIGEST_PROVIDER=mock`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

use crate::digest::types::ChannelConfig;
use crate::ingest::types::{AuthorRef, CastProvider, ProviderError, RawCast};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCallKind {
    Resolve,
    Fetch,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub kind: MockCallKind,
    pub target: String,
    pub at: Instant,
}

#[derive(Debug, Clone)]
enum Script {
    Casts(Vec<RawCast>),
    Fail(String),
    Panic,
}

#[derive(Debug, Default)]
pub struct MockProvider {
    users: HashMap<String, u64>,
    scripts: HashMap<u64, Script>,
    latency: HashMap<u64, std::time::Duration>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str, fid: u64) -> Self {
        self.users.insert(username.to_ascii_lowercase(), fid);
        self
    }

    pub fn with_casts(mut self, fid: u64, casts: Vec<RawCast>) -> Self {
        self.scripts.insert(fid, Script::Casts(casts));
        self
    }

    pub fn with_failure(mut self, fid: u64, message: &str) -> Self {
        self.scripts.insert(fid, Script::Fail(message.to_string()));
        self
    }

    /// Panics inside `fetch_recent_casts` for this fid.
    pub fn with_panic(mut self, fid: u64) -> Self {
        self.scripts.insert(fid, Script::Panic);
        self
    }

    /// `fetch_recent_casts` for this fid sleeps before answering.
    pub fn with_latency(mut self, fid: u64, delay: std::time::Duration) -> Self {
        self.latency.insert(fid, delay);
        self
    }

    /// Deterministic offline data for every author in `channels`: a few casts each,
    /// spread over the last three days so the window filter has something to drop.
    pub fn demo(channels: &[ChannelConfig], now: DateTime<Utc>) -> Self {
        let mut p = Self::new();
        // Synthetic fids for usernames start above every configured numeric fid.
        let mut next_fid = channels
            .iter()
            .flat_map(|ch| &ch.authors)
            .filter_map(|a| match a {
                AuthorRef::Fid(fid) => Some(*fid),
                AuthorRef::Username(_) => None,
            })
            .max()
            .unwrap_or(0)
            .max(100_000);
        for ch in channels {
            for author in &ch.authors {
                let (fid, name) = match author {
                    AuthorRef::Fid(fid) => (*fid, None),
                    AuthorRef::Username(n) => {
                        next_fid += 1;
                        p.users.insert(n.to_ascii_lowercase(), next_fid);
                        (next_fid, Some(n.clone()))
                    }
                };
                let casts = (0..4u64)
                    .map(|i| {
                        let seed = fid.wrapping_mul(31).wrapping_add(i * 7);
                        let mut c = RawCast::new(
                            format!("0x{fid:x}{i:02x}"),
                            fid,
                            format!("demo cast {i} in #{}", ch.id),
                        )
                        .with_timestamp((now - Duration::hours(i as i64 * 18 + 1)).to_rfc3339())
                        .with_counts(seed % 40, seed % 9, seed % 5);
                        c.author.username = name.clone();
                        c
                    })
                    .collect();
                p.scripts.insert(fid, Script::Casts(casts));
            }
        }
        p
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock_calls().clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.count(MockCallKind::Resolve)
    }

    pub fn fetch_calls(&self) -> usize {
        self.count(MockCallKind::Fetch)
    }

    pub fn total_calls(&self) -> usize {
        self.lock_calls().len()
    }

    fn count(&self, kind: MockCallKind) -> usize {
        self.lock_calls().iter().filter(|c| c.kind == kind).count()
    }

    fn record(&self, kind: MockCallKind, target: String) {
        self.lock_calls().push(MockCall {
            kind,
            target,
            at: Instant::now(),
        });
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockCall>> {
        match self.calls.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[async_trait]
impl CastProvider for MockProvider {
    async fn resolve_author(&self, username: &str) -> Result<u64, ProviderError> {
        self.record(MockCallKind::Resolve, username.to_string());
        self.users
            .get(&username.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| ProviderError::NotFound(username.to_string()))
    }

    async fn fetch_recent_casts(
        &self,
        fid: u64,
        _limit: usize,
    ) -> Result<Vec<RawCast>, ProviderError> {
        self.record(MockCallKind::Fetch, fid.to_string());
        if let Some(delay) = self.latency.get(&fid) {
            tokio::time::sleep(*delay).await;
        }
        match self.scripts.get(&fid) {
            // The page limit is deliberately ignored; the fetcher enforces it.
            Some(Script::Casts(v)) => Ok(v.clone()),
            Some(Script::Fail(msg)) => Err(ProviderError::Other(msg.clone())),
            Some(Script::Panic) => panic!("scripted provider panic for fid {fid}"),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
