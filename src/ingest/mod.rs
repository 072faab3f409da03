// src/ingest/mod.rs
pub mod display_name;
pub mod gate;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::ingest::gate::RateGate;
use crate::ingest::types::{AuthorRef, CastProvider, ProviderError, RawCast};

/// Casts requested per author; no pagination beyond this.
pub const PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorFailureKind {
    Resolution,
    Fetch,
}

/// Why one author contributed nothing. Never fatal to the channel.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?} failed for {author}: {source}")]
pub struct AuthorFailure {
    pub author: AuthorRef,
    pub kind: AuthorFailureKind,
    #[source]
    pub source: ProviderError,
}

/// Sequential, gate-paced access to one provider.
#[derive(Clone)]
pub struct SourceFetcher {
    provider: Arc<dyn CastProvider>,
    gate: Arc<dyn RateGate>,
    page_size: usize,
}

impl SourceFetcher {
    pub fn new(provider: Arc<dyn CastProvider>, gate: Arc<dyn RateGate>) -> Self {
        Self {
            provider,
            gate,
            page_size: PAGE_SIZE,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Recent casts for one author. Usernames are resolved first (one extra call).
    /// Failures are logged here and handed back as values; the caller decides
    /// whether to record them.
    pub async fn fetch_author(&self, author: &AuthorRef) -> Result<Vec<RawCast>, AuthorFailure> {
        let fid = match author {
            AuthorRef::Fid(fid) => *fid,
            AuthorRef::Username(name) => {
                let resolved = self.paced(self.provider.resolve_author(name)).await;
                match resolved {
                    Ok(fid) => fid,
                    Err(e) => {
                        tracing::warn!(
                            provider = self.provider.name(),
                            author = %author,
                            error = %e,
                            "author resolution failed; skipping author"
                        );
                        return Err(AuthorFailure {
                            author: author.clone(),
                            kind: AuthorFailureKind::Resolution,
                            source: e,
                        });
                    }
                }
            }
        };

        match self
            .paced(self.provider.fetch_recent_casts(fid, self.page_size))
            .await
        {
            Ok(mut casts) => {
                casts.truncate(self.page_size);
                tracing::debug!(author = %author, fid, count = casts.len(), "fetched casts");
                Ok(casts)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    author = %author,
                    fid,
                    error = %e,
                    "cast fetch failed; author yields no casts"
                );
                Err(AuthorFailure {
                    author: author.clone(),
                    kind: AuthorFailureKind::Fetch,
                    source: e,
                })
            }
        }
    }

    async fn paced<T, F>(&self, call: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let _permit = gate::enter(self.gate.as_ref()).await;
        counter!("digest_provider_calls_total").increment(1);
        call.await
    }
}
