// src/ingest/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Engagement counters as reported by the provider. Missing fields count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub recasts: u64,
}

impl EngagementCounts {
    pub fn new(likes: u64, replies: u64, recasts: u64) -> Self {
        Self {
            likes,
            replies,
            recasts,
        }
    }
}

/// Author fields as the provider returns them; any of the name fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastAuthor {
    pub fid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_name: Option<String>,
}

/// A cast as fetched, before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCast {
    pub hash: String,
    pub author: CastAuthor,
    pub text: String,
    /// RFC 3339 string straight from the provider; `None` if the provider omitted it.
    pub timestamp: Option<String>,
    pub counts: EngagementCounts,
}

impl RawCast {
    pub fn new(hash: impl Into<String>, fid: u64, text: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            author: CastAuthor {
                fid,
                ..Default::default()
            },
            text: text.into(),
            timestamp: None,
            counts: EngagementCounts::default(),
        }
    }

    pub fn with_timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    pub fn with_counts(mut self, likes: u64, replies: u64, recasts: u64) -> Self {
        self.counts = EngagementCounts::new(likes, replies, recasts);
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.author.username = Some(username.into());
        self
    }
}

/// How a roster entry names an author: a numeric fid or a username to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorRef {
    Fid(u64),
    Username(String),
}

impl fmt::Display for AuthorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorRef::Fid(fid) => write!(f, "fid:{fid}"),
            AuthorRef::Username(name) => write!(f, "@{name}"),
        }
    }
}

impl From<u64> for AuthorRef {
    fn from(fid: u64) -> Self {
        AuthorRef::Fid(fid)
    }
}

impl From<&str> for AuthorRef {
    fn from(name: &str) -> Self {
        AuthorRef::Username(name.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("author not found: {0}")]
    NotFound(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode provider response: {0}")]
    Decode(String),
    #[error("provider error: {0}")]
    Other(String),
}

/// External source of casts. Implementations perform exactly one remote call per method;
/// pacing is the caller's job (see `ingest::gate`).
#[async_trait::async_trait]
pub trait CastProvider: Send + Sync {
    async fn resolve_author(&self, username: &str) -> Result<u64, ProviderError>;
    async fn fetch_recent_casts(&self, fid: u64, limit: usize)
        -> Result<Vec<RawCast>, ProviderError>;
    fn name(&self) -> &'static str;
}
