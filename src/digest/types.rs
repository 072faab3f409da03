// src/digest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyze::scoring::engagement_score;
use crate::ingest::display_name::resolve_display_name;
use crate::ingest::types::{AuthorRef, CastAuthor, EngagementCounts, RawCast};
use crate::ingest::{AuthorFailure, AuthorFailureKind};

/// A scored cast. Built once from a `RawCast`; the score is never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cast {
    pub hash: String,
    pub author: CastAuthor,
    /// First usable name from the author fields, if any.
    pub author_name: Option<String>,
    pub text: String,
    pub timestamp: Option<String>,
    pub counts: EngagementCounts,
    pub score: u64,
}

impl From<RawCast> for Cast {
    fn from(raw: RawCast) -> Self {
        let score = engagement_score(&raw.counts);
        let author_name = resolve_display_name(&raw.author);
        Self {
            hash: raw.hash,
            author: raw.author,
            author_name,
            text: raw.text,
            timestamp: raw.timestamp,
            counts: raw.counts,
            score,
        }
    }
}

impl Cast {
    /// Label for display: resolved name, or `fid:<n>` when the provider sent no name.
    pub fn author_label(&self) -> String {
        self.author_name
            .clone()
            .unwrap_or_else(|| format!("fid:{}", self.author.fid))
    }
}

/// Serializable record of an author that contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorFailureNote {
    pub author: String,
    pub kind: AuthorFailureKind,
    pub message: String,
}

impl From<&AuthorFailure> for AuthorFailureNote {
    fn from(f: &AuthorFailure) -> Self {
        Self {
            author: f.author.to_string(),
            kind: f.kind,
            message: f.source.to_string(),
        }
    }
}

/// One channel's slice of the digest. `casts` is score-descending and at most `TOP_K` long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub channel_id: String,
    pub casts: Vec<Cast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_failures: Vec<AuthorFailureNote>,
}

impl ChannelEntry {
    pub fn failed(channel_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            casts: Vec::new(),
            error: Some(error.into()),
            author_failures: Vec::new(),
        }
    }
}

/// Output of one orchestration pass, one entry per configured channel in config order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub generated_at: DateTime<Utc>,
    pub channels: Vec<ChannelEntry>,
}

impl Digest {
    pub fn channel(&self, id: &str) -> Option<&ChannelEntry> {
        self.channels.iter().find(|c| c.channel_id == id)
    }

    pub fn total_casts(&self) -> usize {
        self.channels.iter().map(|c| c.casts.len()).sum()
    }
}

/// A channel label and its author roster, in fetch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: String,
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
}

impl ChannelConfig {
    pub fn new(id: impl Into<String>, authors: Vec<AuthorRef>) -> Self {
        Self {
            id: id.into(),
            authors,
        }
    }
}
