// src/ingest/providers/neynar.rs
//! Neynar Farcaster API provider.
//!
//! Two endpoints are used:
//! - `GET /v2/farcaster/user/by_username?username=..` for name → fid
//! - `GET /v2/farcaster/feed/user/casts?fid=..&limit=..` for recent casts
//!
//! Only response parsing lives here; pacing is handled by the fetcher's gate.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::{CastAuthor, CastProvider, EngagementCounts, ProviderError, RawCast};

pub const DEFAULT_BASE_URL: &str = "https://api.neynar.com";

pub struct NeynarProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NeynarProvider {
    pub fn new(api_key: String, base_url: Option<&str>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent("cast-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
        })
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl CastProvider for NeynarProvider {
    async fn resolve_author(&self, username: &str) -> Result<u64, ProviderError> {
        let res = self
            .get_text(
                "/v2/farcaster/user/by_username",
                &[("username", username.to_string())],
            )
            .await;
        resolution_outcome(username, res)
    }

    async fn fetch_recent_casts(
        &self,
        fid: u64,
        limit: usize,
    ) -> Result<Vec<RawCast>, ProviderError> {
        let body = self
            .get_text(
                "/v2/farcaster/feed/user/casts",
                &[
                    ("fid", fid.to_string()),
                    ("limit", limit.to_string()),
                    ("include_replies", "false".to_string()),
                ],
            )
            .await?;
        parse_casts_response(&body)
    }

    fn name(&self) -> &'static str {
        "neynar"
    }
}

// ---- wire format ----

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    fid: u64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default, rename = "displayName")]
    display_name_camel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CastsEnvelope {
    #[serde(default)]
    casts: Vec<WireCast>,
}

#[derive(Debug, Deserialize)]
struct WireCast {
    hash: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    timestamp: Option<String>,
    author: WireUser,
    #[serde(default)]
    reactions: WireReactions,
    #[serde(default)]
    replies: WireReplies,
}

#[derive(Debug, Default, Deserialize)]
struct WireReactions {
    #[serde(default)]
    likes_count: u64,
    #[serde(default)]
    recasts_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct WireReplies {
    #[serde(default)]
    count: u64,
}

pub(crate) fn parse_user_response(body: &str) -> Result<u64, ProviderError> {
    let env: UserEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    env.user
        .map(|u| u.fid)
        .ok_or_else(|| ProviderError::Decode("response has no `user` object".into()))
}

/// A 404 from the lookup endpoint means the username does not exist.
pub(crate) fn resolution_outcome(
    username: &str,
    res: Result<String, ProviderError>,
) -> Result<u64, ProviderError> {
    match res {
        Ok(body) => parse_user_response(&body),
        Err(ProviderError::Status { status: 404, .. }) => {
            Err(ProviderError::NotFound(username.to_string()))
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn parse_casts_response(body: &str) -> Result<Vec<RawCast>, ProviderError> {
    let env: CastsEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(env
        .casts
        .into_iter()
        .map(|c| RawCast {
            hash: c.hash,
            author: CastAuthor {
                fid: c.author.fid,
                username: c.author.username,
                display_name: c.author.display_name,
                alt_name: c.author.display_name_camel,
            },
            text: c.text,
            timestamp: c.timestamp,
            counts: EngagementCounts {
                likes: c.reactions.likes_count,
                replies: c.replies.count,
                recasts: c.reactions.recasts_count,
            },
        })
        .collect())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
