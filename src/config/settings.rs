// src/config/settings.rs
use std::time::Duration;

use anyhow::{bail, Result};

use crate::digest::cache::DEFAULT_TTL_SECS;
use crate::ingest::gate::DEFAULT_COOLDOWN;
use crate::ingest::providers::neynar::DEFAULT_BASE_URL;

pub const ENV_API_KEY: &str = "NEYNAR_API_KEY";
pub const ENV_BASE_URL: &str = "NEYNAR_BASE_URL";
pub const ENV_CACHE_TTL_SECS: &str = "DIGEST_CACHE_TTL_SECS";
pub const ENV_COOLDOWN_MS: &str = "DIGEST_FETCH_COOLDOWN_MS";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "DIGEST_REFRESH_INTERVAL_SECS";
pub const ENV_PROVIDER: &str = "DIGEST_PROVIDER";

/// Largest TTL a `chrono::Duration` can hold.
pub const MAX_TTL_SECS: i64 = i64::MAX / 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Neynar,
    Mock,
}

/// Runtime knobs, read from the environment (after `.env` has been loaded).
#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: String,
    pub cache_ttl_secs: i64,
    pub cooldown: Duration,
    /// `None` disables the background scheduler.
    pub refresh_interval: Option<Duration>,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Neynar,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_TTL_SECS,
            cooldown: DEFAULT_COOLDOWN,
            refresh_interval: None,
        }
    }
}

impl DigestSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env`, but with an injectable lookup (tests).
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();

        let provider = match get(ENV_PROVIDER)
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "" | "neynar" => ProviderKind::Neynar,
            "mock" => ProviderKind::Mock,
            other => bail!("unsupported {ENV_PROVIDER}: {other}"),
        };

        let api_key = get(ENV_API_KEY)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if provider == ProviderKind::Neynar && api_key.is_none() {
            bail!("{ENV_API_KEY} is required for the neynar provider");
        }

        let base_url = get(ENV_BASE_URL)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(d.base_url);

        let cache_ttl_secs = parse_positive(&get, ENV_CACHE_TTL_SECS)
            .and_then(|v| match i64::try_from(v) {
                Ok(secs) if secs <= MAX_TTL_SECS => Some(secs),
                _ => {
                    tracing::warn!(key = ENV_CACHE_TTL_SECS, value = v, "ttl out of range; using default");
                    None
                }
            })
            .unwrap_or(d.cache_ttl_secs);
        let cooldown = get(ENV_COOLDOWN_MS)
            .and_then(|raw| parse_or_warn(ENV_COOLDOWN_MS, &raw))
            .map(Duration::from_millis)
            .unwrap_or(d.cooldown);
        let refresh_interval =
            parse_positive(&get, ENV_REFRESH_INTERVAL_SECS).map(Duration::from_secs);

        Ok(Self {
            provider,
            api_key,
            base_url,
            cache_ttl_secs,
            cooldown,
            refresh_interval,
        })
    }
}

fn parse_or_warn(key: &str, raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = raw, "ignoring unparsable setting; using default");
            None
        }
    }
}

fn parse_positive<F>(get: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .and_then(|raw| parse_or_warn(key, &raw))
        .filter(|v| *v > 0)
}
