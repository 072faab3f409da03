// src/config/channels.rs
//! Channel roster loading.
//!
//! Lookup order:
//! 1) $CHANNELS_CONFIG_PATH
//! 2) config/channels.toml
//! 3) config/channels.json
//! 4) built-in seed roster
//!
//! Both file formats share one shape:
//! ```toml
//! [[channels]]
//! id = "ethereum"
//! authors = ["vitalik.eth", 5650]
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::digest::types::ChannelConfig;
use crate::ingest::types::AuthorRef;

pub const ENV_CHANNELS_CONFIG_PATH: &str = "CHANNELS_CONFIG_PATH";

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    channels: Vec<ChannelConfig>,
}

/// Load a roster from an explicit path. Supports TOML or JSON.
pub fn load_channels_from(path: &Path) -> Result<Vec<ChannelConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading channel roster from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_channels(&content, &ext).with_context(|| format!("parsing {}", path.display()))
}

pub fn load_channels_default() -> Result<Vec<ChannelConfig>> {
    if let Ok(p) = std::env::var(ENV_CHANNELS_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_channels_from(&pb);
        }
        return Err(anyhow!(
            "{ENV_CHANNELS_CONFIG_PATH} points to non-existent path {}",
            pb.display()
        ));
    }
    for candidate in ["config/channels.toml", "config/channels.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_channels_from(&p);
        }
    }
    tracing::info!("no channel roster file found; using built-in seed");
    Ok(default_seed())
}

fn parse_channels(s: &str, hint_ext: &str) -> Result<Vec<ChannelConfig>> {
    let file: RosterFile = match hint_ext {
        "json" => serde_json::from_str(s)?,
        "toml" => toml::from_str(s)?,
        _ => match toml::from_str(s) {
            Ok(v) => v,
            Err(_) => serde_json::from_str(s).map_err(|_| anyhow!("unsupported roster format"))?,
        },
    };
    clean_roster(file.channels)
}

/// Trim ids and names, drop blank authors, reject blank or duplicate channel ids.
/// Channel and author order are preserved.
fn clean_roster(channels: Vec<ChannelConfig>) -> Result<Vec<ChannelConfig>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(channels.len());
    for ch in channels {
        let id = ch.id.trim().to_string();
        if id.is_empty() {
            bail!("channel with blank id");
        }
        if !seen.insert(id.clone()) {
            bail!("duplicate channel id '{id}'");
        }
        let authors = ch
            .authors
            .into_iter()
            .filter_map(|a| match a {
                AuthorRef::Username(n) => {
                    let n = n.trim().trim_start_matches('@').to_string();
                    (!n.is_empty()).then_some(AuthorRef::Username(n))
                }
                fid => Some(fid),
            })
            .collect();
        out.push(ChannelConfig { id, authors });
    }
    Ok(out)
}

/// Built-in roster used when no config file is present.
pub fn default_seed() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::new(
            "farcaster",
            vec!["dwr.eth".into(), "v".into(), "ted".into(), "linda".into()],
        ),
        ChannelConfig::new(
            "ethereum",
            vec!["vitalik.eth".into(), "jessepollak".into(), "timbeiko.eth".into()],
        ),
        ChannelConfig::new(
            "dev",
            vec!["horsefacts.eth".into(), "rish".into(), "cassie".into()],
        ),
    ]
}
