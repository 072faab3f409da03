//! Run one forced digest pass against the configured provider and print it as JSON.
//!
//! DIGEST_PROVIDER=mock cargo run --bin digest_once

use anyhow::Context;
use cast_digest::config::{load_channels_default, DigestSettings};
use cast_digest::DigestOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    cast_digest::init_tracing();

    let settings = DigestSettings::from_env().context("loading settings")?;
    let channels = load_channels_default().context("loading channel roster")?;
    let service = cast_digest::build_service(&settings, &channels)?;

    let digest = service
        .produce_digest(&channels, DigestOptions::forced())
        .await?;
    println!("{}", serde_json::to_string_pretty(digest.as_ref())?);
    Ok(())
}
