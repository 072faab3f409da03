//! Channel aggregation, the digest cache, and the orchestrator that ties them together.

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod service;
pub mod types;

pub use service::{DigestError, DigestOptions, DigestOutcome, DigestService, Served};
pub use types::{Cast, ChannelConfig, ChannelEntry, Digest};
