//! # Recency window + top-K
//!
//! Keeps casts stamped within `[now - WINDOW_HOURS, now]` (both ends inclusive),
//! sorts them by score descending and returns at most `TOP_K`.
//!
//! Casts with a missing or unparsable timestamp are treated as stale and dropped.
//! The sort is stable, so equal scores keep their fetch order.

use chrono::{DateTime, Duration, Utc};

use crate::digest::types::Cast;

pub const WINDOW_HOURS: i64 = 48;
pub const TOP_K: usize = 5;

/// Parse a provider timestamp (RFC 3339) into UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn in_window(cast: &Cast, now: DateTime<Utc>, window: Duration) -> bool {
    let Some(ts) = cast.timestamp.as_deref().and_then(parse_timestamp) else {
        return false;
    };
    ts >= now - window && ts <= now
}

/// Filter to the default 48h window and return the top 5 by score.
pub fn rank_recent(casts: Vec<Cast>, now: DateTime<Utc>) -> Vec<Cast> {
    rank_within(casts, now, Duration::hours(WINDOW_HOURS), TOP_K)
}

pub fn rank_within(casts: Vec<Cast>, now: DateTime<Utc>, window: Duration, top_k: usize) -> Vec<Cast> {
    let mut kept: Vec<Cast> = casts
        .into_iter()
        .filter(|c| in_window(c, now, window))
        .collect();
    kept.sort_by(|a, b| b.score.cmp(&a.score));
    kept.truncate(top_k);
    kept
}
