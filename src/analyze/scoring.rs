//! Engagement score for a single cast.
//!
//! score = likes + 2 * replies + 3 * recasts
//!
//! Replies and recasts weigh more than passive likes. The form is fixed so that
//! rankings stay reproducible across runs and deployments.

use crate::ingest::types::EngagementCounts;

pub const LIKE_WEIGHT: u64 = 1;
pub const REPLY_WEIGHT: u64 = 2;
pub const RECAST_WEIGHT: u64 = 3;

pub fn engagement_score(c: &EngagementCounts) -> u64 {
    c.likes
        .saturating_mul(LIKE_WEIGHT)
        .saturating_add(c.replies.saturating_mul(REPLY_WEIGHT))
        .saturating_add(c.recasts.saturating_mul(RECAST_WEIGHT))
}
