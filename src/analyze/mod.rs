//! Pure ranking logic: engagement scoring and the time-window top-K.

pub mod scoring;
pub mod window;

pub use scoring::engagement_score;
pub use window::{rank_recent, TOP_K, WINDOW_HOURS};
