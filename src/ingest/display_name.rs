// src/ingest/display_name.rs
use crate::ingest::types::CastAuthor;

type Strategy = fn(&CastAuthor) -> Option<&str>;

/// Evaluated in order; the first non-blank value wins.
const STRATEGIES: &[Strategy] = &[by_username, by_display_name, by_alt_name];

fn by_username(a: &CastAuthor) -> Option<&str> {
    a.username.as_deref()
}

fn by_display_name(a: &CastAuthor) -> Option<&str> {
    a.display_name.as_deref()
}

fn by_alt_name(a: &CastAuthor) -> Option<&str> {
    a.alt_name.as_deref()
}

/// Human-facing label for an author, if the provider gave us any name at all.
/// Callers decide how to render the `None` case (e.g. `fid:<n>`).
pub fn resolve_display_name(author: &CastAuthor) -> Option<String> {
    STRATEGIES
        .iter()
        .filter_map(|s| s(author))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
