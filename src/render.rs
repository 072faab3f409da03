//! HTML page for a digest. Plain string building; every provider-sourced value is escaped.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::analyze::window::parse_timestamp;
use crate::digest::{Cast, ChannelEntry, Digest};

const MAX_TEXT_CHARS: usize = 280;

pub fn render_page(digest: &Digest, last_capture: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let mut out = String::with_capacity(8 * 1024);
    out.push_str(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Cast Digest</title>\n<style>\
         body{font-family:system-ui,sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem;color:#222}\
         h2{border-bottom:1px solid #ddd;padding-bottom:.3rem}\
         .cast{margin:1rem 0;padding:.75rem;border:1px solid #eee;border-radius:6px}\
         .meta{color:#666;font-size:.85rem}\
         .err{background:#fff3f3;border:1px solid #f5c2c2;padding:.5rem;border-radius:6px}\
         </style>\n</head>\n<body>\n<h1>Cast Digest</h1>\n",
    );

    let updated = match last_capture {
        Some(at) => format!("Last updated {}", time_ago(at, now)),
        None => "Not refreshed yet".to_string(),
    };
    out.push_str(&format!(
        "<p class=\"meta\">{} &middot; <a href=\"/?refresh=1\">refresh</a></p>\n",
        encode_text(&updated)
    ));

    for entry in &digest.channels {
        render_channel(&mut out, entry, now);
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn render_channel(out: &mut String, entry: &ChannelEntry, now: DateTime<Utc>) {
    out.push_str(&format!(
        "<section>\n<h2>#{}</h2>\n",
        encode_text(&entry.channel_id)
    ));
    if let Some(err) = &entry.error {
        out.push_str(&format!(
            "<p class=\"err\">Could not load this channel: {}</p>\n",
            encode_text(err)
        ));
    } else if entry.casts.is_empty() {
        out.push_str("<p class=\"meta\">No recent casts.</p>\n");
    }
    for cast in &entry.casts {
        render_cast(out, cast, now);
    }
    out.push_str("</section>\n");
}

fn render_cast(out: &mut String, cast: &Cast, now: DateTime<Utc>) {
    let label = cast.author_label();
    let age = cast
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .map(|ts| time_ago(ts, now))
        .unwrap_or_default();

    out.push_str("<article class=\"cast\">\n");
    out.push_str(&format!(
        "<div class=\"meta\"><strong>{}</strong> &middot; {}</div>\n",
        encode_text(&label),
        encode_text(&age)
    ));
    out.push_str(&format!(
        "<p>{}</p>\n",
        encode_text(&truncate_chars(&cast.text, MAX_TEXT_CHARS))
    ));
    out.push_str(&format!(
        "<div class=\"meta\">score {} &middot; {} likes &middot; {} replies &middot; {} recasts",
        cast.score, cast.counts.likes, cast.counts.replies, cast.counts.recasts
    ));
    if let Some(url) = cast_url(cast) {
        out.push_str(&format!(
            " &middot; <a href=\"{}\">view</a>",
            encode_double_quoted_attribute(&url)
        ));
    }
    out.push_str("</div>\n</article>\n");
}

/// Link to the cast on Warpcast; needs a username.
pub fn cast_url(cast: &Cast) -> Option<String> {
    let user = cast.author.username.as_deref()?.trim();
    if user.is_empty() {
        return None;
    }
    let short: String = cast.hash.chars().take(10).collect();
    Some(format!("https://warpcast.com/{user}/{short}"))
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('…');
    t
}

pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}
