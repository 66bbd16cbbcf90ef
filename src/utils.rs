use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::config;

/// Builds the HTTP client shared by the upstream integrations.
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config::UPSTREAM_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Builds the stable identity of a track.
///
/// Prefers the identifier issued by the upstream service. When the payload
/// carries none (local files, some podcasts) the identity falls back to the
/// `name-artist` composite, which collides for tracks sharing title and artist.
pub fn track_identity(upstream_id: Option<&str>, name: &str, artist: &str) -> String {
    match upstream_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("{}-{}", name, artist),
    }
}

/// Formats a track position as `m:ss`.
pub fn format_time(milliseconds: u64) -> String {
    let seconds = milliseconds / 1000;
    let minutes = seconds / 60;
    let remaining_seconds = seconds % 60;
    format!("{}:{:02}", minutes, remaining_seconds)
}

/// Formats how long ago a track was played relative to `now`.
///
/// Unparseable timestamps render as `Unknown`.
pub fn format_time_ago(played_at: &str, now: DateTime<Utc>) -> String {
    let Ok(played) = DateTime::parse_from_rfc3339(played_at) else {
        return "Unknown".to_string();
    };

    let diff_in_minutes = (now - played.with_timezone(&Utc)).num_minutes();
    if diff_in_minutes < 1 {
        "Just now".to_string()
    } else if diff_in_minutes < 60 {
        format!("{}m ago", diff_in_minutes)
    } else if diff_in_minutes < 1440 {
        format!("{}h ago", diff_in_minutes / 60)
    } else {
        format!("{}d ago", diff_in_minutes / 1440)
    }
}

/// Rounded win rate as shown on the stats widget, e.g. `"54%"`.
pub fn win_rate(wins: u32, losses: u32) -> String {
    let total = wins + losses;
    if total == 0 {
        return "0%".to_string();
    }
    let rate = (f64::from(wins) / f64::from(total) * 100.0).round();
    format!("{}%", rate as u32)
}

/// First eight characters of a secret followed by an ellipsis.
pub fn key_preview(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{}...", prefix)
}
