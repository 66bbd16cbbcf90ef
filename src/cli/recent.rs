use chrono::{DateTime, Utc};
use tabled::Table;

use crate::{
    error, info,
    types::{RecentTrackTableRow, RecentlyPlayed},
    utils, warning,
    widget::PlaybackSource,
};

pub async fn recent(user_id: String, limit: u32) {
    match super::backend().recently_played(&user_id, limit).await {
        Ok(recent) if !recent.authenticated => warning!(
            "{}",
            recent.message.as_deref().unwrap_or("User not authenticated")
        ),
        Ok(recent) if recent.tracks.is_empty() => info!("No recently played tracks"),
        Ok(recent) => println!("{}", Table::new(recent_rows(&recent, Utc::now()))),
        Err(e) => error!("Cannot load recently played tracks. Err: {}", e),
    }
}

pub(crate) fn recent_rows(recent: &RecentlyPlayed, now: DateTime<Utc>) -> Vec<RecentTrackTableRow> {
    recent
        .tracks
        .iter()
        .map(|t| RecentTrackTableRow {
            played: utils::format_time_ago(&t.played_at, now),
            name: t.name.clone(),
            artist: t.artist.clone(),
            album: t.album.clone(),
        })
        .collect()
}
