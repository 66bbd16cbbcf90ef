use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::{
    error::UpstreamError,
    management::TokenStore,
    types::{
        CurrentlyPlayingResponse, PlayableItem, PlaybackSnapshot, RecentTrack, RecentlyPlayed,
        RecentlyPlayedResponse, TrackPlayback,
    },
    utils,
};

use super::auth::decode;

pub const DEFAULT_RECENT_LIMIT: u32 = 3;
pub const MAX_RECENT_LIMIT: u32 = 50;

/// Reads playback state for a user and normalizes it.
///
/// Every call goes through the [`TokenStore`] first. A user without a usable
/// token is answered with the unauthenticated shape and no network request
/// is made. Upstream failures are returned as-is and never retried here.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    tokens: Arc<TokenStore>,
}

impl SpotifyClient {
    pub fn new(http: Client, api_url: &str, tokens: Arc<TokenStore>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub async fn currently_playing(&self, user_id: &str) -> Result<PlaybackSnapshot, UpstreamError> {
        let Some(token) = self.tokens.get_valid_access_token(user_id).await else {
            return Ok(PlaybackSnapshot::unauthenticated());
        };

        let response = self
            .http
            .get(format!("{}/me/player/currently-playing", self.api_url))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(UpstreamError::from_transport)?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(PlaybackSnapshot::not_playing());
        }
        self.reject_credentials(user_id, response.status())?;

        let status = response.status();
        let body = response.text().await.map_err(UpstreamError::from_transport)?;
        if !status.is_success() {
            return Err(UpstreamError::from_status(status.as_u16(), body));
        }
        if body.trim().is_empty() {
            return Ok(PlaybackSnapshot::not_playing());
        }

        let payload: CurrentlyPlayingResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))?;
        Ok(normalize_currently_playing(payload))
    }

    /// Lists the last `limit` played tracks, newest first.
    ///
    /// `limit` is clamped to `1..=50`.
    pub async fn recently_played(&self, user_id: &str, limit: u32) -> Result<RecentlyPlayed, UpstreamError> {
        let Some(token) = self.tokens.get_valid_access_token(user_id).await else {
            return Ok(RecentlyPlayed::unauthenticated());
        };

        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        let response = self
            .http
            .get(format!("{}/me/player/recently-played", self.api_url))
            .query(&[("limit", limit)])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(UpstreamError::from_transport)?;

        self.reject_credentials(user_id, response.status())?;
        let payload: RecentlyPlayedResponse = decode(response).await?;

        let tracks = payload
            .items
            .into_iter()
            .filter_map(|entry| recent_track(entry.track, entry.played_at))
            .collect();

        Ok(RecentlyPlayed {
            tracks,
            authenticated: true,
            message: None,
        })
    }

    fn reject_credentials(&self, user_id: &str, status: StatusCode) -> Result<(), UpstreamError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(user_id, %status, "Spotify rejected the access token, purging");
            self.tokens.purge(user_id);
            return Err(UpstreamError::Unauthorized(
                "Spotify rejected the access token".to_string(),
            ));
        }
        Ok(())
    }
}

/// Maps the upstream payload to a snapshot.
///
/// Items without an artist and album (podcast episodes, ads) are reported as
/// "no track" rather than as a half-filled track.
pub fn normalize_currently_playing(payload: CurrentlyPlayingResponse) -> PlaybackSnapshot {
    let Some(item) = payload.item else {
        return PlaybackSnapshot::not_playing();
    };

    let Some((artist, album, image)) = track_shape(&item) else {
        debug!(kind = ?item.kind, "Ignoring non-track playback item");
        return PlaybackSnapshot::not_playing();
    };

    let duration = item.duration_ms;
    PlaybackSnapshot::Track(TrackPlayback {
        track_id: utils::track_identity(item.id.as_deref(), &item.name, &artist),
        name: item.name,
        artist,
        album,
        is_playing: payload.is_playing,
        progress: payload.progress_ms.unwrap_or(0).min(duration),
        duration,
        image,
        external_url: item.external_urls.spotify,
    })
}

fn recent_track(item: PlayableItem, played_at: String) -> Option<RecentTrack> {
    let (artist, album, image) = track_shape(&item)?;
    Some(RecentTrack {
        track_id: utils::track_identity(item.id.as_deref(), &item.name, &artist),
        name: item.name,
        artist,
        album,
        image,
        duration: item.duration_ms,
        played_at,
    })
}

fn track_shape(item: &PlayableItem) -> Option<(String, String, Option<String>)> {
    if item.kind.as_deref().is_some_and(|kind| kind != "track") {
        return None;
    }
    let artist = item.artists.first()?.name.clone();
    let album = item.album.as_ref()?;
    let image = album.images.first().map(|i| i.url.clone());
    Some((artist, album.name.clone(), image))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> CurrentlyPlayingResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn maps_first_artist_and_album_art() {
        let snapshot = normalize_currently_playing(payload(serde_json::json!({
            "is_playing": true,
            "progress_ms": 5000,
            "item": {
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "type": "track",
                "duration_ms": 213000,
                "artists": [{ "name": "Rick Astley" }, { "name": "Someone Else" }],
                "album": {
                    "name": "Whenever You Need Somebody",
                    "images": [{ "url": "https://i.scdn.co/image/large" }, { "url": "https://i.scdn.co/image/small" }]
                },
                "external_urls": { "spotify": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC" }
            }
        })));

        let track = snapshot.track().unwrap();
        assert_eq!(track.track_id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artist, "Rick Astley");
        assert_eq!(track.image.as_deref(), Some("https://i.scdn.co/image/large"));
        assert_eq!(track.progress, 5000);
        assert!(track.is_playing);
    }

    #[test]
    fn episodes_and_empty_items_are_not_tracks() {
        let episode = normalize_currently_playing(payload(serde_json::json!({
            "is_playing": true,
            "progress_ms": 1000,
            "item": { "id": "ep", "name": "Episode 12", "type": "episode", "duration_ms": 3600000 }
        })));
        assert_eq!(episode, PlaybackSnapshot::not_playing());

        let empty = normalize_currently_playing(payload(serde_json::json!({ "is_playing": false })));
        assert_eq!(empty, PlaybackSnapshot::not_playing());
    }

    #[test]
    fn missing_id_falls_back_to_composite_identity() {
        let snapshot = normalize_currently_playing(payload(serde_json::json!({
            "is_playing": false,
            "progress_ms": 999999,
            "item": {
                "id": null,
                "name": "Local File",
                "duration_ms": 1000,
                "artists": [{ "name": "Me" }],
                "album": { "name": "Tapes" }
            }
        })));

        let track = snapshot.track().unwrap();
        assert_eq!(track.track_id, "Local File-Me");
        assert_eq!(track.progress, 1000);
    }
}
