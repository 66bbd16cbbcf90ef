use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::utils;

pub const NOT_AUTHENTICATED_MESSAGE: &str = "User not authenticated. Please login to Spotify.";
pub const NO_TRACK_MESSAGE: &str = "No track currently playing";

/// OAuth credentials held for one upstream account.
///
/// `expires_at` is an absolute timestamp in milliseconds since the epoch. It
/// is recomputed from the fixed validity window every time a new access token
/// is stored, regardless of what the provider reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: i64,
}

/// Tokens returned by a successful authorization-code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPlayback {
    pub track_id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub is_playing: bool,
    pub progress: u64,
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
}

/// Normalized "now playing" view.
///
/// Exactly one of the three shapes exists at a time. On the wire the value is
/// flattened into the object the widgets have always consumed:
/// `{ authenticated: false, isPlaying: false, message }`,
/// `{ authenticated: true, isPlaying: false, message }` or the full track
/// fields with `authenticated: true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotWire", into = "SnapshotWire")]
pub enum PlaybackSnapshot {
    Unauthenticated { message: String },
    NotPlaying { message: String },
    Track(TrackPlayback),
}

impl PlaybackSnapshot {
    pub fn unauthenticated() -> Self {
        PlaybackSnapshot::Unauthenticated {
            message: NOT_AUTHENTICATED_MESSAGE.to_string(),
        }
    }

    pub fn not_playing() -> Self {
        PlaybackSnapshot::NotPlaying {
            message: NO_TRACK_MESSAGE.to_string(),
        }
    }

    pub fn track(&self) -> Option<&TrackPlayback> {
        match self {
            PlaybackSnapshot::Track(track) => Some(track),
            _ => None,
        }
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track().map(|t| t.track_id.as_str())
    }

    pub fn is_playing(&self) -> bool {
        self.track().is_some_and(|t| t.is_playing)
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, PlaybackSnapshot::Unauthenticated { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            PlaybackSnapshot::Unauthenticated { message } => Some(message),
            PlaybackSnapshot::NotPlaying { message } => Some(message),
            PlaybackSnapshot::Track(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotWire {
    #[serde(default)]
    is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authenticated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    progress: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_url: Option<String>,
}

impl From<PlaybackSnapshot> for SnapshotWire {
    fn from(snapshot: PlaybackSnapshot) -> Self {
        match snapshot {
            PlaybackSnapshot::Unauthenticated { message } => SnapshotWire {
                authenticated: Some(false),
                message: Some(message),
                ..Default::default()
            },
            PlaybackSnapshot::NotPlaying { message } => SnapshotWire {
                authenticated: Some(true),
                message: Some(message),
                ..Default::default()
            },
            PlaybackSnapshot::Track(t) => SnapshotWire {
                is_playing: t.is_playing,
                authenticated: Some(true),
                message: None,
                track_id: Some(t.track_id),
                name: Some(t.name),
                artist: Some(t.artist),
                album: Some(t.album),
                progress: Some(t.progress),
                duration: Some(t.duration),
                image: t.image,
                external_url: t.external_url,
            },
        }
    }
}

impl From<SnapshotWire> for PlaybackSnapshot {
    fn from(wire: SnapshotWire) -> Self {
        if wire.authenticated == Some(false) {
            return PlaybackSnapshot::Unauthenticated {
                message: wire
                    .message
                    .unwrap_or_else(|| NOT_AUTHENTICATED_MESSAGE.to_string()),
            };
        }

        match (wire.name, wire.artist, wire.duration) {
            (Some(name), Some(artist), Some(duration)) => {
                let track_id = wire
                    .track_id
                    .unwrap_or_else(|| utils::track_identity(None, &name, &artist));
                PlaybackSnapshot::Track(TrackPlayback {
                    track_id,
                    name,
                    artist,
                    album: wire.album.unwrap_or_default(),
                    is_playing: wire.is_playing,
                    progress: wire.progress.unwrap_or(0).min(duration),
                    duration,
                    image: wire.image,
                    external_url: wire.external_url,
                })
            }
            _ => PlaybackSnapshot::NotPlaying {
                message: wire.message.unwrap_or_else(|| NO_TRACK_MESSAGE.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTrack {
    pub track_id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub duration: u64,
    pub played_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentlyPlayed {
    pub tracks: Vec<RecentTrack>,
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecentlyPlayed {
    pub fn unauthenticated() -> Self {
        Self {
            tracks: Vec::new(),
            authenticated: false,
            message: Some(NOT_AUTHENTICATED_MESSAGE.to_string()),
        }
    }
}

#[derive(Tabled)]
pub struct RecentTrackTableRow {
    pub played: String,
    pub name: String,
    pub artist: String,
    pub album: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotRank {
    pub tier: String,
    pub division: String,
    pub lp: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: String,
    pub queue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotMastery {
    pub champion_id: String,
    pub champion_name: String,
    pub mastery_level: u32,
    pub mastery_points: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotProfile {
    pub region: String,
    pub riot_id: String,
    pub puuid: String,
    pub platform: String,
    pub summoner_level: u64,
    pub rank: Option<RiotRank>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub top_mastery: Option<RiotMastery>,
}

#[derive(Tabled)]
pub struct RiotTableRow {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHelp {
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCheck {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<KeyHelp>,
}

impl KeyCheck {
    pub fn is_valid(&self) -> bool {
        self.status == "success"
    }
}

/// Uniform JSON envelope returned by every backend route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: Some(message.into()),
        }
    }
}

// Spotify Web API payloads

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlayingResponse {
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<PlayableItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    pub album: Option<SimpleAlbum>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentlyPlayedResponse {
    #[serde(default)]
    pub items: Vec<PlayHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistory {
    pub track: PlayableItem,
    pub played_at: String,
}

// Riot Games API payloads

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotAccount {
    pub puuid: String,
    pub game_name: Option<String>,
    pub tag_line: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotSummoner {
    pub puuid: String,
    pub profile_icon_id: u64,
    pub summoner_level: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntry {
    pub queue_type: String,
    pub tier: String,
    pub rank: String,
    pub league_points: u32,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionMastery {
    pub champion_id: u64,
    pub champion_level: u32,
    pub champion_points: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataDragonChampions {
    pub data: HashMap<String, DataDragonChampion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataDragonChampion {
    pub key: String,
    pub name: String,
}
