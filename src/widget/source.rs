use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{
    error::WidgetError,
    types::{ApiResponse, AuthStatus, PlaybackSnapshot, RecentlyPlayed, RiotProfile},
};

/// Where the widget engine reads playback state from.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    async fn currently_playing(&self, user_id: &str) -> Result<PlaybackSnapshot, WidgetError>;

    async fn recently_played(&self, user_id: &str, limit: u32) -> Result<RecentlyPlayed, WidgetError>;
}

/// Reads from a running folio backend over HTTP.
#[derive(Clone)]
pub struct HttpSource {
    http: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL that starts the Spotify login, optionally tagged with a frontend id.
    pub fn login_url(&self, state: Option<&str>) -> String {
        match state {
            Some(state) => format!(
                "{}/spotify/auth/login?state={}",
                self.base_url,
                url::form_urlencoded::byte_serialize(state.as_bytes()).collect::<String>()
            ),
            None => format!("{}/spotify/auth/login", self.base_url),
        }
    }

    pub async fn auth_status(&self, user_id: &str) -> Result<AuthStatus, WidgetError> {
        self.fetch(&["spotify", "auth", "status", user_id], &[]).await
    }

    pub async fn riot_profile(&self, game_name: &str, tag: &str) -> Result<RiotProfile, WidgetError> {
        self.fetch(&["riot", game_name, tag], &[]).await
    }

    /// GETs a backend route and unwraps the `{ success, data }` envelope.
    async fn fetch<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, WidgetError> {
        let mut url =
            url::Url::parse(&self.base_url).map_err(|e| WidgetError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| WidgetError::Parse(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            if status >= 400 {
                WidgetError::Backend {
                    status,
                    message: body.clone(),
                }
            } else {
                WidgetError::Parse(e.to_string())
            }
        })?;

        match envelope.data {
            Some(data) if envelope.success => Ok(data),
            _ => Err(WidgetError::Backend {
                status,
                message: envelope
                    .message
                    .or(envelope.error)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }),
        }
    }
}

#[async_trait]
impl PlaybackSource for HttpSource {
    async fn currently_playing(&self, user_id: &str) -> Result<PlaybackSnapshot, WidgetError> {
        self.fetch(&["spotify", "currently-playing", user_id], &[]).await
    }

    async fn recently_played(&self, user_id: &str, limit: u32) -> Result<RecentlyPlayed, WidgetError> {
        self.fetch(
            &["spotify", "recently-played", user_id],
            &[("limit", limit.to_string())],
        )
        .await
    }
}
