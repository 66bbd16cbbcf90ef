use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    config::SpotifyConfig,
    error::UpstreamError,
    management::TokenRefresher,
    types::{SpotifyUser, TokenGrant, TokenResponse},
};

/// Scopes requested during login.
pub const SCOPES: &[&str] = &[
    "user-read-currently-playing",
    "user-read-recently-played",
    "user-top-read",
    "user-read-playback-state",
];

/// Authorization-code flow against the Spotify accounts service.
///
/// The backend is a confidential client, so the token endpoint is called
/// with HTTP basic authentication built from the client id and secret.
#[derive(Clone)]
pub struct SpotifyAuth {
    http: Client,
    config: SpotifyConfig,
}

impl SpotifyAuth {
    pub fn new(http: Client, config: SpotifyConfig) -> Self {
        Self { http, config }
    }

    /// Builds the URL the browser is redirected to for consent.
    ///
    /// `state` is passed through untouched and comes back on the callback,
    /// where it is used to map the frontend id to the Spotify account.
    pub fn authorize_url(&self, state: Option<&str>) -> Result<String, UpstreamError> {
        let scope = SCOPES.join(" ");
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("scope", scope.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(state) = state.filter(|s| !s.is_empty()) {
            params.push(("state", state));
        }

        url::Url::parse_with_params(&self.config.auth_url, &params)
            .map(String::from)
            .map_err(|e| UpstreamError::Parse(e.to_string()))
    }

    /// Exchanges an authorization code for an access and refresh token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, UpstreamError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(UpstreamError::from_transport)?;

        let token: TokenResponse = decode(response).await?;
        debug!(scope = ?token.scope, expires_in = ?token.expires_in, "Authorization code exchanged");
        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        })
    }

    /// Returns the Spotify account id behind an access token.
    pub async fn current_user_id(&self, access_token: &str) -> Result<String, UpstreamError> {
        let response = self
            .http
            .get(format!("{}/me", self.config.api_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(UpstreamError::from_transport)?;

        let user: SpotifyUser = decode(response).await?;
        Ok(user.id)
    }
}

#[async_trait]
impl TokenRefresher for SpotifyAuth {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, UpstreamError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(UpstreamError::from_transport)?;

        let token: TokenResponse = decode(response).await?;
        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        })
    }
}

/// Turns a response into `T`, mapping non-success statuses to errors.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let status = response.status();
    let body = response.text().await.map_err(UpstreamError::from_transport)?;
    if !status.is_success() {
        return Err(UpstreamError::from_status(status.as_u16(), body));
    }
    serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> SpotifyAuth {
        SpotifyAuth::new(
            Client::new(),
            SpotifyConfig {
                client_id: "client-123".into(),
                client_secret: "secret".into(),
                redirect_uri: "http://127.0.0.1:3000/spotify/auth/callback".into(),
                auth_url: "https://accounts.spotify.com/authorize".into(),
                token_url: "https://accounts.spotify.com/api/token".into(),
                api_url: "https://api.spotify.com/v1".into(),
            },
        )
    }

    #[test]
    fn authorize_url_carries_scopes_and_state() {
        let url = url::Url::parse(&auth().authorize_url(Some("visitor-1")).unwrap()).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "client-123");
        assert_eq!(query["state"], "visitor-1");
        assert_eq!(
            query["scope"],
            "user-read-currently-playing user-read-recently-played user-top-read user-read-playback-state"
        );
    }

    #[test]
    fn authorize_url_omits_empty_state() {
        let url = auth().authorize_url(Some("")).unwrap();
        assert!(!url.contains("state="));
    }
}
