//! Configuration management for the folio backend and its widgets.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API credentials, Riot Games settings, server
//! settings, and the address the console widgets talk to.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the working directory
//! 3. `.env` file in the local data directory
//! 4. Application defaults (where applicable)

use std::{env, fmt, path::PathBuf, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_RIOT_ACCOUNT_URL: &str = "https://europe.api.riotgames.com";
pub const DEFAULT_RIOT_PLATFORM_URL: &str = "https://euw1.api.riotgames.com";
pub const DEFAULT_RIOT_REGION: &str = "europe";
pub const DEFAULT_RIOT_PLATFORM: &str = "euw1";
pub const DEFAULT_DDRAGON_URL: &str = "https://ddragon.leagueoflegends.com";
pub const DEFAULT_OPGG_URL: &str = "https://op.gg";
pub const DEFAULT_OPGG_REGION: &str = "euw";

/// Upper bound for every call to Spotify, Riot, Data Dragon or OP.GG.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads environment variables from `.env` files.
///
/// A `.env` in the working directory is read first, then the one located in
/// the platform-specific local data directory under `folio/.env`. Values that
/// are already present in the process environment are never overwritten, so
/// real environment variables always win.
///
/// # Directory Structure
///
/// The data directory file is looked up in:
/// - Linux: `~/.local/share/folio/.env`
/// - macOS: `~/Library/Application Support/folio/.env`
/// - Windows: `%LOCALAPPDATA%/folio/.env`
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created. Missing
/// `.env` files are not an error: a deployment may rely on the environment only.
///
/// # Example
///
/// ```
/// use folio::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<(), String> {
    let _ = dotenv::dotenv();

    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Returns the folio directory inside the platform local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("folio");
    path
}

/// Returns the directory holding widget cache snapshots between runs.
pub fn session_dir() -> PathBuf {
    data_dir().join("session")
}

/// Returns the base URL of the folio backend used by the console widgets.
///
/// Retrieves the `FOLIO_API_URL` environment variable and falls back to the
/// default local server address when it is not set.
///
/// # Example
///
/// ```
/// let api = api_url(); // e.g., "http://127.0.0.1:3000"
/// ```
pub fn api_url() -> String {
    env::var("FOLIO_API_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Everything the backend needs to run.
///
/// Built once at startup and shared read-only by every handler.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub project_url: String,
    pub spotify: SpotifyConfig,
    pub riot: RiotConfig,
}

#[derive(Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
}

#[derive(Clone)]
pub struct RiotConfig {
    /// `None` keeps the server running; Riot routes then report the key as missing.
    pub api_key: Option<String>,
    pub account_url: String,
    pub platform_url: String,
    pub region: String,
    pub platform: String,
    pub ddragon_url: String,
    pub opgg_url: String,
    pub opgg_region: String,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl fmt::Debug for RiotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiotConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("account_url", &self.account_url)
            .field("platform_url", &self.platform_url)
            .field("region", &self.region)
            .field("platform", &self.platform)
            .field("ddragon_url", &self.ddragon_url)
            .field("opgg_url", &self.opgg_url)
            .field("opgg_region", &self.opgg_region)
            .finish()
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for the first required variable that is
    /// not set (or empty), and [`ConfigError::Invalid`] for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    ///
    /// Required:
    /// - `SPOTIFY_API_AUTH_CLIENT_ID`
    /// - `SPOTIFY_API_AUTH_CLIENT_SECRET`
    /// - `SPOTIFY_API_REDIRECT_URI`
    /// - `PROJECT_URL`
    ///
    /// Everything else has a default, see the `DEFAULT_*` constants.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let url_var = |key: &'static str, default: &str| -> Result<String, ConfigError> {
            let value = or_default(key, default);
            url::Url::parse(&value).map_err(|e| ConfigError::Invalid {
                var: key,
                reason: e.to_string(),
            })?;
            Ok(value.trim_end_matches('/').to_string())
        };

        let server_address = or_default("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS);
        if server_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid {
                var: "SERVER_ADDRESS",
                reason: format!("'{}' is not a socket address", server_address),
            });
        }

        let spotify = SpotifyConfig {
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            client_secret: required("SPOTIFY_API_AUTH_CLIENT_SECRET")?,
            redirect_uri: required("SPOTIFY_API_REDIRECT_URI")?,
            auth_url: url_var("SPOTIFY_API_AUTH_URL", DEFAULT_SPOTIFY_AUTH_URL)?,
            token_url: url_var("SPOTIFY_API_TOKEN_URL", DEFAULT_SPOTIFY_TOKEN_URL)?,
            api_url: url_var("SPOTIFY_API_URL", DEFAULT_SPOTIFY_API_URL)?,
        };

        let project_url = required("PROJECT_URL")?.trim_end_matches('/').to_string();

        let riot = RiotConfig {
            api_key: get("RIOT_API_KEY"),
            account_url: url_var("RIOT_ACCOUNT_URL", DEFAULT_RIOT_ACCOUNT_URL)?,
            platform_url: url_var("RIOT_PLATFORM_URL", DEFAULT_RIOT_PLATFORM_URL)?,
            region: or_default("RIOT_REGION", DEFAULT_RIOT_REGION),
            platform: or_default("RIOT_PLATFORM", DEFAULT_RIOT_PLATFORM),
            ddragon_url: url_var("DDRAGON_URL", DEFAULT_DDRAGON_URL)?,
            opgg_url: url_var("OPGG_URL", DEFAULT_OPGG_URL)?,
            opgg_region: or_default("OPGG_REGION", DEFAULT_OPGG_REGION),
        };

        Ok(Self {
            server_address,
            project_url,
            spotify,
            riot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("SPOTIFY_API_AUTH_CLIENT_ID", "client"),
        ("SPOTIFY_API_AUTH_CLIENT_SECRET", "secret"),
        ("SPOTIFY_API_REDIRECT_URI", "http://127.0.0.1:3000/spotify/auth/callback"),
        ("PROJECT_URL", "https://example.org/"),
    ];

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(config.server_address, DEFAULT_SERVER_ADDRESS);
        assert_eq!(config.project_url, "https://example.org");
        assert_eq!(config.spotify.api_url, DEFAULT_SPOTIFY_API_URL);
        assert_eq!(config.riot.platform, "euw1");
        assert!(config.riot.api_key.is_none());
    }

    #[test]
    fn missing_required_value_is_reported_by_name() {
        let partial = &REQUIRED[..2];
        let err = Config::from_lookup(lookup(partial)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SPOTIFY_API_REDIRECT_URI")));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RIOT_API_KEY", "  "));
        pairs[0] = ("SPOTIFY_API_AUTH_CLIENT_ID", "");

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_ID")));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RIOT_API_KEY", "RGAPI-0000-live-key"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        let printed = format!("{:?}", config);
        assert!(printed.contains("client"));
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("\"secret\""));
        assert!(!printed.contains("RGAPI-0000-live-key"));
    }

    #[test]
    fn malformed_urls_and_addresses_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SPOTIFY_API_URL", "not a url"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SPOTIFY_API_URL", .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SERVER_ADDRESS", "localhost"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SERVER_ADDRESS", .. }));
    }
}
