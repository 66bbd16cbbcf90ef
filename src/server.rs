use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Instant};

use axum::{Extension, Router, routing::get};
use reqwest::Client;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api,
    config::Config,
    management::{SWEEP_INTERVAL, TokenStore, TtlCache, UserIdMapping},
    riot::RiotClient,
    spotify::{SpotifyAuth, SpotifyClient},
    types::RiotProfile,
    utils,
};

pub const RIOT_CACHE_NAMESPACE: &str = "riot_stats";
pub const RIOT_CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(3 * 60 * 60);

pub struct AppState {
    pub config: Config,
    pub tokens: Arc<TokenStore>,
    pub users: UserIdMapping,
    pub auth: SpotifyAuth,
    pub spotify: SpotifyClient,
    pub riot: RiotClient,
    pub riot_cache: Arc<TtlCache<RiotProfile>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(config, utils::http_client()?))
    }

    pub fn with_client(config: Config, http: Client) -> Self {
        let auth = SpotifyAuth::new(http.clone(), config.spotify.clone());
        let tokens = Arc::new(TokenStore::new(Arc::new(auth.clone())));
        let spotify = SpotifyClient::new(http.clone(), &config.spotify.api_url, Arc::clone(&tokens));
        let riot = RiotClient::new(http, config.riot.clone());

        Self {
            config,
            tokens,
            users: UserIdMapping::new(),
            auth,
            spotify,
            riot,
            riot_cache: Arc::new(TtlCache::new(RIOT_CACHE_NAMESPACE, RIOT_CACHE_TTL)),
            started_at: Instant::now(),
        }
    }

    /// Drops every credential, mapping and cached profile.
    pub fn clear(&self) {
        self.tokens.clear();
        self.users.clear();
        self.riot_cache.clear();
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route("/spotify/auth/login", get(api::spotify::login))
        .route("/spotify/auth/callback", get(api::spotify::callback))
        .route("/spotify/auth/status/{user_id}", get(api::spotify::auth_status))
        .route("/spotify/auth/logout/{user_id}", get(api::spotify::logout))
        .route("/spotify/currently-playing/{user_id}", get(api::spotify::currently_playing))
        .route("/spotify/recently-played/{user_id}", get(api::spotify::recently_played))
        .route("/riot/test-key", get(api::riot::test_key))
        .route("/riot/{game_name}/{tag}", get(api::riot::summoner))
        .fallback(api::not_found)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the backend until Ctrl-C, then clears all in-memory state.
pub async fn start_api_server(config: Config) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from_str(&config.server_address)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let state = Arc::new(AppState::new(config).map_err(std::io::Error::other)?);
    let sweeper = state.riot_cache.spawn_sweeper(SWEEP_INTERVAL);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    state.clear();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available: run until the process is killed
        std::future::pending::<()>().await;
    }
}
