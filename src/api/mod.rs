//! # API Module
//!
//! HTTP endpoints of the folio backend. Every JSON response uses the
//! [`ApiResponse`](crate::types::ApiResponse) envelope
//! `{ success, data?, error?, message? }`; failures carry a non-2xx status.
//!
//! ## Endpoints
//!
//! ### Spotify
//!
//! - [`spotify::login`] - `GET /spotify/auth/login?state=` redirects to the consent page
//! - [`spotify::callback`] - `GET /spotify/auth/callback` stores the tokens and
//!   redirects back to `PROJECT_URL` with `auth=success` or an `error` flag
//! - [`spotify::currently_playing`] - `GET /spotify/currently-playing/{user_id}`
//! - [`spotify::recently_played`] - `GET /spotify/recently-played/{user_id}?limit=`
//! - [`spotify::auth_status`] - `GET /spotify/auth/status/{user_id}`
//! - [`spotify::logout`] - `GET /spotify/auth/logout/{user_id}`
//!
//! A user without usable credentials is answered with HTTP 200 and
//! `authenticated: false`, never with an error.
//!
//! ### Riot Games
//!
//! - [`riot::summoner`] - `GET /riot/{game_name}/{tag}`, cached for three hours
//! - [`riot::test_key`] - `GET /riot/test-key`
//!
//! ### Monitoring
//!
//! - [`health`] - `GET /health`
//! - [`index`] - `GET /`
//! - [`not_found`] - fallback for everything else

mod health;
pub mod riot;
pub mod spotify;

use axum::{http::StatusCode, response::Json};

use crate::types::ApiResponse;

pub use health::{health, index};

pub async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure(
            "Not Found",
            "The requested resource was not found",
        )),
    )
}
