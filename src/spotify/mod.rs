//! # Spotify Integration Module
//!
//! Thin client over the Spotify accounts service and Web API, used by the
//! backend routes to serve the "now playing" widget.
//!
//! ## Core Modules
//!
//! - [`auth`] - Authorization-code flow: consent URL, code exchange, account
//!   lookup and the refresh-token grant used by
//!   [`TokenStore`](crate::management::TokenStore) for silent renewal.
//! - [`player`] - Currently-playing and recently-played reads, normalized into
//!   [`PlaybackSnapshot`](crate::types::PlaybackSnapshot) and
//!   [`RecentlyPlayed`](crate::types::RecentlyPlayed).
//!
//! ## Error Handling
//!
//! All functions return [`UpstreamError`](crate::error::UpstreamError). A
//! user without credentials is not an error: the player client answers with
//! the unauthenticated shape instead. A 401/403 from the Web API purges the
//! stored record for that user before the error is surfaced.
//!
//! Every request shares one `reqwest` client bounded by
//! [`UPSTREAM_TIMEOUT`](crate::config::UPSTREAM_TIMEOUT). Nothing is retried
//! at this layer.

pub mod auth;
pub mod player;

pub use auth::{SCOPES, SpotifyAuth};
pub use player::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT, SpotifyClient};
