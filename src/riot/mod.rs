//! # Riot Games Integration Module
//!
//! Aggregates the League of Legends stats widget payload for a single Riot
//! ID from several sources:
//!
//! ```text
//! account-v1 (by Riot ID) -> summoner-v4 (by PUUID)
//!                         -> league-v4 entries ----(fails)----> OP.GG scrape
//!                         -> champion-mastery-v4 top 1
//!                         -> Data Dragon (version, champion names, icons)
//! ```
//!
//! Lookups use the configured regional and platform hosts only.
//!
//! ## Core Modules
//!
//! - [`client`] - Request helper (key header, 429 retry with `Retry-After`,
//!   status mapping), profile aggregation and the key diagnostic.
//! - [`ddragon`] - Static data with graceful fallbacks.
//! - [`opgg`] - HTML rank fallback.

pub mod client;
pub mod ddragon;
pub mod opgg;

pub use client::{MAX_RATE_LIMIT_RETRIES, RiotClient};

pub const SOLO_QUEUE: &str = "RANKED_SOLO_5x5";
pub const FLEX_QUEUE: &str = "RANKED_FLEX_SR";
