//! # CLI Module
//!
//! Command-line entry points of folio. One command runs the backend, the
//! others are console renditions of the portfolio widgets and talk to a
//! running backend at `FOLIO_API_URL` (default `http://127.0.0.1:3000`).
//!
//! ## Commands
//!
//! - [`serve`] - Runs the HTTP backend until Ctrl-C
//! - [`login`] - Opens the Spotify login in a browser and waits for it to complete
//! - [`status`] - Shows whether a user currently has usable Spotify credentials
//! - [`watch`] - Live "now playing" view with a locally interpolated progress bar
//! - [`recent`] - Table of recently played tracks
//! - [`stats`] - League of Legends profile of a Riot ID
//!
//! ## Usage Patterns
//!
//! ```bash
//! folio serve                        # start the backend
//! folio login --state me             # link a Spotify account as user "me"
//! folio watch me                     # follow what "me" is listening to
//! folio stats Faker KR1              # Riot profile lookup
//! ```
//!
//! The widget commands keep their last snapshots in the local data directory,
//! so `watch` renders immediately on start instead of waiting for the network.

mod login;
mod recent;
mod serve;
mod stats;
mod watch;

use crate::{config, error, utils, widget::HttpSource};

pub use login::{login, status};
pub use recent::recent;
pub use serve::serve;
pub use stats::stats;
pub use watch::watch;

/// Client for the backend configured through `FOLIO_API_URL`.
fn backend() -> HttpSource {
    match utils::http_client() {
        Ok(http) => HttpSource::new(http, &config::api_url()),
        Err(e) => error!("Cannot build HTTP client. Err: {}", e),
    }
}
