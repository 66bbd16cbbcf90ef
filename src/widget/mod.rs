//! # Widget Engine
//!
//! Client-side playback synchronization: keeps a "now playing" view smooth
//! while the backend is only polled every [`POLL_INTERVAL`](sync::POLL_INTERVAL).
//!
//! ```text
//!  PlaybackSource ──poll──▶ Track-Change Detector ──▶ view + cache
//!        ▲                                              │
//!        └── end-of-track ◀── Progress Interpolator ◀───┘
//! ```
//!
//! - [`source`] - where snapshots come from ([`HttpSource`] for a running backend)
//! - [`interpolator`] - local progress between polls, with the end-of-track fetch
//! - [`detector`] - decides whether a poll result is rendered and whether the
//!   recently-played list needs a refresh
//! - [`sync`] - the single task tying it together, plus the stale-while-revalidate
//!   caches
//!
//! Everything runs on one task. Fetches are tagged with a sequence number when
//! launched and a result older than the last applied one is dropped, so a slow
//! response can never overwrite a newer state.

pub mod detector;
pub mod interpolator;
pub mod source;
pub mod sync;

pub use detector::{Decision, PROGRESS_TOLERANCE_MS, decide, equivalent};
pub use interpolator::{Phase, ProgressInterpolator, TickEvent};
pub use source::{HttpSource, PlaybackSource};
pub use sync::{HistoryView, PlaybackView, SyncCaches, SyncHandle, SyncSettings, start};
