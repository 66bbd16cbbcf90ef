use std::{sync::Arc, time::Duration};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    config, info,
    spotify::MAX_RECENT_LIMIT,
    success,
    types::PlaybackSnapshot,
    utils,
    widget::{self, HistoryView, PlaybackSource, PlaybackView, SyncCaches, SyncSettings},
};

/// Follows the playback of `user_id` until Ctrl-C.
///
/// The progress bar advances once per second from local state; the backend
/// is only polled on the regular cadence and when a track should have ended.
pub async fn watch(user_id: String, limit: u32) {
    let source: Arc<dyn PlaybackSource> = Arc::new(super::backend());
    let caches = SyncCaches::persistent(config::session_dir());
    let settings = SyncSettings {
        history_limit: limit.clamp(1, MAX_RECENT_LIMIT),
        ..SyncSettings::default()
    };

    info!("Watching '{}' (Ctrl-C to stop)", user_id);
    let handle = widget::start(&user_id, source, caches, settings).await;
    let mut playback = handle.playback();
    let mut history = handle.history();

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}\n  [{bar:40.green/white}] {prefix}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(200));

    render_playback(&pb, &playback.borrow_and_update().clone(), &user_id);
    render_history(&pb, &history.borrow_and_update().clone());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = playback.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = playback.borrow_and_update().clone();
                render_playback(&pb, &view, &user_id);
            }
            changed = history.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = history.borrow_and_update().clone();
                render_history(&pb, &view);
            }
        }
    }

    pb.finish_and_clear();
    handle.shutdown().await;
    success!("Stopped watching '{}'", user_id);
}

fn render_playback(pb: &ProgressBar, view: &PlaybackView, user_id: &str) {
    if let Some(err) = &view.error {
        pb.println(format!("backend error: {}", err));
    }

    match &view.snapshot {
        None => {
            pb.set_length(0);
            pb.set_prefix("");
            pb.set_message(if view.loading { "Loading..." } else { "Nothing to show" });
        }
        Some(PlaybackSnapshot::Unauthenticated { message }) => {
            pb.set_length(0);
            pb.set_prefix("");
            pb.set_message(format!("{} (folio login --state {})", message, user_id));
        }
        Some(PlaybackSnapshot::NotPlaying { message }) => {
            pb.set_length(0);
            pb.set_prefix("");
            pb.set_message(message.clone());
        }
        Some(PlaybackSnapshot::Track(track)) => {
            let state = if track.is_playing { "▶" } else { "⏸" };
            pb.set_length(track.duration);
            pb.set_position(track.progress.min(track.duration));
            pb.set_prefix(format!(
                "{} / {}",
                utils::format_time(track.progress),
                utils::format_time(track.duration)
            ));
            pb.set_message(format!("{} {} - {} ({})", state, track.name, track.artist, track.album));
        }
    }
}

fn render_history(pb: &ProgressBar, view: &HistoryView) {
    if let Some(err) = &view.error {
        pb.println(format!("Cannot load recently played tracks: {}", err));
        return;
    }

    let Some(recent) = &view.recent else {
        return;
    };
    if !recent.authenticated || recent.tracks.is_empty() {
        return;
    }

    let rows = super::recent::recent_rows(recent, Utc::now());
    pb.println(format!("Recently played\n{}", Table::new(rows)));
}
