use crate::types::PlaybackSnapshot;

/// Progress differences up to this many milliseconds are not a change.
pub const PROGRESS_TOLERANCE_MS: u64 = 1000;

/// Outcome of comparing a fresh poll result with the rendered snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Same track, same status: keep what is rendered.
    Discard,
    /// Same track, status changed (or first result ever).
    Update,
    /// Different track: update and refresh the recently-played list.
    UpdateAndRefreshHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unauthenticated,
    NotPlaying,
    Playing,
    Paused,
}

fn status(snapshot: &PlaybackSnapshot) -> Status {
    match snapshot {
        PlaybackSnapshot::Unauthenticated { .. } => Status::Unauthenticated,
        PlaybackSnapshot::NotPlaying { .. } => Status::NotPlaying,
        PlaybackSnapshot::Track(track) if track.is_playing => Status::Playing,
        PlaybackSnapshot::Track(_) => Status::Paused,
    }
}

/// Decides what a fresh poll result means for the rendered state.
///
/// Track identity is the `trackId` only; progress never takes part here.
pub fn decide(previous: Option<&PlaybackSnapshot>, fresh: &PlaybackSnapshot) -> Decision {
    let Some(previous) = previous else {
        return Decision::Update;
    };

    if previous.track_id() != fresh.track_id() {
        return Decision::UpdateAndRefreshHistory;
    }
    if status(previous) == status(fresh) {
        Decision::Discard
    } else {
        Decision::Update
    }
}

/// True when rendering `b` in place of `a` would show nothing new.
///
/// Compares every visible field exactly, except progress which may drift by
/// up to [`PROGRESS_TOLERANCE_MS`].
pub fn equivalent(a: &PlaybackSnapshot, b: &PlaybackSnapshot) -> bool {
    match (a, b) {
        (PlaybackSnapshot::Track(a), PlaybackSnapshot::Track(b)) => {
            a.name == b.name
                && a.artist == b.artist
                && a.album == b.album
                && a.is_playing == b.is_playing
                && a.progress.abs_diff(b.progress) <= PROGRESS_TOLERANCE_MS
        }
        (a, b) => {
            a.is_authenticated() == b.is_authenticated()
                && a.is_playing() == b.is_playing()
                && a.message() == b.message()
                && a.track().is_none()
                && b.track().is_none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackPlayback;

    fn track(id: &str, name: &str, is_playing: bool, progress: u64) -> PlaybackSnapshot {
        PlaybackSnapshot::Track(TrackPlayback {
            track_id: id.into(),
            name: name.into(),
            artist: "Y".into(),
            album: "Z".into(),
            is_playing,
            progress,
            duration: 180_000,
            image: None,
            external_url: None,
        })
    }

    #[test]
    fn same_track_same_status_is_discarded_even_with_large_progress_jump() {
        let previous = track("a", "X", true, 5_000);
        let fresh = track("a", "X", true, 95_000);
        assert_eq!(decide(Some(&previous), &fresh), Decision::Discard);
    }

    #[test]
    fn status_change_updates_without_history_refresh() {
        let previous = track("a", "X", true, 5_000);
        let fresh = track("a", "X", false, 5_000);
        assert_eq!(decide(Some(&previous), &fresh), Decision::Update);
    }

    #[test]
    fn new_track_refreshes_history() {
        let previous = track("a", "X", true, 5_000);
        let fresh = track("b", "W", true, 0);
        assert_eq!(decide(Some(&previous), &fresh), Decision::UpdateAndRefreshHistory);

        let stopped = PlaybackSnapshot::not_playing();
        assert_eq!(decide(Some(&previous), &stopped), Decision::UpdateAndRefreshHistory);
    }

    #[test]
    fn first_result_updates_without_refresh() {
        assert_eq!(decide(None, &track("a", "X", true, 0)), Decision::Update);
    }

    #[test]
    fn sentinel_states_compare_by_status() {
        let unauthenticated = PlaybackSnapshot::unauthenticated();
        let idle = PlaybackSnapshot::not_playing();
        assert_eq!(decide(Some(&idle), &idle.clone()), Decision::Discard);
        assert_eq!(decide(Some(&idle), &unauthenticated), Decision::Update);
    }

    #[test]
    fn equivalence_tolerates_sub_second_drift() {
        assert!(equivalent(&track("a", "X", true, 5_000), &track("a", "X", true, 5_400)));
        assert!(equivalent(&track("a", "X", true, 5_000), &track("a", "X", true, 6_000)));
        assert!(!equivalent(&track("a", "X", true, 5_000), &track("a", "X", true, 6_001)));
        assert!(!equivalent(&track("a", "X", true, 5_000), &track("a", "X", false, 5_000)));
        assert!(!equivalent(&track("a", "X", true, 0), &PlaybackSnapshot::not_playing()));
        assert!(equivalent(&PlaybackSnapshot::not_playing(), &PlaybackSnapshot::not_playing()));
        assert!(!equivalent(
            &PlaybackSnapshot::not_playing(),
            &PlaybackSnapshot::unauthenticated()
        ));
    }
}
