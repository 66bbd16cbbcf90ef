use std::{future::pending, pin::Pin, time::Duration};

use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep};

use crate::types::{PlaybackSnapshot, TrackPlayback};

/// Period of the local progress tick.
pub const TICK: Duration = Duration::from_secs(1);

/// Earliest the end-of-track fetch may fire after entering `Playing`.
pub const MIN_END_OF_TRACK_DELAY: Duration = Duration::from_millis(1000);

const TICK_MS: u64 = TICK.as_millis() as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Finished,
}

/// What the interpolator wants the owner to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    /// Local position advanced by one tick.
    Progress(TrackPlayback),
    /// Position reached the duration. Emitted once per `Playing` entry.
    Finished(TrackPlayback),
    /// The track should be over now: poll upstream immediately.
    EndOfTrack,
}

enum State {
    Idle,
    Playing {
        track: TrackPlayback,
        ticker: Interval,
        end_of_track: Option<Pin<Box<Sleep>>>,
    },
    Finished {
        end_of_track: Option<Pin<Box<Sleep>>>,
    },
}

/// Advances playback position locally between polls.
///
/// Timers live inside the state value, so at most one progress tick and one
/// end-of-track timer exist at any time and replacing the state cancels them.
pub struct ProgressInterpolator {
    state: State,
}

impl Default for ProgressInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressInterpolator {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Playing { .. } => Phase::Playing,
            State::Finished { .. } => Phase::Finished,
        }
    }

    /// The interpolated track while `Playing`.
    pub fn track(&self) -> Option<&TrackPlayback> {
        match &self.state {
            State::Playing { track, .. } => Some(track),
            _ => None,
        }
    }

    pub fn has_end_of_track_timer(&self) -> bool {
        match &self.state {
            State::Playing { end_of_track, .. } | State::Finished { end_of_track } => {
                end_of_track.is_some()
            }
            State::Idle => false,
        }
    }

    /// Cancels all timers and returns to `Idle`.
    pub fn supersede(&mut self) {
        self.state = State::Idle;
    }

    /// Supersedes the current state, then enters `Playing` if `snapshot` is
    /// a playing track with a known duration. Anything else leaves it `Idle`.
    pub fn enter(&mut self, snapshot: &PlaybackSnapshot) {
        self.supersede();

        let Some(track) = snapshot.track() else {
            return;
        };
        if !track.is_playing || track.duration == 0 {
            return;
        }

        let remaining = Duration::from_millis(track.duration.saturating_sub(track.progress));
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.state = State::Playing {
            track: track.clone(),
            ticker,
            end_of_track: Some(Box::pin(sleep(remaining.max(MIN_END_OF_TRACK_DELAY)))),
        };
    }

    /// Waits for the next timer to fire. Pends forever while nothing is armed.
    ///
    /// Cancel safe: dropping the future before it resolves loses no state.
    pub async fn next_event(&mut self) -> TickEvent {
        match &mut self.state {
            State::Idle => pending().await,
            State::Finished { end_of_track } => {
                fire(end_of_track).await;
                TickEvent::EndOfTrack
            }
            State::Playing {
                track,
                ticker,
                end_of_track,
            } => {
                let ticked = tokio::select! {
                    _ = ticker.tick() => true,
                    _ = fire(end_of_track) => false,
                };
                if !ticked {
                    return TickEvent::EndOfTrack;
                }

                track.progress = (track.progress + TICK_MS).min(track.duration);
                if track.progress < track.duration {
                    return TickEvent::Progress(track.clone());
                }

                track.is_playing = false;
                let finished = track.clone();
                let end_of_track = end_of_track.take();
                self.state = State::Finished { end_of_track };
                TickEvent::Finished(finished)
            }
        }
    }
}

/// Resolves when the timer elapses, then disarms it. Pends while unarmed.
async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
    *timer = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(progress: u64, duration: u64) -> PlaybackSnapshot {
        PlaybackSnapshot::Track(TrackPlayback {
            track_id: "X-Y".into(),
            name: "X".into(),
            artist: "Y".into(),
            album: "Z".into(),
            is_playing: true,
            progress,
            duration,
            image: None,
            external_url: None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_the_end_of_the_track_without_polls() {
        let mut interpolator = ProgressInterpolator::new();
        interpolator.enter(&playing(0, 180_000));
        assert_eq!(interpolator.phase(), Phase::Playing);

        let mut progress_events = 0;
        let mut finished = Vec::new();
        let mut end_of_track = 0;
        while finished.is_empty() || end_of_track == 0 {
            match interpolator.next_event().await {
                TickEvent::Progress(track) => {
                    assert!(track.progress <= track.duration);
                    progress_events += 1;
                }
                TickEvent::Finished(track) => finished.push(track),
                TickEvent::EndOfTrack => end_of_track += 1,
            }
        }

        assert_eq!(progress_events, 179);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].progress, 180_000);
        assert!(!finished[0].is_playing);
        assert_eq!(end_of_track, 1);
        assert_eq!(interpolator.phase(), Phase::Finished);

        // nothing left armed: no further ticks and no second finish
        let next = tokio::time::timeout(Duration::from_secs(60), interpolator.next_event()).await;
        assert!(next.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_track_fires_at_remaining_duration() {
        let mut interpolator = ProgressInterpolator::new();
        let start = Instant::now();
        interpolator.enter(&playing(177_500, 180_000));

        loop {
            if interpolator.next_event().await == TickEvent::EndOfTrack {
                break;
            }
        }
        assert_eq!(start.elapsed(), Duration::from_millis(2_500));
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_track_delay_has_a_floor() {
        let mut interpolator = ProgressInterpolator::new();
        let start = Instant::now();
        interpolator.enter(&playing(179_900, 180_000));

        let first = interpolator.next_event().await;
        assert!(matches!(first, TickEvent::Finished(_) | TickEvent::EndOfTrack));
        assert!(start.elapsed() >= MIN_END_OF_TRACK_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_or_empty_snapshots_stay_idle() {
        let mut interpolator = ProgressInterpolator::new();

        let mut paused = playing(1_000, 180_000);
        if let PlaybackSnapshot::Track(track) = &mut paused {
            track.is_playing = false;
        }
        interpolator.enter(&paused);
        assert_eq!(interpolator.phase(), Phase::Idle);

        interpolator.enter(&PlaybackSnapshot::not_playing());
        assert_eq!(interpolator.phase(), Phase::Idle);
        assert!(!interpolator.has_end_of_track_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn reentering_replaces_previous_timers() {
        let mut interpolator = ProgressInterpolator::new();
        interpolator.enter(&playing(0, 10_000));
        tokio::time::advance(Duration::from_millis(500)).await;
        interpolator.enter(&playing(0, 60_000));

        // the first entry's end-of-track at 10s must not fire
        let start = Instant::now();
        let mut ticks = 0;
        loop {
            match interpolator.next_event().await {
                TickEvent::Progress(_) => ticks += 1,
                TickEvent::EndOfTrack => break,
                TickEvent::Finished(_) => {}
            }
        }
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert!(ticks >= 58);

        interpolator.supersede();
        assert_eq!(interpolator.phase(), Phase::Idle);
        assert!(interpolator.track().is_none());
    }
}
