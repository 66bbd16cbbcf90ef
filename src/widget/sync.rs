use std::{future::pending, path::PathBuf, pin::Pin, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::{JoinHandle, JoinSet},
    time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    error::WidgetError,
    management::{SWEEP_INTERVAL, TtlCache},
    spotify::DEFAULT_RECENT_LIMIT,
    types::{PlaybackSnapshot, RecentlyPlayed},
};

use super::{
    detector::{self, Decision},
    interpolator::{ProgressInterpolator, TickEvent},
    source::PlaybackSource,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(22);
pub const HISTORY_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const HISTORY_REFRESH_DELAY: Duration = Duration::from_millis(1500);
pub const PLAYBACK_TTL: Duration = Duration::from_secs(2 * 60);
pub const HISTORY_TTL: Duration = Duration::from_secs(5 * 60);

pub const PLAYBACK_NAMESPACE: &str = "spotify_stats";
pub const HISTORY_NAMESPACE: &str = "recently_played";

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub history_interval: Duration,
    pub history_delay: Duration,
    pub history_limit: u32,
    pub sweep_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            history_interval: HISTORY_INTERVAL,
            history_delay: HISTORY_REFRESH_DELAY,
            history_limit: DEFAULT_RECENT_LIMIT,
            sweep_interval: SWEEP_INTERVAL,
        }
    }
}

/// The two client-side cache namespaces. They never share keys or sweepers.
#[derive(Clone)]
pub struct SyncCaches {
    pub playback: Arc<TtlCache<PlaybackSnapshot>>,
    pub history: Arc<TtlCache<RecentlyPlayed>>,
}

impl SyncCaches {
    pub fn in_memory() -> Self {
        Self {
            playback: Arc::new(TtlCache::new(PLAYBACK_NAMESPACE, PLAYBACK_TTL)),
            history: Arc::new(TtlCache::new(HISTORY_NAMESPACE, HISTORY_TTL)),
        }
    }

    /// Caches mirrored to `dir`, so a restart within the TTL renders instantly.
    pub fn persistent(dir: PathBuf) -> Self {
        Self {
            playback: Arc::new(TtlCache::persistent(PLAYBACK_NAMESPACE, PLAYBACK_TTL, dir.clone())),
            history: Arc::new(TtlCache::persistent(HISTORY_NAMESPACE, HISTORY_TTL, dir)),
        }
    }
}

/// What the "now playing" widget renders.
///
/// `revision` grows by one for every visible change; a poll result that is
/// equivalent to what is shown leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackView {
    pub snapshot: Option<PlaybackSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
    pub revision: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryView {
    pub recent: Option<RecentlyPlayed>,
    pub loading: bool,
    pub error: Option<String>,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    Refresh,
    RefreshHistory,
}

/// Owner side of a running synchronization session.
///
/// Dropping the handle tears the session down as well; [`SyncHandle::shutdown`]
/// additionally waits for it.
pub struct SyncHandle {
    playback: watch::Receiver<PlaybackView>,
    history: watch::Receiver<HistoryView>,
    commands: mpsc::UnboundedSender<SyncCommand>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn playback(&self) -> watch::Receiver<PlaybackView> {
        self.playback.clone()
    }

    pub fn history(&self) -> watch::Receiver<HistoryView> {
        self.history.clone()
    }

    /// Polls upstream now, outside the regular cadence.
    pub fn refresh(&self) {
        let _ = self.commands.send(SyncCommand::Refresh);
    }

    pub fn refresh_history(&self) {
        let _ = self.commands.send(SyncCommand::RefreshHistory);
    }

    /// Cancels every timer and in-flight fetch and waits for the loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.task).await;
    }
}

type PollOutcome = (u64, Result<PlaybackSnapshot, WidgetError>);
type HistoryOutcome = (u64, Result<RecentlyPlayed, WidgetError>);

/// Starts keeping the playback and recently-played views of `user_id` in sync.
///
/// Cached snapshots are published before this returns, so the first render
/// never waits on the network. Fresh data is fetched in the background.
pub async fn start(
    user_id: &str,
    source: Arc<dyn PlaybackSource>,
    caches: SyncCaches,
    settings: SyncSettings,
) -> SyncHandle {
    let cached_playback = caches.playback.get(user_id).await;
    let cached_history = caches.history.get(user_id).await;

    let (playback_tx, playback_rx) = watch::channel(PlaybackView {
        snapshot: cached_playback.clone(),
        loading: cached_playback.is_none(),
        error: None,
        revision: u64::from(cached_playback.is_some()),
    });
    let (history_tx, history_rx) = watch::channel(HistoryView {
        recent: cached_history.clone(),
        loading: cached_history.is_none(),
        error: None,
        revision: u64::from(cached_history.is_some()),
    });
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    if cached_playback.is_some() {
        debug!(user_id, "Rendering cached playback snapshot");
    }

    let mut engine = Engine {
        user_id: user_id.to_string(),
        source,
        poll_ticker: ticker(settings.poll_interval),
        history_ticker: ticker(settings.history_interval),
        caches,
        settings,
        playback_tx,
        history_tx,
        current: cached_playback,
        interpolator: ProgressInterpolator::new(),
        polls: JoinSet::new(),
        next_poll_seq: 0,
        applied_poll_seq: 0,
        first_poll_pending: true,
        history_fetches: JoinSet::new(),
        next_history_seq: 0,
        applied_history_seq: 0,
        history_refresh: None,
    };
    if let Some(current) = &engine.current {
        engine.interpolator.enter(current);
    }

    let task = tokio::spawn(engine.run(commands_rx, shutdown_rx));

    SyncHandle {
        playback: playback_rx,
        history: history_rx,
        commands: commands_tx,
        shutdown: Some(shutdown_tx),
        task,
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
    *timer = None;
}

struct Engine {
    user_id: String,
    source: Arc<dyn PlaybackSource>,
    caches: SyncCaches,
    settings: SyncSettings,
    playback_tx: watch::Sender<PlaybackView>,
    history_tx: watch::Sender<HistoryView>,

    current: Option<PlaybackSnapshot>,
    interpolator: ProgressInterpolator,
    poll_ticker: Interval,
    polls: JoinSet<PollOutcome>,
    next_poll_seq: u64,
    applied_poll_seq: u64,
    first_poll_pending: bool,

    history_ticker: Interval,
    history_fetches: JoinSet<HistoryOutcome>,
    next_history_seq: u64,
    applied_history_seq: u64,
    history_refresh: Option<Pin<Box<Sleep>>>,
}

impl Engine {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SyncCommand>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let sweepers = [
            self.caches.playback.spawn_sweeper(self.settings.sweep_interval),
            self.caches.history.spawn_sweeper(self.settings.sweep_interval),
        ];

        self.launch_poll();
        self.launch_history();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(command) = commands.recv() => match command {
                    SyncCommand::Refresh => self.launch_poll(),
                    SyncCommand::RefreshHistory => self.launch_history(),
                },
                _ = self.poll_ticker.tick() => self.launch_poll(),
                _ = self.history_ticker.tick() => self.launch_history(),
                event = self.interpolator.next_event() => self.on_tick(event).await,
                Some(joined) = self.polls.join_next(), if !self.polls.is_empty() => match joined {
                    Ok((seq, result)) => self.on_poll(seq, result).await,
                    Err(e) => warn!(error = %e, "Playback fetch task failed"),
                },
                Some(joined) = self.history_fetches.join_next(), if !self.history_fetches.is_empty() => match joined {
                    Ok((seq, result)) => self.on_history(seq, result).await,
                    Err(e) => warn!(error = %e, "History fetch task failed"),
                },
                _ = fire(&mut self.history_refresh) => self.launch_history(),
            }
        }

        for sweeper in sweepers {
            sweeper.abort();
        }
        info!(user_id = %self.user_id, "Playback sync stopped");
    }

    fn launch_poll(&mut self) {
        self.next_poll_seq += 1;
        let seq = self.next_poll_seq;
        let source = Arc::clone(&self.source);
        let user_id = self.user_id.clone();
        debug!(seq, "Polling currently playing");
        self.polls
            .spawn(async move { (seq, source.currently_playing(&user_id).await) });
    }

    fn launch_history(&mut self) {
        self.next_history_seq += 1;
        let seq = self.next_history_seq;
        let source = Arc::clone(&self.source);
        let user_id = self.user_id.clone();
        let limit = self.settings.history_limit;
        debug!(seq, "Fetching recently played");
        self.history_fetches
            .spawn(async move { (seq, source.recently_played(&user_id, limit).await) });
    }

    /// Arms the delayed history refresh unless one is already pending.
    fn schedule_history_refresh(&mut self) {
        if self.history_refresh.is_none() {
            debug!("Track changed, scheduling history refresh");
            self.history_refresh = Some(Box::pin(sleep(self.settings.history_delay)));
        }
    }

    async fn on_poll(&mut self, seq: u64, result: Result<PlaybackSnapshot, WidgetError>) {
        if seq < self.applied_poll_seq {
            debug!(seq, applied = self.applied_poll_seq, "Dropping out-of-order poll result");
            return;
        }
        self.applied_poll_seq = seq;

        let fresh = match result {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "Failed to fetch currently playing");
                self.playback_tx.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(e.to_string());
                    view.revision += 1;
                });
                return;
            }
        };

        let mut decision = detector::decide(self.current.as_ref(), &fresh);
        // a cached snapshot may be minutes old: correct it when it visibly differs
        if self.first_poll_pending
            && decision == Decision::Discard
            && self
                .current
                .as_ref()
                .is_some_and(|current| !detector::equivalent(current, &fresh))
        {
            decision = Decision::Update;
        }
        self.first_poll_pending = false;

        if decision == Decision::Discard {
            // view stays as rendered; local ticking follows upstream's position
            self.interpolator.enter(&fresh);
            self.publish_playback(false);
            return;
        }

        self.interpolator.enter(&fresh);
        self.caches.playback.put(&self.user_id, fresh.clone()).await;
        let changed = self
            .current
            .as_ref()
            .is_none_or(|current| !detector::equivalent(current, &fresh));
        self.current = Some(fresh);
        self.publish_playback(changed);

        if decision == Decision::UpdateAndRefreshHistory {
            self.schedule_history_refresh();
        }
    }

    async fn on_tick(&mut self, event: TickEvent) {
        match event {
            TickEvent::Progress(track) | TickEvent::Finished(track) => {
                let snapshot = PlaybackSnapshot::Track(track);
                self.caches.playback.put(&self.user_id, snapshot.clone()).await;
                self.current = Some(snapshot);
                self.publish_playback(true);
            }
            TickEvent::EndOfTrack => {
                debug!("Track expected to end, polling now");
                self.launch_poll();
            }
        }
    }

    /// Copies the current snapshot into the view. Receivers are only woken,
    /// and the revision bumped, when something visible changed.
    fn publish_playback(&self, changed: bool) {
        self.playback_tx.send_if_modified(|view| {
            let notify = changed || view.loading || view.error.is_some();
            view.snapshot = self.current.clone();
            view.loading = false;
            view.error = None;
            if notify {
                view.revision += 1;
            }
            notify
        });
    }

    async fn on_history(&mut self, seq: u64, result: Result<RecentlyPlayed, WidgetError>) {
        if seq < self.applied_history_seq {
            debug!(seq, applied = self.applied_history_seq, "Dropping out-of-order history result");
            return;
        }
        self.applied_history_seq = seq;

        match result {
            Ok(recent) => {
                self.caches.history.put(&self.user_id, recent.clone()).await;
                self.history_tx.send_if_modified(|view| {
                    let notify = view.recent.as_ref() != Some(&recent)
                        || view.loading
                        || view.error.is_some();
                    view.recent = Some(recent);
                    view.loading = false;
                    view.error = None;
                    if notify {
                        view.revision += 1;
                    }
                    notify
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch recently played");
                self.history_tx.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(e.to_string());
                    view.revision += 1;
                });
            }
        }
    }
}
