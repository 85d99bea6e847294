use std::sync::MutexGuard;

use clap::{Subcommand, ValueEnum};
use flamekeeper_core::flame::{FlameHandle, FlameSink};
use flamekeeper_core::storage::SharedDatabase;
use flamekeeper_core::{
    spawn_countdown, spawn_flame, ApiClient, Config, Countdown, Database, Event, FlamePattern,
    FlameSampler, NumericSeries, PlayStore, SharedStore, StoreCountdown, StoreCursor, TimerMode,
};
use serde_json::json;
use tokio::sync::watch;

use super::{lock, print_json, print_line, runtime, CmdResult, PlayerArg, SeriesSource};

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// One-shot countdown, duration in minutes
    Minutes,
    /// Repeating countdown, duration in seconds
    Session,
}

impl From<ModeArg> for TimerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Minutes => TimerMode::Minutes,
            ModeArg::Session => TimerMode::Session,
        }
    }
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a countdown in the foreground, printing events as JSON lines.
    /// Ctrl-C ends the current session on the next tick.
    Run {
        #[command(flatten)]
        player: PlayerArg,
        #[arg(long, value_enum, default_value_t = ModeArg::Session)]
        mode: ModeArg,
        /// Duration in the mode's unit (defaults from config)
        #[arg(long)]
        duration: Option<u64>,
        /// Ask the time endpoint for the duration
        #[arg(long, conflicts_with = "duration")]
        time_from_api: bool,
        /// Stop after this many completed sessions
        #[arg(long)]
        sessions: Option<u32>,
        /// Drive the flame alongside the timer and score each session
        #[arg(long)]
        flame: bool,
        #[command(flatten)]
        source: SeriesSource,
    },
    /// Show the saved remaining time at the player's current level
    Status {
        #[command(flatten)]
        player: PlayerArg,
    },
    /// Forget saved remaining times at the player's current level
    Reset {
        #[command(flatten)]
        player: PlayerArg,
    },
}

struct RunOptions {
    player: PlayerArg,
    mode: TimerMode,
    duration: Option<u64>,
    time_from_api: bool,
    sessions: Option<u32>,
    flame: bool,
    source: SeriesSource,
}

/// Flame output goes to the log; the event stream carries the samples.
struct LogSink;

impl FlameSink for LogSink {
    fn intensity(&mut self, value: f64) {
        tracing::debug!(intensity = value, "flame intensity");
    }
}

/// Duration and progress of the session currently on the clock.
#[derive(Default)]
struct SessionClock {
    total_secs: u64,
    remaining_secs: u64,
}

impl SessionClock {
    fn elapsed_secs(&self) -> u64 {
        self.total_secs.saturating_sub(self.remaining_secs)
    }
}

pub fn run(action: TimerAction) -> CmdResult {
    match action {
        TimerAction::Run {
            player,
            mode,
            duration,
            time_from_api,
            sessions,
            flame,
            source,
        } => runtime()?.block_on(run_countdown(RunOptions {
            player,
            mode: mode.into(),
            duration,
            time_from_api,
            sessions,
            flame,
            source,
        })),
        TimerAction::Status { player } => {
            let store = player.store()?;
            let key = store.session_key()?;
            print_json(&json!({
                "key": key.map(|k| k.to_string()),
                "session_time": store.session_time()?.flatten(),
                "current_time": store.current_time()?.flatten(),
            }))
        }
        TimerAction::Reset { player } => {
            let mut store = player.store()?;
            store.clear_session_time()?;
            store.clear_current_time()?;
            println!("ok");
            Ok(())
        }
    }
}

async fn resolve_duration(opts: &RunOptions, config: &Config) -> CmdResult<u64> {
    if let Some(duration) = opts.duration {
        return Ok(duration);
    }
    if opts.time_from_api {
        let secs = ApiClient::new(&config.api)?.fetch_time().await?;
        return Ok(match opts.mode {
            TimerMode::Session => secs,
            TimerMode::Minutes => secs.div_ceil(60),
        });
    }
    Ok(match opts.mode {
        TimerMode::Session => config.timer.session_duration_secs,
        TimerMode::Minutes => config.timer.level_duration_min,
    })
}

async fn run_countdown(opts: RunOptions) -> CmdResult {
    let config = Config::load()?;
    let db = Database::open()?.into_shared();
    let store = PlayStore::new(db.clone())
        .with_user(opts.player.id()?)
        .into_shared();

    let duration = resolve_duration(&opts, &config).await?;
    let hooks = StoreCountdown::new(store.clone(), opts.mode, move || Some(duration));

    let series = if opts.flame {
        Some(opts.source.load(&config).await?)
    } else {
        None
    };
    let mut flame = match &series {
        Some(series) => {
            let sampler = FlameSampler::new(series.clone(), config.flame.window()?);
            Some(start_flame(sampler, &config, &store)?)
        }
        None => None,
    };

    let pattern = config.flame.pattern();
    let mut timer = spawn_countdown(Countdown::new(opts.mode), hooks, config.timer.tick());
    let mut clock = SessionClock::default();
    let mut finished = 0u32;
    let mut interrupted = false;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = timer.next_event() => {
                let Some(event) = event else { break };
                print_line(&event)?;
                match event {
                    Event::TimerStarted { remaining_secs, .. } => {
                        clock = SessionClock { total_secs: remaining_secs, remaining_secs };
                    }
                    Event::TimerTicked { remaining_secs, .. } => {
                        clock.remaining_secs = remaining_secs;
                    }
                    Event::TimerReseeded { remaining_secs, .. } => {
                        clock.remaining_secs = 0;
                        let score = session_score(series.as_ref(), flame.as_ref(), pattern, &clock);
                        record(&db, &store, &clock, score, false)?;
                        clock = SessionClock { total_secs: remaining_secs, remaining_secs };
                        advance_session(&store, remaining_secs)?;
                        if let Some(live) = flame.take() {
                            flame = Some(rebind_flame(live, &config, &store).await?);
                        }
                        finished += 1;
                        if opts.sessions.is_some_and(|limit| finished >= limit) {
                            timer.teardown();
                            break;
                        }
                    }
                    Event::TimerCompleted { forced, .. } => {
                        if !forced {
                            clock.remaining_secs = 0;
                        }
                        let score = session_score(series.as_ref(), flame.as_ref(), pattern, &clock);
                        record(&db, &store, &clock, score, forced)?;
                        break;
                    }
                    _ => {}
                }
            }
            Some(event) = next_flame_event(&mut flame) => print_line(&event)?,
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                tracing::info!("interrupt received, ending session");
                timer.force_end();
            }
        }
    }

    if let Some(live) = flame.take() {
        stop_flame(live).await?;
    }
    Ok(())
}

/// Move the player to the next session, which starts on a fresh seed.
fn advance_session(store: &SharedStore, seed_secs: u64) -> CmdResult {
    let mut store = lock(store)?;
    store.increment_session()?;
    store.set_session_time(seed_secs)?;
    Ok(())
}

/// A flame bound to one session's cursor slot.
struct LiveFlame {
    handle: FlameHandle,
    enabled: watch::Sender<bool>,
    /// Cursor when the session began; the session is scored from here.
    start_cursor: usize,
}

fn start_flame(
    sampler: FlameSampler,
    config: &Config,
    store: &SharedStore,
) -> CmdResult<LiveFlame> {
    let cursors = StoreCursor::current(store.clone())?.ok_or("no player signed in")?;
    let start_cursor = lock(store)?.cursor_at(cursors.key())?;
    let (enabled, enabled_rx) = watch::channel(true);
    let handle = spawn_flame(sampler, LogSink, cursors, enabled_rx, config.timer.tick());
    Ok(LiveFlame {
        handle,
        enabled,
        start_cursor,
    })
}

/// Stop the flame, printing whatever it queued, and hand back its sampler.
async fn stop_flame(live: LiveFlame) -> CmdResult<FlameSampler> {
    let LiveFlame {
        mut handle,
        enabled,
        ..
    } = live;
    drop(enabled);
    while let Some(event) = handle.next_event().await {
        print_line(&event)?;
    }
    Ok(handle.join().await.ok_or("flame driver did not stop cleanly")?)
}

/// Move a running flame over to the store's current session. The new session
/// picks up the series where the previous one left it.
async fn rebind_flame(
    live: LiveFlame,
    config: &Config,
    store: &SharedStore,
) -> CmdResult<LiveFlame> {
    let sampler = stop_flame(live).await?;
    let key = lock(store)?.session_key()?.ok_or("no player signed in")?;
    lock(store)?.set_cursor_at(&key, sampler.cursor())?;
    start_flame(sampler, config, store)
}

async fn next_flame_event(flame: &mut Option<LiveFlame>) -> Option<Event> {
    match flame {
        Some(live) => live.handle.next_event().await,
        None => std::future::pending().await,
    }
}

/// Score of the session on the clock, read from the part of the series the
/// flame covered since the session began. Zero without a flame.
fn session_score(
    series: Option<&NumericSeries>,
    flame: Option<&LiveFlame>,
    pattern: FlamePattern,
    clock: &SessionClock,
) -> f64 {
    let (Some(series), Some(flame)) = (series, flame) else {
        return 0.0;
    };
    let values = series.as_slice();
    let from = flame.start_cursor.min(values.len());
    pattern.score(
        &values[from..],
        clock.elapsed_secs() as f64,
        clock.total_secs as f64,
    )
}

/// Log a finished session and bump the played count.
fn record(
    db: &SharedDatabase,
    store: &SharedStore,
    clock: &SessionClock,
    score: f64,
    forced: bool,
) -> CmdResult {
    let key = lock(store)?.session_key()?.ok_or("no player signed in")?;
    lock_db(db)?.record_session(&key, clock.elapsed_secs(), score, forced, chrono::Utc::now())?;
    if !forced {
        lock(store)?.increment_played_sessions()?;
    }
    tracing::info!(%key, score, forced, "session recorded");
    Ok(())
}

fn lock_db(db: &SharedDatabase) -> CmdResult<MutexGuard<'_, Database>> {
    db.lock().map_err(|_| "database lock poisoned".into())
}
