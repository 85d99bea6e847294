//! Countdown engine implementation.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads or read the clock: every call to `tick()` is one elapsed second,
//! and the caller (normally [`spawn_countdown`](super::spawn_countdown))
//! decides when ticks happen.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            +-> Completed      (minutes mode at zero, or forced end)
//!            +-> Running        (session mode at zero: re-seeded)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = Countdown::new(TimerMode::Session);
//! engine.start(&mut hooks);
//! // Once per second:
//! engine.tick(&mut hooks);
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// How the initial duration is read and what happens at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Duration is in minutes; the timer stops once at zero.
    Minutes,
    /// Duration is in seconds; the timer re-seeds at zero and keeps going.
    Session,
}

impl TimerMode {
    /// Convert a provider duration to seconds.
    pub fn to_secs(self, duration: u64) -> u64 {
        match self {
            TimerMode::Minutes => duration.saturating_mul(60),
            TimerMode::Session => duration,
        }
    }
}

/// Collaborators the engine reads from and reports to.
///
/// Only `initial_duration` and `persist` are required.
pub trait CountdownHooks: Send {
    /// Duration for a fresh start or a re-seed, in the mode's unit.
    /// Called again on every re-seed so the value may change between sessions.
    fn initial_duration(&mut self) -> Option<u64>;

    /// Remaining seconds saved by an earlier run, if any.
    fn saved_remaining(&mut self) -> Option<u64> {
        None
    }

    /// Store the current remaining seconds.
    fn persist(&mut self, remaining_secs: u64);

    fn on_tick(&mut self, _remaining_secs: u64) {}

    /// Called once when the timer completes, naturally or forced, and on reset.
    fn on_clear(&mut self) {}
}

/// Core countdown engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Countdown {
    mode: TimerMode,
    state: TimerState,
    remaining_secs: u64,
    /// Set by the force-end signal; honoured on the next tick.
    #[serde(default)]
    end_requested: bool,
    /// Number of re-seeds performed since start.
    #[serde(default)]
    cycle: u32,
}

impl Countdown {
    /// Create an idle engine. Nothing is seeded until `start`.
    pub fn new(mode: TimerMode) -> Self {
        Self {
            mode,
            state: TimerState::Idle,
            remaining_secs: 0,
            end_requested: false,
            cycle: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn is_end_requested(&self) -> bool {
        self.end_requested
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            cycle: self.cycle,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Seed and start running.
    ///
    /// Saved progress wins over the initial duration. Returns `None` (and
    /// stays put) if already running/paused or if no positive seed exists.
    pub fn start<H: CountdownHooks + ?Sized>(&mut self, hooks: &mut H) -> Option<Event> {
        match self.state {
            TimerState::Idle | TimerState::Completed => {
                let saved = hooks.saved_remaining().filter(|s| *s > 0);
                let from_saved = saved.is_some();
                let seed = saved.or_else(|| self.fresh_seed(hooks))?;

                self.state = TimerState::Running;
                self.remaining_secs = seed;
                self.end_requested = false;
                self.cycle = 0;
                hooks.persist(seed);
                tracing::info!(mode = ?self.mode, seed, from_saved, "countdown started");
                Some(Event::TimerStarted {
                    mode: self.mode,
                    remaining_secs: seed,
                    from_saved,
                    at: Utc::now(),
                })
            }
            TimerState::Running | TimerState::Paused => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::Paused;
                Some(Event::TimerPaused {
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Continue from the exact remaining value; never re-seeds.
    pub fn resume(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Paused => {
                self.state = TimerState::Running;
                Some(Event::TimerResumed {
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Raise the force-end signal. The next tick completes the timer.
    pub fn request_end(&mut self) {
        if matches!(self.state, TimerState::Running | TimerState::Paused) {
            self.end_requested = true;
        }
    }

    pub fn reset<H: CountdownHooks + ?Sized>(&mut self, hooks: &mut H) -> Option<Event> {
        self.state = TimerState::Idle;
        self.remaining_secs = 0;
        self.end_requested = false;
        self.cycle = 0;
        hooks.on_clear();
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// Advance one second. Does nothing unless running.
    pub fn tick<H: CountdownHooks + ?Sized>(&mut self, hooks: &mut H) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        if self.end_requested {
            return Some(self.complete(hooks, true));
        }
        if self.remaining_secs > 1 {
            self.remaining_secs -= 1;
            hooks.persist(self.remaining_secs);
            hooks.on_tick(self.remaining_secs);
            tracing::debug!(remaining = self.remaining_secs, "countdown tick");
            return Some(Event::TimerTicked {
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            });
        }

        match self.mode {
            TimerMode::Minutes => Some(self.complete(hooks, false)),
            TimerMode::Session => match self.fresh_seed(hooks) {
                Some(seed) => {
                    self.remaining_secs = seed;
                    self.cycle = self.cycle.saturating_add(1);
                    hooks.persist(seed);
                    hooks.on_tick(seed);
                    tracing::info!(seed, cycle = self.cycle, "countdown re-seeded");
                    Some(Event::TimerReseeded {
                        remaining_secs: seed,
                        cycle: self.cycle,
                        at: Utc::now(),
                    })
                }
                None => {
                    tracing::warn!("no duration available to re-seed, completing");
                    Some(self.complete(hooks, false))
                }
            },
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fresh_seed<H: CountdownHooks + ?Sized>(&self, hooks: &mut H) -> Option<u64> {
        hooks
            .initial_duration()
            .map(|d| self.mode.to_secs(d))
            .filter(|s| *s > 0)
    }

    fn complete<H: CountdownHooks + ?Sized>(&mut self, hooks: &mut H, forced: bool) -> Event {
        self.state = TimerState::Completed;
        self.remaining_secs = 0;
        self.end_requested = false;
        hooks.persist(0);
        hooks.on_clear();
        tracing::info!(forced, "countdown completed");
        Event::TimerCompleted {
            forced,
            at: Utc::now(),
        }
    }
}
