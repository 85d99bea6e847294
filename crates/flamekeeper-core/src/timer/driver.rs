//! Live scheduling of a [`Countdown`].
//!
//! A single tokio task owns the engine and fires one tick per period. Pausing
//! parks the task on the pause signal with no tick pending, so no time is
//! consumed; resuming starts a fresh period from the exact remaining value.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::engine::{Countdown, CountdownHooks, TimerState};
use crate::events::Event;

/// Running countdown. Dropping it tears the task down.
pub struct CountdownHandle {
    paused: watch::Sender<bool>,
    force_end: watch::Sender<bool>,
    events: mpsc::UnboundedReceiver<Event>,
    task: Option<JoinHandle<Countdown>>,
}

impl CountdownHandle {
    pub fn pause(&self) {
        self.paused.send_if_modified(|p| !std::mem::replace(p, true));
    }

    pub fn resume(&self) {
        self.paused.send_if_modified(|p| std::mem::replace(p, false));
    }

    /// Assert the force-end signal; the timer completes on its next tick.
    pub fn force_end(&self) {
        self.force_end.send_if_modified(|f| !std::mem::replace(f, true));
    }

    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the pending tick and stop the task.
    pub fn teardown(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Wait for the countdown to complete and get the engine back.
    /// `None` if it was torn down. Never returns for a repeating timer
    /// unless it is force-ended.
    pub async fn join(mut self) -> Option<Countdown> {
        self.task.take()?.await.ok()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Start `countdown` (if idle) and spawn its tick loop on the current runtime.
///
/// If the engine cannot be seeded the task ends immediately without events.
pub fn spawn_countdown<H>(countdown: Countdown, hooks: H, tick: Duration) -> CountdownHandle
where
    H: CountdownHooks + 'static,
{
    let (paused_tx, paused_rx) = watch::channel(false);
    let (force_tx, force_rx) = watch::channel(false);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(countdown, hooks, tick, paused_rx, force_rx, events_tx));
    CountdownHandle {
        paused: paused_tx,
        force_end: force_tx,
        events: events_rx,
        task: Some(task),
    }
}

async fn run<H: CountdownHooks>(
    mut countdown: Countdown,
    mut hooks: H,
    tick: Duration,
    mut paused: watch::Receiver<bool>,
    force_end: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<Event>,
) -> Countdown {
    if matches!(countdown.state(), TimerState::Idle | TimerState::Completed) {
        match countdown.start(&mut hooks) {
            Some(event) => {
                let _ = events.send(event);
            }
            None => {
                tracing::warn!("countdown has no duration to start from");
                return countdown;
            }
        }
    }

    loop {
        if *paused.borrow_and_update() {
            if let Some(event) = countdown.pause() {
                let _ = events.send(event);
            }
            if paused.changed().await.is_err() {
                break;
            }
            continue;
        }
        if let Some(event) = countdown.resume() {
            let _ = events.send(event);
        }

        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let ticked = tokio::select! {
                _ = ticker.tick() => true,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return countdown;
                    }
                    false
                }
            };
            if !ticked {
                break;
            }
            if *force_end.borrow() {
                countdown.request_end();
            }
            if let Some(event) = countdown.tick(&mut hooks) {
                let _ = events.send(event);
            }
            if countdown.state() == TimerState::Completed {
                return countdown;
            }
        }
    }

    countdown
}
