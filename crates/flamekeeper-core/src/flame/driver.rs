//! Live scheduling of a [`FlameSampler`].
//!
//! One tokio task per flame. While the externally owned enabled flag is
//! true it takes one window immediately and then one per tick; a flip to
//! false drops the pending tick, leaving the cursor where it was.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

use super::sampler::FlameSampler;
use super::visual::{FlameSink, FlameTransition};
use crate::events::Event;

/// Where the sampler cursor survives restarts.
pub trait CursorStore: Send {
    fn load_cursor(&mut self) -> Option<usize>;

    fn save_cursor(&mut self, cursor: usize);
}

/// No persistence.
impl CursorStore for () {
    fn load_cursor(&mut self) -> Option<usize> {
        None
    }

    fn save_cursor(&mut self, _cursor: usize) {}
}

/// Running flame. Dropping it tears the task down.
pub struct FlameHandle {
    events: mpsc::UnboundedReceiver<Event>,
    task: Option<JoinHandle<FlameSampler>>,
}

impl FlameHandle {
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

    /// Wait for the loop to end (enabled sender dropped) and get the sampler
    /// back. `None` if it was torn down.
    pub async fn join(mut self) -> Option<FlameSampler> {
        self.task.take()?.await.ok()
    }
}

impl Drop for FlameHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Spawn the sampling loop onto the current tokio runtime.
///
/// The cursor is restored from `cursors` before the first tick and saved
/// after every window. The loop ends when the `enabled` sender is dropped.
pub fn spawn_flame<S, C>(
    mut sampler: FlameSampler,
    sink: S,
    mut cursors: C,
    enabled: watch::Receiver<bool>,
    tick: Duration,
) -> FlameHandle
where
    S: FlameSink + 'static,
    C: CursorStore + 'static,
{
    if let Some(cursor) = cursors.load_cursor() {
        sampler.seek(cursor);
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(sampler, sink, cursors, enabled, tick, tx));
    FlameHandle {
        events: rx,
        task: Some(task),
    }
}

async fn run<S: FlameSink, C: CursorStore>(
    mut sampler: FlameSampler,
    mut sink: S,
    mut cursors: C,
    mut enabled: watch::Receiver<bool>,
    tick: Duration,
    events: mpsc::UnboundedSender<Event>,
) -> FlameSampler {
    let mut applied: Option<bool> = None;
    let mut ticker: Option<Interval> = None;

    loop {
        let flag = *enabled.borrow_and_update();
        if applied != Some(flag) {
            applied = Some(flag);
            sampler.set_enabled(flag);
            let transition = FlameTransition::from_enabled(flag);
            tracing::info!(?transition, cursor = sampler.cursor(), "flame toggled");
            sink.transition(transition);
            let _ = events.send(Event::FlameToggled {
                transition,
                at: Utc::now(),
            });
            ticker = if flag && !sampler.is_exhausted() {
                let mut t = interval(tick);
                t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(t)
            } else {
                None
            };
        }

        let fired = match ticker.as_mut() {
            Some(t) => tokio::select! {
                _ = t.tick() => true,
                changed = enabled.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    false
                }
            },
            None => {
                if enabled.changed().await.is_err() {
                    break;
                }
                false
            }
        };
        if fired && !step(&mut sampler, &mut sink, &mut cursors, &events) {
            ticker = None;
        }
    }

    tracing::debug!(cursor = sampler.cursor(), "flame driver stopped");
    sampler
}

/// Take one window. Returns false once nothing is left to schedule.
fn step<S: FlameSink, C: CursorStore>(
    sampler: &mut FlameSampler,
    sink: &mut S,
    cursors: &mut C,
    events: &mpsc::UnboundedSender<Event>,
) -> bool {
    if let Some(sample) = sampler.step() {
        sink.intensity(sample.intensity);
        cursors.save_cursor(sampler.cursor());
        let _ = events.send(Event::FlameSampled {
            start: sample.start,
            end: sample.end,
            intensity: sample.intensity,
            at: Utc::now(),
        });
    }
    if sampler.is_exhausted() {
        tracing::info!(cursor = sampler.cursor(), "flame series exhausted");
        let _ = events.send(Event::FlameExhausted {
            cursor: sampler.cursor(),
            at: Utc::now(),
        });
        return false;
    }
    true
}
