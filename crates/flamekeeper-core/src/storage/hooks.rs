//! Glue between the live drivers and the progress store.

use std::sync::MutexGuard;

use super::play_store::{PlayStore, SharedStore};
use crate::flame::CursorStore;
use crate::session::SessionKey;
use crate::timer::{CountdownHooks, TimerMode};

fn lock(store: &SharedStore) -> MutexGuard<'_, PlayStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Countdown hooks that keep the remaining time in the player's level record.
///
/// Repeating timers use the `session_time` slot, one-shot timers the
/// `current_time` slot. Storage failures are logged and otherwise ignored so
/// a bad disk never stalls the clock.
pub struct StoreCountdown<D> {
    store: SharedStore,
    mode: TimerMode,
    duration: D,
}

impl<D> StoreCountdown<D>
where
    D: FnMut() -> Option<u64> + Send,
{
    /// `duration` supplies the seed in the mode's unit and is re-read on
    /// every re-seed.
    pub fn new(store: SharedStore, mode: TimerMode, duration: D) -> Self {
        Self {
            store,
            mode,
            duration,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

impl<D> CountdownHooks for StoreCountdown<D>
where
    D: FnMut() -> Option<u64> + Send,
{
    fn initial_duration(&mut self) -> Option<u64> {
        (self.duration)()
    }

    fn saved_remaining(&mut self) -> Option<u64> {
        let store = lock(&self.store);
        let saved = match self.mode {
            TimerMode::Session => store.session_time(),
            TimerMode::Minutes => store.current_time(),
        };
        match saved {
            Ok(value) => value.flatten(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read saved countdown");
                None
            }
        }
    }

    fn persist(&mut self, remaining_secs: u64) {
        let mut store = lock(&self.store);
        let result = match self.mode {
            TimerMode::Session => store.set_session_time(remaining_secs),
            TimerMode::Minutes => store.set_current_time(remaining_secs),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, remaining_secs, "failed to persist countdown");
        }
    }

    fn on_clear(&mut self) {
        let mut store = lock(&self.store);
        let result = match self.mode {
            TimerMode::Session => store.clear_session_time(),
            TimerMode::Minutes => store.clear_current_time(),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to clear countdown");
        }
    }
}

/// Flame cursor persistence bound to one session.
///
/// The key is fixed at construction so a flame keeps writing to the session
/// it started in even if the player moves on meanwhile.
pub struct StoreCursor {
    store: SharedStore,
    key: SessionKey,
}

impl StoreCursor {
    pub fn new(store: SharedStore, key: SessionKey) -> Self {
        Self { store, key }
    }

    /// Bind to the store's current session. `None` when nobody is signed in.
    pub fn current(store: SharedStore) -> crate::error::Result<Option<Self>> {
        let key = lock(&store).session_key()?;
        Ok(key.map(|key| Self::new(store, key)))
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }
}

impl CursorStore for StoreCursor {
    fn load_cursor(&mut self) -> Option<usize> {
        match lock(&self.store).cursor_at(&self.key) {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "failed to load flame cursor");
                None
            }
        }
    }

    fn save_cursor(&mut self, cursor: usize) {
        if let Err(e) = lock(&self.store).set_cursor_at(&self.key, cursor) {
            tracing::warn!(error = %e, key = %self.key, cursor, "failed to save flame cursor");
        }
    }
}
