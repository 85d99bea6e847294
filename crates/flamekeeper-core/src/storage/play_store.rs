//! Per-player progress: current level and session, timers, modal flags and
//! the flame cursor.
//!
//! Records are typed and addressed by [`StoreKey`]; the backend only ever
//! sees the JSON-encoded record under the key's string form. Every operation
//! answers `Ok(None)` when no player is signed in.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{KvBackend, MemoryBackend};
use crate::error::Result;
use crate::session::{check_positive, SessionKey, UserId};

pub type SharedStore = Arc<Mutex<PlayStore>>;

/// Address of one progress record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    User(UserId),
    Level(UserId, u32),
    Session(SessionKey),
}

impl StoreKey {
    pub fn user(&self) -> &UserId {
        match self {
            StoreKey::User(user) | StoreKey::Level(user, _) => user,
            StoreKey::Session(key) => key.user(),
        }
    }

    /// Prefix shared by every key of `user`.
    pub fn user_prefix(user: &UserId) -> String {
        format!("user:{user}:")
    }

    pub fn backend_key(&self) -> String {
        let prefix = Self::user_prefix(self.user());
        match self {
            StoreKey::User(_) => format!("{prefix}profile"),
            StoreKey::Level(_, level) => format!("{prefix}level:{level}"),
            StoreKey::Session(key) => {
                format!("{prefix}level:{}:session:{}", key.level(), key.session())
            }
        }
    }
}

/// Progress that follows the player across levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default = "first")]
    pub level: u32,
}

/// Progress within one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    #[serde(default = "first")]
    pub session: u32,
    #[serde(default)]
    pub played_sessions: u32,
    #[serde(default)]
    pub selected_option: Option<String>,
    /// Remaining seconds of the repeating session timer.
    #[serde(default)]
    pub session_time: Option<u64>,
    /// Remaining seconds of the one-shot level timer.
    #[serde(default)]
    pub current_time: Option<u64>,
    #[serde(default)]
    pub complete_time: u64,
}

/// Progress within one session of a level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub last_modal: bool,
    #[serde(default)]
    pub session_modal: bool,
}

fn first() -> u32 {
    1
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            section: None,
            level: first(),
        }
    }
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self {
            session: first(),
            played_sessions: 0,
            selected_option: None,
            session_time: None,
            current_time: None,
            complete_time: 0,
        }
    }
}

/// Everything stored for the current player at their current position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub key: SessionKey,
    pub user: UserProgress,
    pub level: LevelProgress,
    pub session: SessionProgress,
}

enum Scope {
    User,
    Level,
    Session,
}

trait Record: Serialize + DeserializeOwned + Default {
    const SCOPE: Scope;
}

impl Record for UserProgress {
    const SCOPE: Scope = Scope::User;
}

impl Record for LevelProgress {
    const SCOPE: Scope = Scope::Level;
}

impl Record for SessionProgress {
    const SCOPE: Scope = Scope::Session;
}

/// Typed progress store for the signed-in player.
pub struct PlayStore {
    user: Option<UserId>,
    backend: Box<dyn KvBackend>,
}

impl PlayStore {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Self {
            user: None,
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn set_user(&mut self, user: Option<UserId>) {
        self.user = user;
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // ── Keys ─────────────────────────────────────────────────────────

    /// Key of the player's current level and session.
    pub fn session_key(&self) -> Result<Option<SessionKey>> {
        let Some(user) = self.user.clone() else {
            return Ok(None);
        };
        let level = self.load::<UserProgress>(&StoreKey::User(user.clone()))?.level;
        let session = self
            .load::<LevelProgress>(&StoreKey::Level(user.clone(), level))?
            .session;
        Ok(Some(SessionKey::new(user, level, session)?))
    }

    fn key_for<R: Record>(&self) -> Result<Option<StoreKey>> {
        let Some(user) = self.user.clone() else {
            return Ok(None);
        };
        let key = match R::SCOPE {
            Scope::User => StoreKey::User(user),
            Scope::Level => {
                let level = self.load::<UserProgress>(&StoreKey::User(user.clone()))?.level;
                StoreKey::Level(user, level)
            }
            Scope::Session => match self.session_key()? {
                Some(key) => StoreKey::Session(key),
                None => return Ok(None),
            },
        };
        Ok(Some(key))
    }

    fn load<R: Record>(&self, key: &StoreKey) -> Result<R> {
        match self.backend.kv_get(&key.backend_key())? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(R::default()),
        }
    }

    fn read<R: Record, T>(&self, f: impl FnOnce(&R) -> T) -> Result<Option<T>> {
        let Some(key) = self.key_for::<R>()? else {
            return Ok(None);
        };
        let record: R = self.load(&key)?;
        Ok(Some(f(&record)))
    }

    fn update<R: Record, T>(&mut self, f: impl FnOnce(&mut R) -> T) -> Result<Option<T>> {
        let Some(key) = self.key_for::<R>()? else {
            return Ok(None);
        };
        let mut record: R = self.load(&key)?;
        let out = f(&mut record);
        self.save(&key, &record)?;
        Ok(Some(out))
    }

    fn save<R: Record>(&mut self, key: &StoreKey, record: &R) -> Result<()> {
        self.backend
            .kv_set(&key.backend_key(), &serde_json::to_string(record)?)
    }

    // ── Section ──────────────────────────────────────────────────────

    pub fn section(&self) -> Result<Option<Option<String>>> {
        self.read(|r: &UserProgress| r.section.clone())
    }

    pub fn set_section(&mut self, section: impl Into<String>) -> Result<Option<()>> {
        let section = section.into();
        self.update(|r: &mut UserProgress| r.section = Some(section))
    }

    pub fn clear_section(&mut self) -> Result<Option<()>> {
        self.update(|r: &mut UserProgress| r.section = None)
    }

    // ── Level ────────────────────────────────────────────────────────

    /// Current level, 1 when nothing is stored.
    pub fn level(&self) -> Result<Option<u32>> {
        self.read(|r: &UserProgress| r.level)
    }

    pub fn set_level(&mut self, level: u32) -> Result<Option<()>> {
        check_positive("level", level)?;
        self.update(|r: &mut UserProgress| r.level = level)
    }

    pub fn increment_level(&mut self) -> Result<Option<u32>> {
        self.update(|r: &mut UserProgress| {
            r.level = r.level.saturating_add(1);
            r.level
        })
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Current session within the current level, 1 when nothing is stored.
    pub fn session(&self) -> Result<Option<u32>> {
        self.read(|r: &LevelProgress| r.session)
    }

    pub fn set_session(&mut self, session: u32) -> Result<Option<()>> {
        check_positive("session", session)?;
        self.update(|r: &mut LevelProgress| r.session = session)
    }

    /// Move to the next session; the selected option and session timer of
    /// the level start over.
    pub fn increment_session(&mut self) -> Result<Option<u32>> {
        self.update(|r: &mut LevelProgress| {
            r.session = r.session.saturating_add(1);
            r.selected_option = None;
            r.session_time = None;
            r.session
        })
    }

    // ── Played sessions ──────────────────────────────────────────────

    pub fn played_sessions(&self) -> Result<Option<u32>> {
        self.read(|r: &LevelProgress| r.played_sessions)
    }

    pub fn set_played_sessions(&mut self, count: u32) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.played_sessions = count)
    }

    pub fn increment_played_sessions(&mut self) -> Result<Option<u32>> {
        self.update(|r: &mut LevelProgress| {
            r.played_sessions = r.played_sessions.saturating_add(1);
            r.played_sessions
        })
    }

    // ── Selected option ──────────────────────────────────────────────

    pub fn selected_option(&self) -> Result<Option<Option<String>>> {
        self.read(|r: &LevelProgress| r.selected_option.clone())
    }

    pub fn set_selected_option(&mut self, option: impl Into<String>) -> Result<Option<()>> {
        let option = option.into();
        self.update(|r: &mut LevelProgress| r.selected_option = Some(option))
    }

    pub fn clear_selected_option(&mut self) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.selected_option = None)
    }

    // ── Timers ───────────────────────────────────────────────────────

    pub fn session_time(&self) -> Result<Option<Option<u64>>> {
        self.read(|r: &LevelProgress| r.session_time)
    }

    pub fn set_session_time(&mut self, secs: u64) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.session_time = Some(secs))
    }

    pub fn clear_session_time(&mut self) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.session_time = None)
    }

    pub fn current_time(&self) -> Result<Option<Option<u64>>> {
        self.read(|r: &LevelProgress| r.current_time)
    }

    pub fn set_current_time(&mut self, secs: u64) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.current_time = Some(secs))
    }

    pub fn clear_current_time(&mut self) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.current_time = None)
    }

    pub fn complete_time(&self) -> Result<Option<u64>> {
        self.read(|r: &LevelProgress| r.complete_time)
    }

    pub fn set_complete_time(&mut self, secs: u64) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.complete_time = secs)
    }

    pub fn clear_complete_time(&mut self) -> Result<Option<()>> {
        self.update(|r: &mut LevelProgress| r.complete_time = 0)
    }

    // ── Modals ───────────────────────────────────────────────────────

    pub fn last_modal(&self) -> Result<Option<bool>> {
        self.read(|r: &SessionProgress| r.last_modal)
    }

    pub fn set_last_modal(&mut self, shown: bool) -> Result<Option<()>> {
        self.update(|r: &mut SessionProgress| r.last_modal = shown)
    }

    pub fn clear_last_modal(&mut self) -> Result<Option<()>> {
        self.set_last_modal(false)
    }

    pub fn session_modal(&self) -> Result<Option<bool>> {
        self.read(|r: &SessionProgress| r.session_modal)
    }

    pub fn set_session_modal(&mut self, shown: bool) -> Result<Option<()>> {
        self.update(|r: &mut SessionProgress| r.session_modal = shown)
    }

    pub fn clear_session_modal(&mut self) -> Result<Option<()>> {
        self.set_session_modal(false)
    }

    // ── Flame cursor ─────────────────────────────────────────────────

    pub fn cursor(&self) -> Result<Option<usize>> {
        self.read(|r: &SessionProgress| r.cursor)
    }

    pub fn set_cursor(&mut self, cursor: usize) -> Result<Option<()>> {
        self.update(|r: &mut SessionProgress| r.cursor = cursor)
    }

    pub fn clear_cursor(&mut self) -> Result<Option<()>> {
        self.set_cursor(0)
    }

    /// Cursor of a specific session, regardless of the signed-in player.
    pub fn cursor_at(&self, key: &SessionKey) -> Result<usize> {
        let record: SessionProgress = self.load(&StoreKey::Session(key.clone()))?;
        Ok(record.cursor)
    }

    pub fn set_cursor_at(&mut self, key: &SessionKey, cursor: usize) -> Result<()> {
        let key = StoreKey::Session(key.clone());
        let mut record: SessionProgress = self.load(&key)?;
        record.cursor = cursor;
        self.save(&key, &record)
    }

    // ── Whole-player operations ──────────────────────────────────────

    pub fn snapshot(&self) -> Result<Option<ProgressSnapshot>> {
        let Some(key) = self.session_key()? else {
            return Ok(None);
        };
        let user = self.load(&StoreKey::User(key.user().clone()))?;
        let level = self.load(&StoreKey::Level(key.user().clone(), key.level()))?;
        let session = self.load(&StoreKey::Session(key.clone()))?;
        Ok(Some(ProgressSnapshot {
            key,
            user,
            level,
            session,
        }))
    }

    /// Remove every record of the current player. Returns how many went.
    pub fn reset_all(&mut self) -> Result<Option<usize>> {
        let Some(user) = self.user.as_ref() else {
            return Ok(None);
        };
        let removed = self.backend.kv_delete_prefix(&StoreKey::user_prefix(user))?;
        tracing::info!(%user, removed, "progress reset");
        Ok(Some(removed))
    }
}
