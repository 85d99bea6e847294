mod config;
pub mod database;
pub mod hooks;
pub mod play_store;

pub use config::{ApiConfig, Config, FlameConfig, TimerConfig};
pub use database::{CompletedSession, Database, SharedDatabase, Stats};
pub use hooks::{StoreCountdown, StoreCursor};
pub use play_store::{
    LevelProgress, PlayStore, ProgressSnapshot, SessionProgress, SharedStore, StoreKey,
    UserProgress,
};

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/flamekeeper[-dev]/` based on FLAMEKEEPER_ENV.
///
/// Set FLAMEKEEPER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FLAMEKEEPER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("flamekeeper-dev")
    } else {
        base_dir.join("flamekeeper")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Flat string key-value storage underneath [`PlayStore`].
pub trait KvBackend: Send {
    fn kv_get(&self, key: &str) -> Result<Option<String>>;

    fn kv_set(&mut self, key: &str, value: &str) -> Result<()>;

    fn kv_delete(&mut self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`. Returns how many were removed.
    fn kv_delete_prefix(&mut self, prefix: &str) -> Result<usize>;
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    data: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvBackend for MemoryBackend {
    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn kv_set(&mut self, key: &str, value: &str) -> Result<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_delete(&mut self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn kv_delete_prefix(&mut self, prefix: &str) -> Result<usize> {
        let before = self.data.len();
        self.data.retain(|k, _| !k.starts_with(prefix));
        Ok(before - self.data.len())
    }
}
