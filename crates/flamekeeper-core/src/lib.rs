//! # Flamekeeper Core Library
//!
//! Core logic behind the flame-watching game: a resumable countdown, a
//! windowed sampler that drives the flame, the flame score, and per-player
//! progress persistence. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven countdown state machine plus a tokio driver
//!   that supports pause, resume, force-end and teardown
//! - **Flame**: window sampling over a numeric series, the on/off scoring
//!   pattern, and a driver gated by an external enabled flag
//! - **Series**: loading the numeric series from a JSON file or the HTTP API
//! - **Storage**: typed progress records over a key-value backend (memory or
//!   SQLite), the completed-session log, and TOML configuration
//!
//! ## Key Components
//!
//! - [`Countdown`]: countdown state machine
//! - [`FlameSampler`]: cursor over the series, one window per step
//! - [`calculate_flame`]: score of a played session
//! - [`PlayStore`]: per-player progress
//! - [`Config`]: application configuration

pub mod error;
pub mod events;
pub mod flame;
pub mod series;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use flame::{calculate_flame, spawn_flame, FlamePattern, FlameSampler, WindowSize};
pub use series::{ApiClient, NumericSeries, SeriesProvider};
pub use session::{SessionKey, UserId};
pub use storage::{Config, Database, PlayStore, SharedStore, StoreCountdown, StoreCursor};
pub use timer::{spawn_countdown, Countdown, CountdownHooks, TimerMode, TimerState};
