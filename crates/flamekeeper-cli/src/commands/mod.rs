pub mod config;
pub mod flame;
pub mod progress;
pub mod series;
pub mod stats;
pub mod timer;

use std::path::PathBuf;
use std::sync::MutexGuard;

use clap::Args;
use flamekeeper_core::series::FileSeries;
use flamekeeper_core::{
    ApiClient, Config, Database, NumericSeries, PlayStore, SeriesProvider, SharedStore, UserId,
};
use serde::Serialize;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Args)]
pub struct PlayerArg {
    /// Player id
    #[arg(long, env = "FLAMEKEEPER_USER")]
    pub user: String,
}

impl PlayerArg {
    pub fn id(&self) -> CmdResult<UserId> {
        Ok(UserId::new(&self.user)?)
    }

    /// Progress store on the default database, signed in as this player.
    pub fn store(&self) -> CmdResult<PlayStore> {
        Ok(PlayStore::new(Database::open()?).with_user(self.id()?))
    }
}

#[derive(Args)]
pub struct SeriesSource {
    /// Read the series from a JSON file instead of the API
    #[arg(long, value_name = "FILE")]
    pub series: Option<PathBuf>,
}

impl SeriesSource {
    pub async fn load(&self, config: &Config) -> CmdResult<NumericSeries> {
        let series = match &self.series {
            Some(path) => FileSeries::new(path).fetch_series().await?,
            None => ApiClient::new(&config.api)?.fetch_series().await?,
        };
        Ok(series)
    }
}

pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

pub fn lock(store: &SharedStore) -> CmdResult<MutexGuard<'_, PlayStore>> {
    store
        .lock()
        .map_err(|_| "progress store lock poisoned".into())
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One compact JSON object per line, for streamed events.
pub fn print_line<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
