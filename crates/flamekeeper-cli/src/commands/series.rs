use clap::Subcommand;
use flamekeeper_core::{ApiClient, Config};
use serde_json::json;

use super::{print_json, runtime, CmdResult, SeriesSource};

#[derive(Subcommand)]
pub enum SeriesAction {
    /// Fetch the control-value series
    Fetch {
        #[command(flatten)]
        source: SeriesSource,
    },
    /// Fetch the session duration from the time endpoint
    Time,
}

pub fn run(action: SeriesAction) -> CmdResult {
    let config = Config::load()?;
    let rt = runtime()?;
    match action {
        SeriesAction::Fetch { source } => {
            let series = rt.block_on(source.load(&config))?;
            print_json(&json!({ "len": series.len(), "values": series }))
        }
        SeriesAction::Time => {
            let client = ApiClient::new(&config.api)?;
            let secs = rt.block_on(client.fetch_time())?;
            print_json(&json!({ "time": secs }))
        }
    }
}
