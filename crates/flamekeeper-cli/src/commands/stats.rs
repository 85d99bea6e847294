use clap::Subcommand;
use flamekeeper_core::storage::Database;

use super::{print_json, CmdResult, PlayerArg};

#[derive(Subcommand)]
pub enum StatsAction {
    /// All-time totals
    All {
        #[command(flatten)]
        player: PlayerArg,
    },
    /// Most recent completed sessions
    Recent {
        #[command(flatten)]
        player: PlayerArg,
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> CmdResult {
    let db = Database::open()?;

    match action {
        StatsAction::All { player } => {
            let stats = db.stats(&player.id()?)?;
            print_json(&stats)
        }
        StatsAction::Recent { player, limit } => {
            let sessions = db.recent_sessions(&player.id()?, limit)?;
            print_json(&sessions)
        }
    }
}
