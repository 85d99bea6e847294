use clap::{Subcommand, ValueEnum};
use flamekeeper_core::PlayStore;

use super::{print_json, CmdResult, PlayerArg};

#[derive(Clone, Copy, ValueEnum)]
pub enum Modal {
    /// Shown after the last session of a level
    Last,
    /// Shown between sessions
    Session,
}

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Print everything stored for the player's current position
    Show {
        #[command(flatten)]
        player: PlayerArg,
    },
    /// Jump to a level
    SetLevel {
        #[command(flatten)]
        player: PlayerArg,
        level: u32,
    },
    /// Advance to the next level
    NextLevel {
        #[command(flatten)]
        player: PlayerArg,
    },
    /// Jump to a session within the current level
    SetSession {
        #[command(flatten)]
        player: PlayerArg,
        session: u32,
    },
    /// Advance to the next session; clears the selected option and session timer
    NextSession {
        #[command(flatten)]
        player: PlayerArg,
    },
    /// Set or clear the current section
    Section {
        #[command(flatten)]
        player: PlayerArg,
        /// Omit to clear
        name: Option<String>,
    },
    /// Set or clear the selected option of the current level
    Select {
        #[command(flatten)]
        player: PlayerArg,
        /// Omit to clear
        option: Option<String>,
    },
    /// Mark a modal as shown or not
    Modal {
        #[command(flatten)]
        player: PlayerArg,
        #[arg(value_enum)]
        which: Modal,
        #[arg(action = clap::ArgAction::Set)]
        shown: bool,
    },
    /// Record the completion time of the current level
    CompleteTime {
        #[command(flatten)]
        player: PlayerArg,
        secs: u64,
    },
    /// Delete all progress of the player
    Reset {
        #[command(flatten)]
        player: PlayerArg,
    },
}

pub fn run(action: ProgressAction) -> CmdResult {
    match action {
        ProgressAction::Show { player } => show(&player.store()?),
        ProgressAction::SetLevel { player, level } => {
            let mut store = player.store()?;
            store.set_level(level)?;
            show(&store)
        }
        ProgressAction::NextLevel { player } => {
            let mut store = player.store()?;
            store.increment_level()?;
            show(&store)
        }
        ProgressAction::SetSession { player, session } => {
            let mut store = player.store()?;
            store.set_session(session)?;
            show(&store)
        }
        ProgressAction::NextSession { player } => {
            let mut store = player.store()?;
            store.increment_session()?;
            show(&store)
        }
        ProgressAction::Section { player, name } => {
            let mut store = player.store()?;
            match name {
                Some(name) => store.set_section(name)?,
                None => store.clear_section()?,
            };
            show(&store)
        }
        ProgressAction::Select { player, option } => {
            let mut store = player.store()?;
            match option {
                Some(option) => store.set_selected_option(option)?,
                None => store.clear_selected_option()?,
            };
            show(&store)
        }
        ProgressAction::Modal {
            player,
            which,
            shown,
        } => {
            let mut store = player.store()?;
            match which {
                Modal::Last => store.set_last_modal(shown)?,
                Modal::Session => store.set_session_modal(shown)?,
            };
            show(&store)
        }
        ProgressAction::CompleteTime { player, secs } => {
            let mut store = player.store()?;
            store.set_complete_time(secs)?;
            show(&store)
        }
        ProgressAction::Reset { player } => {
            let mut store = player.store()?;
            let removed = store.reset_all()?.unwrap_or(0);
            print_json(&serde_json::json!({ "removed": removed }))
        }
    }
}

fn show(store: &PlayStore) -> CmdResult {
    print_json(&store.snapshot()?)
}
