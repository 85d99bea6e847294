use clap::Subcommand;
use flamekeeper_core::{calculate_flame, Config, FlameSampler, WindowSize};
use serde_json::json;

use super::{print_json, runtime, CmdResult, PlayerArg, SeriesSource};

#[derive(Subcommand)]
pub enum FlameAction {
    /// Walk the series window by window and print each sample
    Sample {
        #[command(flatten)]
        source: SeriesSource,
        /// Window size (defaults from config)
        #[arg(long)]
        window: Option<usize>,
        /// Start from this cursor
        #[arg(long, conflicts_with = "user")]
        cursor: Option<usize>,
        /// Resume from, and save back to, this player's stored cursor
        #[arg(long, env = "FLAMEKEEPER_USER")]
        user: Option<String>,
        /// Stop after this many windows
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Score one point in a session against the on/off pattern
    Score {
        #[command(flatten)]
        source: SeriesSource,
        /// Seconds elapsed in the session
        #[arg(long)]
        elapsed: f64,
        /// Total session length in seconds
        #[arg(long)]
        total: f64,
        /// Flame-on length (defaults from config)
        #[arg(long)]
        on: Option<f64>,
        /// Flame-off length (defaults from config)
        #[arg(long)]
        off: Option<f64>,
    },
}

pub fn run(action: FlameAction) -> CmdResult {
    let config = Config::load()?;
    match action {
        FlameAction::Sample {
            source,
            window,
            cursor,
            user,
            steps,
        } => {
            let series = runtime()?.block_on(source.load(&config))?;
            let window = match window {
                Some(size) => WindowSize::new(size)?,
                None => config.flame.window()?,
            };
            let mut store = match user {
                Some(user) => Some(PlayerArg { user }.store()?),
                None => None,
            };

            let mut sampler = FlameSampler::new(series, window);
            let start = match &store {
                Some(store) => store.cursor()?.unwrap_or(0),
                None => cursor.unwrap_or(0),
            };
            sampler.seek(start);
            sampler.set_enabled(true);

            let samples: Vec<_> = std::iter::from_fn(|| sampler.step())
                .take(steps.unwrap_or(usize::MAX))
                .collect();
            if let Some(store) = store.as_mut() {
                store.set_cursor(sampler.cursor())?;
            }
            print_json(&json!({
                "samples": samples,
                "cursor": sampler.cursor(),
                "exhausted": sampler.is_exhausted(),
            }))
        }
        FlameAction::Score {
            source,
            elapsed,
            total,
            on,
            off,
        } => {
            let series = runtime()?.block_on(source.load(&config))?;
            let on = on.unwrap_or(config.flame.on_duration);
            let off = off.unwrap_or(config.flame.off_duration);
            let score = calculate_flame(series.as_slice(), on, off, elapsed, total);
            print_json(&json!({ "score": score }))
        }
    }
}
