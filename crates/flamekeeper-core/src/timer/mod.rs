mod driver;
mod engine;

pub use driver::{spawn_countdown, CountdownHandle};
pub use engine::{Countdown, CountdownHooks, TimerMode, TimerState};
