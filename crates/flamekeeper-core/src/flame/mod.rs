mod driver;
mod sampler;
mod score;
mod visual;

pub use driver::{spawn_flame, CursorStore, FlameHandle};
pub use sampler::{advance, FlameSampler, Sample, WindowSize};
pub use score::{calculate_flame, FlamePattern};
pub use visual::{FlameSink, FlameTransition, VisualState};
