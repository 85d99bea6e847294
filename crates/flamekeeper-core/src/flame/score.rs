//! Point score from alternating flame-on / flame-off windows.
//!
//! The series is read as a repeating pattern of `on` elements followed by
//! `off` elements. The window matching the current point in the session is
//! located from the remaining time, and its on-sum minus its off-sum is the
//! score.

use serde::{Deserialize, Serialize};

/// Score for the window that `elapsed` falls into.
///
/// Durations are floored to index lengths; slices are clamped to the series,
/// so windows beyond the data contribute nothing. Returns `0.0` when the
/// window cannot be located: `elapsed > total`, a non-positive period, or a
/// non-finite input.
pub fn calculate_flame(
    series: &[f64],
    on_duration: f64,
    off_duration: f64,
    elapsed: f64,
    total: f64,
) -> f64 {
    let inputs = [on_duration, off_duration, elapsed, total];
    if inputs.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }
    let period = on_duration + off_duration;
    let remaining = total - elapsed;
    if period <= 0.0 || remaining < 0.0 {
        return 0.0;
    }

    let on_len = index_len(on_duration);
    let off_len = index_len(off_duration);
    let session_index = (remaining / period).floor() as usize;
    let start = session_index.saturating_mul(on_len.saturating_add(off_len));

    let on_sum: f64 = clamped(series, start, on_len).iter().sum();
    let off_sum: f64 = clamped(series, start.saturating_add(on_len), off_len)
        .iter()
        .sum();
    on_sum - off_sum
}

fn index_len(duration: f64) -> usize {
    duration.floor().max(0.0) as usize
}

fn clamped(series: &[f64], start: usize, len: usize) -> &[f64] {
    let start = start.min(series.len());
    let end = start.saturating_add(len).min(series.len());
    &series[start..end]
}

/// On/off durations of the flame pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlamePattern {
    pub on_duration: f64,
    pub off_duration: f64,
}

impl FlamePattern {
    pub fn new(on_duration: f64, off_duration: f64) -> Self {
        Self {
            on_duration,
            off_duration,
        }
    }

    pub fn score(&self, series: &[f64], elapsed: f64, total: f64) -> f64 {
        calculate_flame(series, self.on_duration, self.off_duration, elapsed, total)
    }
}
