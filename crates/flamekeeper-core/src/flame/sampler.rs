//! Windowed sampling of the control-value series.
//!
//! The series is consumed in fixed-size, non-overlapping windows; each window
//! collapses to its arithmetic mean, which becomes the flame intensity for one
//! tick. Once the cursor reaches the end of the series sampling is over until
//! the cursor or the series is replaced.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::series::NumericSeries;

/// Number of series elements averaged per tick. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct WindowSize(NonZeroUsize);

impl WindowSize {
    pub fn new(size: usize) -> Result<Self, ValidationError> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "window_size".into(),
                value: 0,
                min: 1,
            })
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for WindowSize {
    type Error = ValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WindowSize> for usize {
    fn from(w: WindowSize) -> Self {
        w.get()
    }
}

/// Take one window starting at `cursor`.
///
/// Returns the cursor after the window and the window mean, or the unchanged
/// cursor and `None` once the series is exhausted (or empty).
pub fn advance(series: &[f64], window: WindowSize, cursor: usize) -> (usize, Option<f64>) {
    if cursor >= series.len() {
        return (cursor, None);
    }
    let end = cursor.saturating_add(window.get()).min(series.len());
    let slice = &series[cursor..end];
    let mean = slice.iter().sum::<f64>() / slice.len() as f64;
    (end, Some(mean))
}

/// One emitted window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub start: usize,
    pub end: usize,
    pub intensity: f64,
}

/// Stateful walker over a series: owns the cursor and the enabled gate.
#[derive(Debug, Clone)]
pub struct FlameSampler {
    series: NumericSeries,
    window: WindowSize,
    cursor: usize,
    enabled: bool,
}

impl FlameSampler {
    /// Starts disabled with the cursor at zero.
    pub fn new(series: NumericSeries, window: WindowSize) -> Self {
        Self {
            series,
            window,
            cursor: 0,
            enabled: false,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window(&self) -> WindowSize {
        self.window
    }

    pub fn series(&self) -> &NumericSeries {
        &self.series
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.series.len()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Move the cursor, clamped to the series length.
    pub fn seek(&mut self, cursor: usize) {
        if cursor > self.series.len() {
            tracing::warn!(
                cursor,
                len = self.series.len(),
                "restored cursor past end of series, clamping"
            );
        }
        self.cursor = cursor.min(self.series.len());
    }

    /// Swap in a new series and start over from its beginning.
    pub fn replace_series(&mut self, series: NumericSeries) {
        self.series = series;
        self.cursor = 0;
    }

    /// Advance one window if enabled. `None` when disabled or exhausted.
    pub fn step(&mut self) -> Option<Sample> {
        if !self.enabled {
            return None;
        }
        let start = self.cursor;
        let (end, mean) = advance(self.series.as_slice(), self.window, start);
        self.cursor = end;
        let intensity = mean?;
        tracing::debug!(start, end, intensity, "flame window sampled");
        Some(Sample {
            start,
            end,
            intensity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(n: usize) -> WindowSize {
        WindowSize::new(n).unwrap()
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(WindowSize::new(0).is_err());
        assert!(serde_json::from_str::<WindowSize>("0").is_err());
        assert_eq!(serde_json::from_str::<WindowSize>("3").unwrap().get(), 3);
    }

    #[test]
    fn advance_on_empty_series_is_terminal() {
        assert_eq!(advance(&[], w(3), 0), (0, None));
    }

    #[test]
    fn advance_takes_partial_last_window() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(advance(&series, w(2), 0), (2, Some(1.5)));
        assert_eq!(advance(&series, w(2), 2), (4, Some(3.5)));
        assert_eq!(advance(&series, w(2), 4), (5, Some(5.0)));
        assert_eq!(advance(&series, w(2), 5), (5, None));
    }

    #[test]
    fn advance_past_end_keeps_cursor() {
        assert_eq!(advance(&[1.0], w(1), 7), (7, None));
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let series = [2.0, 4.0];
        assert_eq!(advance(&series, w(usize::MAX), 1), (2, Some(4.0)));
    }

    #[test]
    fn disabled_sampler_does_not_move() {
        let mut sampler = FlameSampler::new(NumericSeries::new(vec![1.0, 2.0]), w(1));
        assert_eq!(sampler.step(), None);
        assert_eq!(sampler.cursor(), 0);

        sampler.set_enabled(true);
        let sample = sampler.step().unwrap();
        assert_eq!((sample.start, sample.end, sample.intensity), (0, 1, 1.0));

        sampler.set_enabled(false);
        assert_eq!(sampler.step(), None);
        assert_eq!(sampler.cursor(), 1);
    }

    #[test]
    fn seek_clamps_and_replace_resets() {
        let mut sampler = FlameSampler::new(NumericSeries::new(vec![1.0, 2.0, 3.0]), w(2));
        sampler.seek(10);
        assert_eq!(sampler.cursor(), 3);
        assert!(sampler.is_exhausted());

        sampler.replace_series(NumericSeries::new(vec![9.0]));
        assert_eq!(sampler.cursor(), 0);
        assert!(!sampler.is_exhausted());
    }
}
