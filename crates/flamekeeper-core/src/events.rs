use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flame::FlameTransition;
use crate::timer::{TimerMode, TimerState};

/// Every state change of the timer or the flame produces an Event.
/// Drivers forward them over a channel; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        remaining_secs: u64,
        /// Seeded from persisted progress rather than the initial duration.
        from_saved: bool,
        at: DateTime<Utc>,
    },
    TimerTicked {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Repeating timer rolled over into the next session.
    TimerReseeded {
        remaining_secs: u64,
        cycle: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        /// Ended by the force-end signal instead of running out.
        forced: bool,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        mode: TimerMode,
        remaining_secs: u64,
        cycle: u32,
        at: DateTime<Utc>,
    },
    FlameToggled {
        transition: FlameTransition,
        at: DateTime<Utc>,
    },
    FlameSampled {
        start: usize,
        end: usize,
        intensity: f64,
        at: DateTime<Utc>,
    },
    FlameExhausted {
        cursor: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Remaining seconds carried by timer events.
    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Event::TimerStarted { remaining_secs, .. }
            | Event::TimerTicked { remaining_secs, .. }
            | Event::TimerReseeded { remaining_secs, .. }
            | Event::TimerPaused { remaining_secs, .. }
            | Event::TimerResumed { remaining_secs, .. }
            | Event::StateSnapshot { remaining_secs, .. } => Some(*remaining_secs),
            Event::TimerCompleted { .. } => Some(0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::TimerTicked {
            remaining_secs: 4,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerTicked");
        assert_eq!(json["remaining_secs"], 4);
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn remaining_secs_only_for_timer_events() {
        let done = Event::TimerCompleted {
            forced: true,
            at: Utc::now(),
        };
        assert_eq!(done.remaining_secs(), Some(0));
        let flame = Event::FlameExhausted {
            cursor: 3,
            at: Utc::now(),
        };
        assert_eq!(flame.remaining_secs(), None);
    }
}
