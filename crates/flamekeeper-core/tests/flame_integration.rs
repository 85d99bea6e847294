//! Integration tests for the flame driver, sampler and score.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use flamekeeper_core::flame::{advance, FlameSink, FlameTransition};
use flamekeeper_core::{
    calculate_flame, spawn_flame, Event, FlameSampler, NumericSeries, PlayStore, StoreCursor,
    UserId, WindowSize,
};
use proptest::prelude::*;
use serde_json::json;
use tokio::sync::watch;

const TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Default)]
struct RecordingSink {
    intensities: Arc<Mutex<Vec<f64>>>,
    transitions: Arc<Mutex<Vec<FlameTransition>>>,
}

impl FlameSink for RecordingSink {
    fn intensity(&mut self, value: f64) {
        self.intensities.lock().unwrap().push(value);
    }

    fn transition(&mut self, transition: FlameTransition) {
        self.transitions.lock().unwrap().push(transition);
    }
}

fn sampler(values: &[f64], window: usize) -> FlameSampler {
    FlameSampler::new(
        NumericSeries::new(values.to_vec()),
        WindowSize::new(window).unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_enabled_flame_walks_whole_series() {
    let sink = RecordingSink::default();
    let (enabled_tx, enabled_rx) = watch::channel(true);
    let mut handle = spawn_flame(
        sampler(&[1.0, 3.0, 5.0, 7.0, 9.0], 2),
        sink.clone(),
        (),
        enabled_rx,
        TICK,
    );

    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        let done = matches!(event, Event::FlameExhausted { .. });
        events.push(event);
        if done {
            break;
        }
    }

    assert!(matches!(
        events[0],
        Event::FlameToggled {
            transition: FlameTransition::Ignite,
            ..
        }
    ));
    assert_eq!(*sink.intensities.lock().unwrap(), vec![2.0, 6.0, 9.0]);
    assert!(matches!(
        events.last(),
        Some(Event::FlameExhausted { cursor: 5, .. })
    ));

    drop(enabled_tx);
    let sampler = handle.join().await.unwrap();
    assert!(sampler.is_exhausted());
}

#[tokio::test(start_paused = true)]
async fn test_disabling_freezes_cursor() {
    let sink = RecordingSink::default();
    let (enabled_tx, enabled_rx) = watch::channel(true);
    let mut handle = spawn_flame(
        sampler(&[1.0; 10], 2),
        sink.clone(),
        (),
        enabled_rx,
        TICK,
    );

    assert!(matches!(
        handle.next_event().await,
        Some(Event::FlameToggled { .. })
    ));
    assert!(matches!(
        handle.next_event().await,
        Some(Event::FlameSampled { start: 0, end: 2, .. })
    ));

    enabled_tx.send(false).unwrap();
    assert!(matches!(
        handle.next_event().await,
        Some(Event::FlameToggled {
            transition: FlameTransition::Extinguish,
            ..
        })
    ));
    let idle = tokio::time::timeout(Duration::from_secs(10), handle.next_event()).await;
    assert!(idle.is_err(), "no samples while disabled");

    enabled_tx.send(true).unwrap();
    assert!(matches!(
        handle.next_event().await,
        Some(Event::FlameToggled {
            transition: FlameTransition::Ignite,
            ..
        })
    ));
    assert!(matches!(
        handle.next_event().await,
        Some(Event::FlameSampled { start: 2, end: 4, .. })
    ));

    drop(enabled_tx);
    let sampler = handle.join().await.unwrap();
    assert_eq!(sampler.cursor(), 4);
    assert_eq!(
        *sink.transitions.lock().unwrap(),
        vec![
            FlameTransition::Ignite,
            FlameTransition::Extinguish,
            FlameTransition::Ignite
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_disabled_at_start_extinguishes_without_sampling() {
    let sink = RecordingSink::default();
    let (enabled_tx, enabled_rx) = watch::channel(false);
    let mut handle = spawn_flame(sampler(&[4.0, 4.0], 1), sink.clone(), (), enabled_rx, TICK);

    assert!(matches!(
        handle.next_event().await,
        Some(Event::FlameToggled {
            transition: FlameTransition::Extinguish,
            ..
        })
    ));
    drop(enabled_tx);
    assert!(handle.next_event().await.is_none());
    assert!(sink.intensities.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cursor_survives_restart_through_store() {
    let store = PlayStore::in_memory()
        .with_user(UserId::new("player-1").unwrap())
        .into_shared();
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    let (enabled_tx, enabled_rx) = watch::channel(true);
    let cursors = StoreCursor::current(store.clone()).unwrap().unwrap();
    let mut handle = spawn_flame(
        sampler(&values, 2),
        RecordingSink::default(),
        cursors,
        enabled_rx,
        TICK,
    );
    handle.next_event().await;
    handle.next_event().await;
    handle.teardown();
    drop(enabled_tx);
    assert_eq!(store.lock().unwrap().cursor().unwrap(), Some(2));

    let sink = RecordingSink::default();
    let (enabled_tx, enabled_rx) = watch::channel(true);
    let cursors = StoreCursor::current(store.clone()).unwrap().unwrap();
    let mut handle = spawn_flame(sampler(&values, 2), sink.clone(), cursors, enabled_rx, TICK);
    handle.next_event().await;
    assert!(matches!(
        handle.next_event().await,
        Some(Event::FlameSampled { start: 2, end: 4, .. })
    ));
    drop(enabled_tx);
    assert_eq!(*sink.intensities.lock().unwrap(), vec![3.5]);
}

#[test]
fn test_score_from_loosely_typed_payload() {
    let payload = json!({ "values": ["1", 2, "3", "4", " 5 ", 6, null, "8"] });
    let series = NumericSeries::from_payload(&payload).unwrap();
    // Second window: on [5, 6], off [null -> 0, 8].
    assert_eq!(calculate_flame(series.as_slice(), 2.0, 2.0, 6.0, 10.0), 3.0);
    // First window: on [1, 2], off [3, 4].
    assert_eq!(calculate_flame(series.as_slice(), 2.0, 2.0, 8.0, 10.0), -4.0);
}

proptest! {
    #[test]
    fn prop_advance_covers_each_element_once(
        values in prop::collection::vec(-1000.0f64..1000.0, 0..64),
        window in 1usize..12,
    ) {
        let window = WindowSize::new(window).unwrap();
        let mut cursor = 0;
        let mut visited = 0;
        loop {
            let (next, mean) = advance(&values, window, cursor);
            match mean {
                Some(_) => {
                    prop_assert!(next > cursor);
                    prop_assert!(next - cursor <= window.get());
                    visited += next - cursor;
                    cursor = next;
                }
                None => {
                    prop_assert_eq!(next, cursor);
                    break;
                }
            }
        }
        prop_assert_eq!(visited, values.len());
        prop_assert_eq!(cursor, values.len());
    }

    #[test]
    fn prop_score_ignores_number_encoding(
        values in prop::collection::vec(-500i64..500, 0..40),
        on in 0u32..6,
        off in 0u32..6,
        elapsed in 0u32..60,
        total in 0u32..60,
    ) {
        let numbers = NumericSeries::from_payload(&json!(values)).unwrap();
        let strings: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let strings = NumericSeries::from_payload(&json!(strings)).unwrap();
        let (on, off, elapsed, total) = (on as f64, off as f64, elapsed as f64, total as f64);
        prop_assert_eq!(
            calculate_flame(numbers.as_slice(), on, off, elapsed, total),
            calculate_flame(strings.as_slice(), on, off, elapsed, total)
        );
    }

    #[test]
    fn prop_score_is_zero_past_the_end(
        values in prop::collection::vec(-100.0f64..100.0, 0..20),
        elapsed in 1.0f64..100.0,
    ) {
        let total = elapsed - 0.5;
        prop_assert_eq!(calculate_flame(&values, 2.0, 2.0, elapsed, total), 0.0);
    }
}
