//! Sweep Tests
//!
//! Tests verify:
//! - The periodic sweep clears every namespace
//! - The sweep keeps firing on its cadence
//! - Manual sweeps and sweep events
//! - No sweep without an interval

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use countkv::{BackendKind, Config, Coordinator, CounterEvent, CounterOp};
use parking_lot::Mutex;

fn sweeping(kind: BackendKind, interval_ms: u64) -> Coordinator {
    let config = Config::builder()
        .backend(kind)
        .capacity(8)
        .sweep_interval(Duration::from_millis(interval_ms))
        .build();
    Coordinator::start(config).unwrap()
}

#[test]
fn test_sweep_clears_counter() {
    for kind in [
        BackendKind::Dynamic,
        BackendKind::Balanced,
        BackendKind::WriteOptimized,
    ] {
        let coordinator = sweeping(kind, 100);
        let counters = coordinator.counters();

        assert_eq!(counters.increment("k").unwrap(), 1);
        thread::sleep(Duration::from_millis(150));

        assert_eq!(counters.get("k").unwrap(), None, "{}", kind);
    }
}

#[test]
fn test_sweep_clears_every_namespace_and_repeats() {
    let coordinator = sweeping(BackendKind::Balanced, 50);
    let counters = coordinator.counters();

    counters.namespace("a").increment("k").unwrap();
    counters.namespace("b").increment("k").unwrap();
    thread::sleep(Duration::from_millis(80));

    assert_eq!(counters.namespace("a").get("k").unwrap(), None);
    assert_eq!(counters.namespace("b").get("k").unwrap(), None);

    // Second cycle: slots were returned, counters start over
    counters.namespace("a").increment("k").unwrap();
    thread::sleep(Duration::from_millis(80));
    assert_eq!(counters.namespace("a").get("k").unwrap(), None);
}

#[test]
fn test_no_sweep_without_interval() {
    let coordinator = Coordinator::start(Config::default()).unwrap();
    let counters = coordinator.counters();

    counters.increment("k").unwrap();
    thread::sleep(Duration::from_millis(50));

    assert_eq!(counters.get("k").unwrap(), Some(1));
}

#[test]
fn test_manual_sweep_emits_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let coordinator = Coordinator::start_with_sink(
        Config::default(),
        Arc::new(move |event: &CounterEvent| sink_events.lock().push(event.clone())),
    )
    .unwrap();
    let counters = coordinator.counters();

    counters.increment("k").unwrap();
    counters.namespace("other").increment("k").unwrap();
    counters.sweep().unwrap();

    assert_eq!(counters.get("k").unwrap(), None);
    assert_eq!(counters.namespace("other").get("k").unwrap(), None);

    let events = events.lock();
    let last = events.last().unwrap();
    assert_eq!(last.op, CounterOp::Sweep { namespaces: 2 });
    assert_eq!(last.key, None);
}

#[test]
fn test_zero_interval_is_rejected() {
    let config = Config::builder().sweep_interval(Duration::ZERO).build();
    assert!(Coordinator::start(config).is_err());
}
