//! Tests for Coordinator
//!
//! These tests verify:
//! - Default and namespace-scoped handles
//! - Startup failure on invalid config
//! - Error propagation (capacity exceeded) and CAS outcomes
//! - Event emission for successful mutations only
//! - Multiple named instances running side by side
//! - Concurrent callers through the coordinator
//! - Lifecycle (stop, calls after stop)

use std::sync::Arc;
use std::thread;

use countkv::{
    BackendKind, CasOutcome, Config, Coordinator, CountError, CounterEvent, CounterOp,
    DEFAULT_NAMESPACE,
};
use parking_lot::Mutex;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_coordinator(kind: BackendKind) -> Coordinator {
    let config = Config::builder().backend(kind).capacity(16).build();
    Coordinator::start(config).unwrap()
}

/// Coordinator whose events land in the returned vector
fn setup_recording_coordinator(config: Config) -> (Coordinator, Arc<Mutex<Vec<CounterEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let coordinator = Coordinator::start_with_sink(
        config,
        Arc::new(move |event: &CounterEvent| sink_events.lock().push(event.clone())),
    )
    .unwrap();
    (coordinator, events)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_default_namespace_operations() {
    for kind in [
        BackendKind::Dynamic,
        BackendKind::Balanced,
        BackendKind::WriteOptimized,
    ] {
        let coordinator = setup_coordinator(kind);
        let counters = coordinator.counters();

        assert_eq!(counters.get("k").unwrap(), None);
        assert_eq!(counters.increment("k").unwrap(), 1);
        assert_eq!(counters.increment_by("k", 4, 0).unwrap(), 5);
        assert_eq!(counters.set("k", 20).unwrap(), 20);
        assert_eq!(counters.reset("k", 3).unwrap(), 3);
        assert_eq!(counters.reset_to_zero("k").unwrap(), 0);
        assert_eq!(counters.get("k").unwrap(), Some(0));

        counters.delete("k").unwrap();
        counters.delete("k").unwrap();
        assert_eq!(counters.get("k").unwrap(), None);

        coordinator.stop().unwrap();
    }
}

#[test]
fn test_namespace_handle() {
    let coordinator = setup_coordinator(BackendKind::Dynamic);
    let counters = coordinator.counters();
    let api = counters.namespace("api");

    assert_eq!(api.name(), "api");
    api.increment("hits").unwrap();
    api.increment("hits").unwrap();
    counters.increment("hits").unwrap();

    assert_eq!(api.get("hits").unwrap(), Some(2));
    assert_eq!(counters.get("hits").unwrap(), Some(1));
    assert_eq!(api.all().unwrap().get("hits"), Some(&2));
    assert_eq!(counters.all().unwrap().get("hits"), Some(&1));

    api.clear().unwrap();
    assert!(api.all().unwrap().is_empty());
    assert_eq!(counters.get("hits").unwrap(), Some(1));
}

#[test]
fn test_delete_namespace_through_handle() {
    let coordinator = setup_coordinator(BackendKind::Balanced);
    let counters = coordinator.counters();

    counters.namespace("a").set("k", 1).unwrap();
    counters.namespace("b").set("k", 2).unwrap();

    counters.delete_namespace("a").unwrap();
    counters.delete_namespace("a").unwrap();

    assert_eq!(counters.namespace("a").get("k").unwrap(), None);
    assert_eq!(counters.namespace("b").get("k").unwrap(), Some(2));
}

#[test]
fn test_compare_and_swap_through_handle() {
    let coordinator = setup_coordinator(BackendKind::WriteOptimized);
    let counters = coordinator.counters();

    counters.set("k", 7).unwrap();
    assert_eq!(counters.compare_and_swap("k", 7, 8).unwrap(), CasOutcome::Swapped(8));
    assert_eq!(counters.compare_and_swap("k", 7, 9).unwrap(), CasOutcome::Mismatch(8));

    let ns = counters.namespace("other");
    assert_eq!(ns.compare_and_swap("k", 0, 1).unwrap(), CasOutcome::Swapped(1));
}

#[test]
fn test_capacity_exceeded_is_returned_to_caller() {
    let config = Config::builder()
        .backend(BackendKind::Balanced)
        .capacity(1)
        .build();
    let coordinator = Coordinator::start(config).unwrap();
    let counters = coordinator.counters();

    counters.increment("a").unwrap();
    let err = counters.increment("b").unwrap_err();

    assert!(matches!(err, CountError::CapacityExceeded { capacity: 1, .. }));
    // Coordinator keeps serving after a failed call
    assert_eq!(counters.increment("a").unwrap(), 2);
}

#[test]
fn test_info() {
    let coordinator = setup_coordinator(BackendKind::Balanced);
    let counters = coordinator.counters();

    counters.set("k", 1).unwrap();
    counters.namespace("x").set("k", 1).unwrap();

    let info = counters.info().unwrap();
    assert_eq!(info.kind, BackendKind::Balanced);
    assert_eq!(info.capacity, Some(16));
    assert_eq!(
        info.active_namespaces,
        vec![DEFAULT_NAMESPACE.to_string(), "x".to_string()]
    );
    assert_eq!(info.utilization, Some(2.0 / 32.0));
}

// =============================================================================
// Startup Tests
// =============================================================================

#[test]
fn test_start_fails_on_invalid_config() {
    let config = Config::builder()
        .backend(BackendKind::WriteOptimized)
        .capacity(0)
        .build();

    assert!(matches!(
        Coordinator::start(config),
        Err(CountError::Config(_))
    ));
}

#[test]
fn test_named_instances_are_independent() {
    let first = Coordinator::start(Config::builder().name("first").build()).unwrap();
    let second = Coordinator::start(Config::builder().name("second").build()).unwrap();

    first.counters().increment("k").unwrap();
    first.counters().increment("k").unwrap();
    second.counters().increment("k").unwrap();

    assert_eq!(first.name(), Some("first"));
    assert_eq!(first.counters().get("k").unwrap(), Some(2));
    assert_eq!(second.counters().get("k").unwrap(), Some(1));
}

// =============================================================================
// Event Tests
// =============================================================================

#[test]
fn test_events_for_successful_mutations() {
    let config = Config::builder().name("evt").build();
    let (coordinator, events) = setup_recording_coordinator(config);
    let counters = coordinator.counters();

    counters.increment_by("k", 2, 10).unwrap();
    counters.get("k").unwrap();
    counters.set("k", 5).unwrap();
    counters.compare_and_swap("k", 1, 2).unwrap(); // mismatch: no event
    counters.compare_and_swap("k", 5, 6).unwrap();
    counters.delete("k").unwrap();
    counters.namespace("ns").clear().unwrap();

    let ops: Vec<CounterOp> = events.lock().iter().map(|e| e.op.clone()).collect();
    assert_eq!(
        ops,
        vec![
            CounterOp::Increment { step: 2, value: 12 },
            CounterOp::Set { value: 5 },
            CounterOp::CompareAndSwap { expected: 5, value: 6 },
            CounterOp::Delete,
            CounterOp::DeleteNamespace,
        ]
    );

    let events = events.lock();
    assert!(events.iter().all(|e| e.instance.as_deref() == Some("evt")));
    assert_eq!(events[0].namespace, DEFAULT_NAMESPACE);
    assert_eq!(events[0].key.as_deref(), Some("k"));
    assert_eq!(events[4].namespace, "ns");
    assert_eq!(events[4].key, None);
}

#[test]
fn test_failed_mutation_emits_nothing() {
    let config = Config::builder()
        .backend(BackendKind::Balanced)
        .capacity(1)
        .build();
    let (coordinator, events) = setup_recording_coordinator(config);
    let counters = coordinator.counters();

    counters.increment("a").unwrap();
    assert!(counters.increment("b").is_err());

    assert_eq!(events.lock().len(), 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_callers() {
    for kind in [
        BackendKind::Dynamic,
        BackendKind::Balanced,
        BackendKind::WriteOptimized,
    ] {
        let coordinator = setup_coordinator(kind);

        let mut handles = vec![];
        for t in 0..4 {
            let counters = coordinator.counters();
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    counters.increment("shared").unwrap();
                    counters
                        .namespace(format!("t{}", t))
                        .increment_by(&format!("k{}", i % 4), 1, 0)
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let counters = coordinator.counters();
        assert_eq!(counters.get("shared").unwrap(), Some(1000), "{}", kind);
        for t in 0..4 {
            let all = counters.namespace(format!("t{}", t)).all().unwrap();
            assert_eq!(all.len(), 4);
            assert_eq!(all.values().sum::<i64>(), 250);
        }
    }
}

#[test]
fn test_concurrent_cas_through_write_optimized_backend() {
    // The emulated CAS is only safe because the coordinator serializes it
    let coordinator = setup_coordinator(BackendKind::WriteOptimized);
    coordinator.counters().set("lock", 0).unwrap();

    let handles: Vec<_> = (1..=8)
        .map(|id| {
            let counters = coordinator.counters();
            thread::spawn(move || counters.compare_and_swap("lock", 0, id).unwrap().is_swapped())
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_calls_after_stop_fail() {
    let coordinator = setup_coordinator(BackendKind::Dynamic);
    let counters = coordinator.counters();
    counters.increment("k").unwrap();

    coordinator.stop().unwrap();

    assert_eq!(counters.increment("k").unwrap_err(), CountError::Stopped);
    assert_eq!(counters.get("k").unwrap_err(), CountError::Stopped);
}

#[test]
fn test_drop_stops_coordinator() {
    let coordinator = setup_coordinator(BackendKind::Dynamic);
    let counters = coordinator.counters();

    drop(coordinator);

    assert_eq!(counters.info().unwrap_err(), CountError::Stopped);
}
