//! Integration tests for the ExecutionBridge
//!
//! These tests verify that the bridge:
//! - Does not return before the UI-thread body has fully completed
//! - Runs re-entrant submissions from the UI thread in place without deadlocking
//! - Re-raises body failures with the original error as the cause
//! - Preserves submission order for a single calling thread

use guirobot::RobotError;
use guirobot::ui::{ExecutionBridge, UiQuery, UiScheduler, UiTask, UiThread, query, task};
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Harness {
    bridge: ExecutionBridge,
    ui: UiThread,
    _rt: tokio::runtime::Runtime,
}

impl Harness {
    fn new() -> Self {
        guirobot::logging::init_test_logging();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let ui = UiThread::spawn("bridge-test-ui").unwrap();
        let bridge = ExecutionBridge::new(
            Arc::new(ui.clone()),
            rt.handle().clone(),
            Duration::from_secs(5),
        );
        Self {
            bridge,
            ui,
            _rt: rt,
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.ui.shutdown();
    }
}

#[test]
fn test_execute_waits_for_body_to_finish() {
    let h = Harness::new();
    let finished = Arc::new(AtomicBool::new(false));

    let flag = finished.clone();
    h.bridge
        .execute(task(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

    assert!(
        finished.load(Ordering::SeqCst),
        "execute returned before the UI-thread body completed"
    );
}

#[test]
fn test_query_observes_post_sleep_state() {
    let h = Harness::new();
    let value = h
        .bridge
        .query(query(|| {
            let mut v = 1;
            std::thread::sleep(Duration::from_millis(30));
            v += 1;
            Ok(v)
        }))
        .unwrap();
    assert_eq!(value, 2);
}

#[test]
fn test_reentrant_submission_does_not_deadlock() {
    let h = Harness::new();
    let inner = h.bridge.clone();
    let ui_handle = h.ui.clone();

    let (nested_on_ui, nested_value) = h
        .bridge
        .query(query(move || {
            let on_ui = inner.query(query({
                let ui_handle = ui_handle.clone();
                move || Ok(ui_handle.is_ui_thread())
            }))?;
            let value = inner.query(query(|| Ok(21)))? * 2;
            inner.execute(task(|| Ok(())))?;
            Ok((on_ui, value))
        }))
        .unwrap();

    assert!(nested_on_ui);
    assert_eq!(nested_value, 42);
}

#[derive(Debug, thiserror::Error)]
#[error("marker error")]
struct MarkerError(Arc<()>);

#[test]
fn test_failure_preserves_original_cause() {
    let h = Harness::new();
    let marker = Arc::new(());

    let thrown = marker.clone();
    let err = h
        .bridge
        .execute(task(move || Err(MarkerError(thrown).into())))
        .unwrap_err();

    match err {
        RobotError::UnexpectedExecution { source } => {
            let original = source
                .downcast_ref::<MarkerError>()
                .expect("cause should be the original error");
            assert!(Arc::ptr_eq(&original.0, &marker));
        }
        other => panic!("Expected UnexpectedExecution, got: {:?}", other),
    }
}

#[test]
fn test_panic_in_body_is_reported_and_ui_thread_survives() {
    let h = Harness::new();
    let err = h
        .bridge
        .execute(task(|| panic!("widget exploded")))
        .unwrap_err();
    assert!(matches!(err, RobotError::UnexpectedExecution { .. }));
    assert!(err.to_string().contains("widget exploded"));

    assert_eq!(h.bridge.query(query(|| Ok("alive"))).unwrap(), "alive");
}

#[test]
fn test_three_tasks_execute_in_submission_order() {
    let h = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 1..=3 {
        let log = log.clone();
        h.bridge
            .execute(task(move || {
                log.lock().unwrap().push(i);
                Ok(())
            }))
            .unwrap();
    }

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_submitted_without_waiting_still_ordered() {
    let h = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let completions: Vec<_> = (1..=5)
        .map(|i| {
            let log = log.clone();
            h.bridge
                .submit(query(move || {
                    log.lock().unwrap().push(i);
                    Ok(i)
                }))
                .unwrap()
        })
        .collect();

    for (i, completion) in completions.into_iter().enumerate() {
        let value = completion
            .wait_blocking(h.bridge.runtime(), "ordered query", Duration::from_secs(5))
            .unwrap();
        assert_eq!(value, i + 1);
    }
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_concurrent_callers_each_see_atomic_bodies() {
    let h = Harness::new();
    let counter = Arc::new(Mutex::new(0u32));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bridge = h.bridge.clone();
            let counter = counter.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let counter = counter.clone();
                    bridge
                        .execute(task(move || {
                            // Read-modify-write with a gap; only safe because bodies never interleave
                            let current = *counter.lock().unwrap();
                            std::thread::yield_now();
                            *counter.lock().unwrap() = current + 1;
                            Ok(())
                        }))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*counter.lock().unwrap(), 100);
}

struct CountChildren(Arc<Mutex<Vec<u32>>>);

impl UiQuery for CountChildren {
    type Output = usize;

    fn run(self) -> anyhow::Result<usize> {
        Ok(self.0.lock().unwrap().len())
    }
}

struct Append(Arc<Mutex<Vec<u32>>>, u32);

impl UiTask for Append {
    fn run(self) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(self.1);
        Ok(())
    }
}

#[test]
fn test_struct_tasks_and_queries() {
    let h = Harness::new();
    let items = Arc::new(Mutex::new(Vec::new()));

    h.bridge.execute(Append(items.clone(), 10)).unwrap();
    h.bridge.execute(Append(items.clone(), 20)).unwrap();

    assert_eq!(h.bridge.query(CountChildren(items)).unwrap(), 2);
}

#[test]
fn test_async_variants() {
    let h = Harness::new();
    let bridge = h.bridge.clone();

    let value = h._rt.block_on(async move {
        bridge.execute_async(task(|| Ok(()))).await?;
        bridge.query_async(query(|| Ok(5))).await
    });
    assert_eq!(value.unwrap(), 5);
}

#[test]
fn test_shutdown_makes_bridge_unavailable() {
    let h = Harness::new();
    h.ui.shutdown();

    let err = h.bridge.query(query(|| Ok(1))).unwrap_err();
    assert!(matches!(err, RobotError::UiThreadUnavailable));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_single_caller_order_is_preserved(count in 1usize..40) {
        let h = Harness::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..count {
            let log = log.clone();
            h.bridge
                .execute(task(move || {
                    log.lock().unwrap().push(i);
                    Ok(())
                }))
                .unwrap();
        }

        let expected: Vec<usize> = (0..count).collect();
        prop_assert_eq!(log.lock().unwrap().clone(), expected);
    }
}
