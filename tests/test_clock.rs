//! Virtual-time determinism of the test clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tickbus::{Clock, ClockError, HandleError, TestClock, Tick, TickHandlerRef, TickReason};

fn counting_handler(calls: &Arc<AtomicU64>) -> TickHandlerRef {
    let calls = Arc::clone(calls);
    Arc::new(move |_tick: Tick| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, HandleError>(())
        }
    })
}

#[tokio::test]
async fn advance_and_flush_are_deterministic() {
    let clock = TestClock::new(100).expect("valid");
    let calls = Arc::new(AtomicU64::new(0));
    clock.start(counting_handler(&calls)).await.expect("start");

    clock.advance_by(250).await.expect("advance");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(clock.now(), 200);

    clock.advance_by(60).await.expect("advance");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(clock.now(), 300);

    clock.flush().await.expect("flush");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(clock.now(), 310);
}

#[tokio::test]
async fn handler_calls_track_total_elapsed_time() {
    let clock = TestClock::new(100).expect("valid");
    let calls = Arc::new(AtomicU64::new(0));
    clock.start(counting_handler(&calls)).await.expect("start");

    let slices = [30u64, 70, 250, 49, 1];
    for ms in slices {
        clock.advance_by(ms).await.expect("advance");
    }

    let total: u64 = slices.iter().sum();
    let expected_calls = total / 100;
    assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
    assert_eq!(clock.now(), expected_calls * 100);
    assert_eq!(clock.pending_ticks(), 0);
    assert_eq!(clock.seq(), expected_calls);
}

#[tokio::test]
async fn ticks_carry_manual_reason_and_virtual_timestamps() {
    let clock = TestClock::new(50).expect("valid");
    let seen: Arc<std::sync::Mutex<Vec<Tick>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        clock
            .start(Arc::new(move |tick: Tick| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push(tick);
                    Ok::<_, HandleError>(())
                }
            }))
            .await
            .expect("start");
    }

    clock.tick(2).await.expect("tick");
    clock.advance_by(120).await.expect("advance");

    let ticks = seen.lock().unwrap().clone();
    assert_eq!(ticks.len(), 4);
    for (index, tick) in ticks.iter().enumerate() {
        assert_eq!(tick.seq, index as u64);
        assert_eq!(tick.reason, TickReason::Manual);
        assert_eq!(tick.drift, None);
        assert_eq!(tick.ts, (index as u64 + 1) * 50);
    }
    // residue: 120 = 2*50 + 20
    assert_eq!(clock.pending_ticks(), 0);
    clock.flush().await.expect("flush");
    assert_eq!(clock.now(), 220);
}

#[tokio::test]
async fn reset_restores_the_initial_state() {
    let clock = TestClock::new(100).expect("valid");
    let calls = Arc::new(AtomicU64::new(0));
    clock.start(counting_handler(&calls)).await.expect("start");

    clock.advance_by(570).await.expect("advance");
    assert_eq!(clock.now(), 500);

    clock.reset();
    assert_eq!(clock.now(), 0);
    assert_eq!(clock.seq(), 0);
    assert_eq!(clock.pending_ticks(), 0);
    assert_eq!(clock.stats().tick_count, 0);

    // still running; determinism holds again from zero
    clock.advance_by(250).await.expect("advance");
    assert_eq!(clock.now(), 200);
    assert_eq!(clock.seq(), 2);
}

#[tokio::test]
async fn lifecycle_errors() {
    let clock = TestClock::new(100).expect("valid");
    let calls = Arc::new(AtomicU64::new(0));

    assert!(matches!(clock.tick(1).await, Err(ClockError::NotRunning)));

    clock.start(counting_handler(&calls)).await.expect("start");
    let again = clock.start(counting_handler(&calls)).await;
    assert!(matches!(again, Err(ClockError::AlreadyRunning)));

    clock.stop().await;
    clock.stop().await;
    assert!(matches!(clock.flush().await, Err(ClockError::NotRunning)));

    assert!(matches!(TestClock::new(0), Err(ClockError::InvalidInterval)));
}
