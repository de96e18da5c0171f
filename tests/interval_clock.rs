//! Interval clock scheduling behavior under the three back-pressure
//! policies. Timing assertions use generous bounds; the handlers that must
//! stall the whole runtime use `std::thread::sleep` on the test's
//! current-thread runtime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tickbus::{
    BackpressurePolicy, Clock, HandleError, IntervalClock, IntervalConfig, Tick, TickHandlerRef,
    TickReason,
};

type Recorded = Arc<Mutex<Vec<Tick>>>;

fn recording_handler(ticks: &Recorded) -> TickHandlerRef {
    let ticks = Arc::clone(ticks);
    Arc::new(move |tick: Tick| {
        let ticks = Arc::clone(&ticks);
        async move {
            ticks.lock().unwrap().push(tick);
            Ok::<_, HandleError>(())
        }
    })
}

fn seqs(ticks: &Recorded) -> Vec<u64> {
    ticks.lock().unwrap().iter().map(|t| t.seq).collect()
}

fn count_reason(ticks: &Recorded, reason: TickReason) -> usize {
    ticks
        .lock()
        .unwrap()
        .iter()
        .filter(|t| t.reason == reason)
        .count()
}

#[tokio::test]
async fn block_policy_never_drops_or_overlaps() {
    let clock = IntervalClock::new(IntervalConfig::every_millis(50)).expect("valid");

    let ticks: Recorded = Arc::new(Mutex::new(Vec::new()));
    let in_flight = Arc::new(AtomicU64::new(0));
    let max_in_flight = Arc::new(AtomicU64::new(0));

    let handler: TickHandlerRef = {
        let ticks = Arc::clone(&ticks);
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        Arc::new(move |tick: Tick| {
            let ticks = Arc::clone(&ticks);
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(120)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                ticks.lock().unwrap().push(tick);
                Ok::<_, HandleError>(())
            }
        })
    };

    clock.start(handler).await.expect("start");
    tokio::time::sleep(Duration::from_millis(500)).await;
    clock.stop().await;

    let recorded = ticks.lock().unwrap().clone();
    assert!(
        (2..=4).contains(&recorded.len()),
        "expected 2..=4 completed invocations, got {}",
        recorded.len()
    );
    for tick in &recorded {
        assert_eq!(tick.reason, TickReason::Interval);
        assert_eq!(tick.drift, Some(0));
    }
    assert_eq!(clock.stats().dropped_ticks, 0);
    // a slow handler stretches the period instead of overlapping
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn drop_policy_skips_cycles_while_busy() {
    let mut cfg = IntervalConfig::every_millis(30);
    cfg.backpressure = BackpressurePolicy::Drop;
    let clock = IntervalClock::new(cfg).expect("valid");

    let ticks: Recorded = Arc::new(Mutex::new(Vec::new()));
    let slow_once = Arc::new(AtomicBool::new(true));

    let handler: TickHandlerRef = {
        let ticks = Arc::clone(&ticks);
        let slow_once = Arc::clone(&slow_once);
        Arc::new(move |tick: Tick| {
            let ticks = Arc::clone(&ticks);
            let slow_once = Arc::clone(&slow_once);
            async move {
                if slow_once.swap(false, Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                ticks.lock().unwrap().push(tick);
                Ok::<_, HandleError>(())
            }
        })
    };

    clock.start(handler).await.expect("start");
    tokio::time::sleep(Duration::from_millis(260)).await;
    clock.stop().await;

    let stats = clock.stats();
    assert!(
        stats.dropped_ticks >= 1,
        "cycles landing on a busy handler must be dropped, got {stats:?}"
    );
    // the timeline kept pace, so the freed-up handler had nothing to catch
    // up on
    assert!(count_reason(&ticks, TickReason::Interval) >= 2);

    let recorded = seqs(&ticks);
    let mut sorted = recorded.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..recorded.len() as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn drop_policy_catches_up_after_a_stall() {
    let mut cfg = IntervalConfig::every_millis(30);
    cfg.backpressure = BackpressurePolicy::Drop;
    cfg.max_catch_up_ticks = 3;
    let clock = IntervalClock::new(cfg).expect("valid");

    let ticks: Recorded = Arc::new(Mutex::new(Vec::new()));
    let stall_once = Arc::new(AtomicBool::new(true));

    let handler: TickHandlerRef = {
        let ticks = Arc::clone(&ticks);
        let stall_once = Arc::clone(&stall_once);
        Arc::new(move |tick: Tick| {
            let ticks = Arc::clone(&ticks);
            let stall_once = Arc::clone(&stall_once);
            async move {
                if stall_once.swap(false, Ordering::SeqCst) {
                    // stall the whole runtime: timers fire late, exactly
                    // like a blocked event loop
                    std::thread::sleep(Duration::from_millis(160));
                }
                ticks.lock().unwrap().push(tick);
                Ok::<_, HandleError>(())
            }
        })
    };

    clock.start(handler).await.expect("start");
    tokio::time::sleep(Duration::from_millis(400)).await;
    clock.stop().await;

    assert!(
        count_reason(&ticks, TickReason::Catchup) >= 1,
        "lost time must be recovered with catch-up ticks"
    );
    let stats = clock.stats();
    assert!(
        stats.dropped_ticks >= 1,
        "intervals beyond the catch-up budget must be clamped, got {stats:?}"
    );

    let recorded = seqs(&ticks);
    let mut sorted = recorded.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..recorded.len() as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn adaptive_policy_drains_backlog_sequentially() {
    let mut cfg = IntervalConfig::every_millis(30);
    cfg.backpressure = BackpressurePolicy::Adaptive;
    cfg.max_catch_up_ticks = 3;
    let clock = IntervalClock::new(cfg).expect("valid");

    let ticks: Recorded = Arc::new(Mutex::new(Vec::new()));
    let slow_once = Arc::new(AtomicBool::new(true));
    let in_flight = Arc::new(AtomicU64::new(0));
    let max_in_flight = Arc::new(AtomicU64::new(0));

    let handler: TickHandlerRef = {
        let ticks = Arc::clone(&ticks);
        let slow_once = Arc::clone(&slow_once);
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        Arc::new(move |tick: Tick| {
            let ticks = Arc::clone(&ticks);
            let slow_once = Arc::clone(&slow_once);
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(current, Ordering::SeqCst);
                if slow_once.swap(false, Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                ticks.lock().unwrap().push(tick);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, HandleError>(())
            }
        })
    };

    clock.start(handler).await.expect("start");
    tokio::time::sleep(Duration::from_millis(500)).await;
    clock.stop().await;

    assert!(count_reason(&ticks, TickReason::Catchup) >= 2);
    assert!(count_reason(&ticks, TickReason::Interval) >= 2);
    assert!(
        clock.stats().dropped_ticks >= 1,
        "whole intervals beyond the burst budget must be clamped"
    );
    // catch-up bursts are strictly sequential
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    // inline fires assign and deliver seq in order
    let recorded = seqs(&ticks);
    assert_eq!(recorded, (0..recorded.len() as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn drift_warning_fires_under_sustained_lag() {
    let warnings = Arc::new(AtomicU64::new(0));
    let ticks: Recorded = Arc::new(Mutex::new(Vec::new()));

    let mut cfg = IntervalConfig::every_millis(100);
    cfg.backpressure = BackpressurePolicy::Drop;
    // enough budget that the whole stall is recovered with catch-up ticks,
    // every one of them inheriting the high drift of the late fire
    cfg.max_catch_up_ticks = 8;
    {
        let warnings = Arc::clone(&warnings);
        cfg.on_drift_warning = Some(Arc::new(move |_drift| {
            warnings.fetch_add(1, Ordering::SeqCst);
        }));
    }
    let clock = IntervalClock::new(cfg).expect("valid");

    clock.start(recording_handler(&ticks)).await.expect("start");
    // stall the runtime across several periods: the first fire lands ~480ms
    // late, and the interval tick plus at least four catch-ups all carry
    // that drift
    tokio::spawn(async {
        std::thread::sleep(Duration::from_millis(580));
    });
    tokio::time::sleep(Duration::from_millis(750)).await;
    clock.stop().await;

    assert!(count_reason(&ticks, TickReason::Catchup) >= 4);
    assert!(
        warnings.load(Ordering::SeqCst) >= 1,
        "five consecutive high-drift ticks must trip the warning hook"
    );
}

#[tokio::test]
async fn block_policy_reports_zero_drift_and_never_warns() {
    let warnings = Arc::new(AtomicU64::new(0));

    let mut cfg = IntervalConfig::every_millis(20);
    {
        let warnings = Arc::clone(&warnings);
        cfg.on_drift_warning = Some(Arc::new(move |_drift| {
            warnings.fetch_add(1, Ordering::SeqCst);
        }));
    }
    let clock = IntervalClock::new(cfg).expect("valid");

    clock
        .start(Arc::new(|_tick: Tick| async {
            std::thread::sleep(Duration::from_millis(60));
            Ok::<_, HandleError>(())
        }))
        .await
        .expect("start");
    tokio::time::sleep(Duration::from_millis(400)).await;
    clock.stop().await;

    assert_eq!(clock.stats().avg_drift_ms, 0.0);
    assert_eq!(warnings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_errors_are_counted_and_reported() {
    let reported = Arc::new(AtomicU64::new(0));

    let mut cfg = IntervalConfig::every_millis(20);
    {
        let reported = Arc::clone(&reported);
        cfg.on_error = Some(Arc::new(move |_err| {
            reported.fetch_add(1, Ordering::SeqCst);
        }));
    }
    let clock = IntervalClock::new(cfg).expect("valid");

    clock
        .start(Arc::new(|_tick: Tick| async {
            Err(HandleError::fail("boom"))
        }))
        .await
        .expect("start");
    tokio::time::sleep(Duration::from_millis(150)).await;
    clock.stop().await;

    let stats = clock.stats();
    assert!(stats.errors >= 2);
    assert_eq!(stats.errors, reported.load(Ordering::SeqCst));
    // errors never stop the schedule
    assert_eq!(stats.tick_count, stats.errors);
}

#[tokio::test]
async fn stop_freezes_the_epoch_and_restart_zeroes_it() {
    let clock = IntervalClock::new(IntervalConfig::every_millis(25)).expect("valid");
    let ticks: Recorded = Arc::new(Mutex::new(Vec::new()));

    clock.start(recording_handler(&ticks)).await.expect("start");
    tokio::time::sleep(Duration::from_millis(90)).await;
    clock.stop().await;
    assert!(!clock.is_running());

    let frozen = ticks.lock().unwrap().len();
    assert!(frozen >= 2);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(ticks.lock().unwrap().len(), frozen, "no ticks after stop");

    // a new epoch starts from scratch
    clock.start(recording_handler(&ticks)).await.expect("restart");
    assert_eq!(clock.seq(), 0);
    assert_eq!(clock.stats().tick_count, 0);
    tokio::time::sleep(Duration::from_millis(90)).await;
    clock.stop().await;

    let after_restart: Vec<u64> = ticks.lock().unwrap()[frozen..]
        .iter()
        .map(|t| t.seq)
        .collect();
    assert_eq!(after_restart, (0..after_restart.len() as u64).collect::<Vec<_>>());
}
