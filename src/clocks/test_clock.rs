//! # Test clock: deterministic virtual time for exercising consumers.
//!
//! [`TestClock`] implements the full [`Clock`] contract without ever
//! touching a real timer. Time only moves when the test says so:
//!
//! - [`tick`](TestClock::tick) fires N ticks, each advancing virtual time
//!   by one interval;
//! - [`advance_by`](TestClock::advance_by) feeds elapsed milliseconds into
//!   an accumulator and fires one tick per whole interval, carrying the
//!   residue across calls;
//! - [`flush`](TestClock::flush) spends any residue as a single tick.
//!
//! Unlike the real clocks, handler errors propagate out of the driving call
//! (wrapped in [`ClockError::Handler`]) so tests can assert on them; they
//! are still counted in `errors` first.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use tickbus::{Clock, HandleError, TestClock, Tick};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tickbus::ClockError> {
//! let clock = TestClock::new(100)?;
//! let calls = Arc::new(AtomicU64::new(0));
//! let seen = Arc::clone(&calls);
//! clock
//!     .start(Arc::new(move |_tick: Tick| {
//!         let seen = Arc::clone(&seen);
//!         async move {
//!             seen.fetch_add(1, Ordering::SeqCst);
//!             Ok::<_, HandleError>(())
//!         }
//!     }))
//!     .await?;
//!
//! clock.advance_by(250).await?;
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! assert_eq!(clock.now(), 200);
//! assert_eq!(clock.pending_ticks(), 0);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;

use crate::clocks::clock::{lock, Clock, StatsCore, TickHandlerRef};
use crate::clocks::tick::{Tick, TickReason, TickStats};
use crate::error::ClockError;

/// Virtual-time clock for deterministic tests.
pub struct TestClock {
    interval_ms: u64,
    running: AtomicBool,
    handler: Mutex<Option<TickHandlerRef>>,
    virtual_time: AtomicU64,
    accumulator: AtomicU64,
    seq: AtomicU64,
    stats: Mutex<StatsCore>,
}

impl TestClock {
    /// Creates a test clock with the given virtual interval in
    /// milliseconds.
    ///
    /// Fails with [`ClockError::InvalidInterval`] for a zero interval.
    pub fn new(interval_ms: u64) -> Result<Self, ClockError> {
        if interval_ms == 0 {
            return Err(ClockError::InvalidInterval);
        }
        Ok(Self {
            interval_ms,
            running: AtomicBool::new(false),
            handler: Mutex::new(None),
            virtual_time: AtomicU64::new(0),
            accumulator: AtomicU64::new(0),
            seq: AtomicU64::new(0),
            stats: Mutex::new(StatsCore::default()),
        })
    }

    /// Fires `count` ticks, each advancing virtual time by one interval.
    ///
    /// Requires a running clock. A handler error aborts the remainder of
    /// the batch and propagates after being counted.
    pub async fn tick(&self, count: u32) -> Result<(), ClockError> {
        for _ in 0..count {
            self.fire_one(self.interval_ms).await?;
        }
        Ok(())
    }

    /// Feeds `ms` of virtual elapsed time into the accumulator and fires
    /// one tick per whole interval. The residue carries across calls.
    pub async fn advance_by(&self, ms: u64) -> Result<(), ClockError> {
        self.ensure_running()?;
        let total = self.accumulator.fetch_add(ms, Ordering::SeqCst) + ms;
        let pending = total / self.interval_ms;
        self.accumulator
            .fetch_sub(pending * self.interval_ms, Ordering::SeqCst);
        for _ in 0..pending {
            self.fire_one(self.interval_ms).await?;
        }
        Ok(())
    }

    /// Spends any accumulator residue as a single tick.
    pub async fn flush(&self) -> Result<(), ClockError> {
        self.ensure_running()?;
        let residue = self.accumulator.swap(0, Ordering::SeqCst);
        if residue > 0 {
            self.fire_one(residue).await?;
        }
        Ok(())
    }

    /// Zeroes virtual time, sequence, accumulator, and stats.
    pub fn reset(&self) {
        self.virtual_time.store(0, Ordering::SeqCst);
        self.accumulator.store(0, Ordering::SeqCst);
        self.seq.store(0, Ordering::SeqCst);
        lock(&self.stats).reset();
    }

    /// Whole intervals currently sitting in the accumulator.
    pub fn pending_ticks(&self) -> u64 {
        self.accumulator.load(Ordering::SeqCst) / self.interval_ms
    }

    fn ensure_running(&self) -> Result<(), ClockError> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClockError::NotRunning)
        }
    }

    /// Advances virtual time by `advance` and fires one `Manual` tick.
    async fn fire_one(&self, advance: u64) -> Result<(), ClockError> {
        self.ensure_running()?;
        let handler = lock(&self.handler).clone().ok_or(ClockError::NotRunning)?;

        let ts = self.virtual_time.fetch_add(advance, Ordering::SeqCst) + advance;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let tick = Tick {
            ts,
            seq,
            reason: TickReason::Manual,
            drift: None,
        };
        lock(&self.stats).record_tick(ts);

        let started = Instant::now();
        let result = handler.invoke(tick).await;
        let elapsed = (started.elapsed().as_millis().min(u128::from(u64::MAX))) as u64;
        lock(&self.stats).record_handler(elapsed, result.is_err());

        result.map_err(|source| ClockError::Handler { source })
    }
}

impl Default for TestClock {
    /// A test clock with a one-second virtual interval.
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            running: AtomicBool::new(false),
            handler: Mutex::new(None),
            virtual_time: AtomicU64::new(0),
            accumulator: AtomicU64::new(0),
            seq: AtomicU64::new(0),
            stats: Mutex::new(StatsCore::default()),
        }
    }
}

#[async_trait]
impl Clock for TestClock {
    /// Registers the handler; produces no ticks on its own.
    async fn start(&self, handler: TickHandlerRef) -> Result<(), ClockError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ClockError::AlreadyRunning);
        }
        *lock(&self.handler) = Some(handler);
        self.seq.store(0, Ordering::SeqCst);
        self.accumulator.store(0, Ordering::SeqCst);
        lock(&self.stats).reset();
        Ok(())
    }

    /// Clears the handler and accumulator. Virtual time, sequence, and
    /// stats keep their values for post-mortem reads; only
    /// [`reset`](TestClock::reset) zeroes them.
    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        *lock(&self.handler) = None;
        self.accumulator.store(0, Ordering::SeqCst);
    }

    /// Virtual milliseconds since construction (or the last `reset`).
    fn now(&self) -> u64 {
        self.virtual_time.load(Ordering::SeqCst)
    }

    fn stats(&self) -> TickStats {
        lock(&self.stats).snapshot()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }
}
