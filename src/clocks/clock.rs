//! # Clock contract shared by all timing primitives.
//!
//! Defines the object-safe [`Clock`] trait, the [`TickHandler`] seam that
//! consumers implement (usually as a plain async closure), and the internal
//! per-epoch accounting shared by the concrete clocks.
//!
//! ## Rules
//! - `start` on a running clock fails with [`ClockError::AlreadyRunning`].
//! - `stop` is idempotent and may be called from any state.
//! - After `start`, `seq` and all stats are zero.
//! - Emitted [`Tick::seq`] values are strictly monotonic from 0 per epoch.
//! - `stop` cancels any pending timer and prevents further handler
//!   invocations for the current epoch; an in-flight invocation may
//!   complete.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tickbus::{Clock, HandleError, IntervalClock, IntervalConfig, Tick};
//!
//! # async fn demo() -> Result<(), tickbus::ClockError> {
//! let clock = IntervalClock::new(IntervalConfig::every_millis(250))?;
//! clock
//!     .start(Arc::new(|tick: Tick| async move {
//!         println!("tick seq={} reason={}", tick.seq, tick.reason.as_label());
//!         Ok::<_, HandleError>(())
//!     }))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::clocks::drift::DriftMonitor;
use crate::clocks::tick::{Tick, TickStats};
use crate::error::{ClockError, HandleError};

/// Boxed future returned by [`TickHandler::invoke`].
pub type BoxTickFuture = Pin<Box<dyn Future<Output = Result<(), HandleError>> + Send + 'static>>;

/// Shared handle to a tick handler.
pub type TickHandlerRef = Arc<dyn TickHandler>;

/// Receiver of clock ticks.
///
/// Blanket-implemented for async closures, so the usual way to start a clock
/// is `clock.start(Arc::new(|tick| async move { ... }))`.
pub trait TickHandler: Send + Sync + 'static {
    /// Creates the future handling one tick.
    fn invoke(&self, tick: Tick) -> BoxTickFuture;
}

impl<F, Fut> TickHandler for F
where
    F: Fn(Tick) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandleError>> + Send + 'static,
{
    fn invoke(&self, tick: Tick) -> BoxTickFuture {
        Box::pin((self)(tick))
    }
}

/// A producer of [`Tick`]s with a start/stop lifecycle.
///
/// Implemented by [`IntervalClock`](crate::IntervalClock),
/// [`TestClock`](crate::TestClock), and
/// [`BridgeClock`](crate::BridgeClock); consumers that only need the tick
/// contract hold an `Arc<dyn Clock>`.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Registers the handler and begins producing ticks.
    async fn start(&self, handler: TickHandlerRef) -> Result<(), ClockError>;

    /// Stops producing ticks. Idempotent.
    async fn stop(&self);

    /// Current time in milliseconds (wall-clock, or virtual for the test
    /// clock).
    fn now(&self) -> u64;

    /// Snapshot of this epoch's counters.
    fn stats(&self) -> TickStats;

    /// Whether the clock is between `start` and `stop`.
    fn is_running(&self) -> bool;

    /// Sequence number the next tick will carry.
    fn seq(&self) -> u64;
}

/// Locks a std mutex, recovering the guard if a panicking handler poisoned
/// it; clock accounting stays valid either way.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-epoch accounting shared by the concrete clocks.
///
/// Kept behind a short-section `std::sync::Mutex`; never locked across an
/// `.await`.
#[derive(Debug, Default)]
pub(crate) struct StatsCore {
    tick_count: u64,
    dropped_ticks: u64,
    errors: u64,
    last_tick_at: Option<u64>,
    max_handler_ms: u64,
    total_handler_ms: u64,
    handler_samples: u64,
    total_drift_ms: u64,
    drift_samples: u64,
    monitor: DriftMonitor,
}

impl StatsCore {
    /// Zeroes everything; called on every `start` (and the test clock's
    /// `reset`).
    pub(crate) fn reset(&mut self) {
        *self = StatsCore::default();
    }

    /// Records one fired tick.
    pub(crate) fn record_tick(&mut self, ts: u64) {
        self.tick_count += 1;
        self.last_tick_at = Some(ts);
    }

    /// Records an observed drift; returns `true` when the drift-warning
    /// hook should fire.
    pub(crate) fn record_drift(&mut self, drift_ms: i64, interval_ms: u64) -> bool {
        self.total_drift_ms += drift_ms.unsigned_abs();
        self.drift_samples += 1;
        self.monitor.observe(drift_ms, interval_ms)
    }

    /// Records one completed handler invocation.
    pub(crate) fn record_handler(&mut self, elapsed_ms: u64, failed: bool) {
        self.total_handler_ms += elapsed_ms;
        self.handler_samples += 1;
        self.max_handler_ms = self.max_handler_ms.max(elapsed_ms);
        if failed {
            self.errors += 1;
        }
    }

    /// Adds skipped ticks to the drop counter.
    pub(crate) fn add_dropped(&mut self, n: u64) {
        self.dropped_ticks += n;
    }

    pub(crate) fn snapshot(&self) -> TickStats {
        let avg = |total: u64, samples: u64| {
            if samples == 0 {
                0.0
            } else {
                total as f64 / samples as f64
            }
        };
        TickStats {
            tick_count: self.tick_count,
            dropped_ticks: self.dropped_ticks,
            errors: self.errors,
            last_tick_at: self.last_tick_at,
            max_handler_ms: self.max_handler_ms,
            avg_handler_ms: avg(self.total_handler_ms, self.handler_samples),
            avg_drift_ms: avg(self.total_drift_ms, self.drift_samples),
        }
    }
}
