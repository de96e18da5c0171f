//! # Interval clock: periodic tick generation with back-pressure policies.
//!
//! [`IntervalClock`] fires a [`Tick`] roughly every `interval`. What happens
//! when the consumer is slower than the rate is decided by
//! [`BackpressurePolicy`]:
//!
//! - [`Block`](BackpressurePolicy::Block) — fixed delay. The next sleep is
//!   armed only after the handler resolves, so a slow handler stretches the
//!   effective period. Immune to the spiral of death by construction;
//!   `dropped_ticks` stays 0 and drift is reported as 0.
//! - [`Drop`](BackpressurePolicy::Drop) — fixed rate with skip. The
//!   scheduler keeps the ideal timeline; a cycle that lands while the
//!   previous handler still runs is counted as dropped. Once the handler
//!   frees up, bounded catch-up ticks recover lost time, and irrecoverable
//!   whole intervals are clamped into `dropped_ticks`.
//! - [`Adaptive`](BackpressurePolicy::Adaptive) — fixed rate with an
//!   accumulator of pending elapsed time, drained as a bounded burst of
//!   strictly sequential fires.
//!
//! All three schedulers chain one-shot sleeps (never a repeating timer) and
//! race every sleep against the epoch's cancellation token, the same shape
//! as a supervised actor loop.
//!
//! ## Drift warnings
//! Interval and catch-up ticks carry a signed `drift` (actual minus ideal
//! fire time). Five consecutive ticks with |drift| above 80% of the interval
//! invoke the `on_drift_warning` hook; a single on-time tick resets the
//! streak.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tickbus::{BackpressurePolicy, Clock, HandleError, IntervalClock, IntervalConfig, Tick};
//!
//! # async fn demo() -> Result<(), tickbus::ClockError> {
//! let mut cfg = IntervalConfig::every(Duration::from_millis(50));
//! cfg.backpressure = BackpressurePolicy::Drop;
//! cfg.max_catch_up_ticks = 3;
//!
//! let clock = IntervalClock::new(cfg)?;
//! clock
//!     .start(Arc::new(|tick: Tick| async move {
//!         // slow consumers get dropped cycles, not an ever-growing backlog
//!         Ok::<_, HandleError>(())
//!     }))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::clocks::clock::{lock, Clock, StatsCore, TickHandlerRef};
use crate::clocks::tick::{wall_ms, Tick, TickReason, TickStats};
use crate::error::{ClockError, HandleError};

/// Hook invoked when sustained high drift is detected.
pub type DriftHook = Arc<dyn Fn(i64) + Send + Sync>;

/// Hook invoked when a tick handler fails.
pub type TickErrorHook = Arc<dyn Fn(&HandleError) + Send + Sync>;

/// What a periodic producer does when its consumer is slower than its rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Fixed delay: serialize handler and sleep; never drops.
    Block,
    /// Fixed rate: skip cycles while the handler is busy, catch up after.
    Drop,
    /// Fixed rate: absorb lag into an accumulator, drain as a bounded burst.
    Adaptive,
}

impl Default for BackpressurePolicy {
    /// Returns [`BackpressurePolicy::Block`]: the only policy that can
    /// never lose ticks.
    fn default() -> Self {
        BackpressurePolicy::Block
    }
}

/// Configuration for [`IntervalClock`].
#[derive(Clone)]
pub struct IntervalConfig {
    /// Tick period. Must be at least one millisecond.
    pub interval: Duration,
    /// Back-pressure policy selected once per `start`.
    pub backpressure: BackpressurePolicy,
    /// Catch-up budget per recovery for the fixed-rate policies.
    pub max_catch_up_ticks: u32,
    /// Invoked with the observed drift when the drift detector trips.
    pub on_drift_warning: Option<DriftHook>,
    /// Invoked when a tick handler fails.
    pub on_error: Option<TickErrorHook>,
}

impl IntervalConfig {
    /// Configuration with the given period and defaults for everything else.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            backpressure: BackpressurePolicy::default(),
            max_catch_up_ticks: 3,
            on_drift_warning: None,
            on_error: None,
        }
    }

    /// Convenience for [`IntervalConfig::every`] with a millisecond period.
    pub fn every_millis(ms: u64) -> Self {
        Self::every(Duration::from_millis(ms))
    }
}

/// Sequence counter and stats for one `start` epoch.
///
/// A fresh state is installed at every `start`, so a handler still in
/// flight from a previous epoch can only write into accounting nobody reads
/// anymore.
#[derive(Default)]
struct EpochState {
    seq: AtomicU64,
    stats: Mutex<StatsCore>,
}

/// Periodic tick generator. See the module docs for policy semantics.
pub struct IntervalClock {
    interval_ms: u64,
    policy: BackpressurePolicy,
    max_catch_up: u32,
    on_drift_warning: Option<DriftHook>,
    on_error: Option<TickErrorHook>,
    running: AtomicBool,
    epoch: Mutex<Arc<EpochState>>,
    token: Mutex<Option<CancellationToken>>,
}

impl IntervalClock {
    /// Creates a clock from the given configuration.
    ///
    /// Fails with [`ClockError::InvalidInterval`] when the period rounds
    /// down to zero milliseconds.
    pub fn new(cfg: IntervalConfig) -> Result<Self, ClockError> {
        let interval_ms = (cfg.interval.as_millis().min(u128::from(u64::MAX))) as u64;
        if interval_ms == 0 {
            return Err(ClockError::InvalidInterval);
        }
        Ok(Self {
            interval_ms,
            policy: cfg.backpressure,
            max_catch_up: cfg.max_catch_up_ticks,
            on_drift_warning: cfg.on_drift_warning,
            on_error: cfg.on_error,
            running: AtomicBool::new(false),
            epoch: Mutex::new(Arc::new(EpochState::default())),
            token: Mutex::new(None),
        })
    }

    fn epoch(&self) -> Arc<EpochState> {
        Arc::clone(&lock(&self.epoch))
    }
}

#[async_trait]
impl Clock for IntervalClock {
    /// Spawns the scheduler task for the configured policy.
    ///
    /// Must be called within a Tokio runtime.
    async fn start(&self, handler: TickHandlerRef) -> Result<(), ClockError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ClockError::AlreadyRunning);
        }

        let epoch = Arc::new(EpochState::default());
        *lock(&self.epoch) = Arc::clone(&epoch);

        let token = CancellationToken::new();
        *lock(&self.token) = Some(token.clone());

        let ticker = Arc::new(Ticker {
            interval_ms: self.interval_ms,
            max_catch_up: self.max_catch_up,
            handler,
            token,
            origin: Instant::now(),
            epoch,
            on_drift_warning: self.on_drift_warning.clone(),
            on_error: self.on_error.clone(),
            busy: AtomicBool::new(false),
            next_ideal: AtomicI64::new(0),
        });

        match self.policy {
            BackpressurePolicy::Block => {
                tokio::spawn(ticker.run_block());
            }
            BackpressurePolicy::Drop => {
                tokio::spawn(ticker.run_drop());
            }
            BackpressurePolicy::Adaptive => {
                tokio::spawn(ticker.run_adaptive());
            }
        }
        Ok(())
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(token) = lock(&self.token).take() {
            token.cancel();
        }
    }

    fn now(&self) -> u64 {
        wall_ms()
    }

    fn stats(&self) -> TickStats {
        lock(&self.epoch().stats).snapshot()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn seq(&self) -> u64 {
        self.epoch().seq.load(Ordering::SeqCst)
    }
}

/// One epoch's scheduler state, shared between the timer loop and any
/// spawned handler tasks.
struct Ticker {
    interval_ms: u64,
    max_catch_up: u32,
    handler: TickHandlerRef,
    token: CancellationToken,
    origin: Instant,
    epoch: Arc<EpochState>,
    on_drift_warning: Option<DriftHook>,
    on_error: Option<TickErrorHook>,
    /// Drop policy: whether a handler invocation is still in flight.
    busy: AtomicBool,
    /// Drop policy: the ideal fire time on the monotonic timeline.
    next_ideal: AtomicI64,
}

impl Ticker {
    /// Monotonic milliseconds since this epoch started. Scheduling math
    /// stays on the monotonic timeline; only `Tick::ts` uses wall time.
    fn mono_ms(&self) -> i64 {
        (self.origin.elapsed().as_millis().min(u128::from(i64::MAX as u64))) as i64
    }

    /// Sleeps `delay_ms` unless cancelled first. Returns `false` on cancel.
    async fn sleep(&self, delay_ms: u64) -> bool {
        let sleep = time::sleep(Duration::from_millis(delay_ms));
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => {}
            _ = self.token.cancelled() => return false,
        }
        !self.token.is_cancelled()
    }

    /// Common fire procedure: build the tick, account for it, await the
    /// handler, and fold the timing into the epoch stats.
    async fn fire(&self, reason: TickReason, drift: Option<i64>) {
        let seq = self.epoch.seq.fetch_add(1, Ordering::SeqCst);
        let ts = wall_ms();
        let tick = Tick {
            ts,
            seq,
            reason,
            drift,
        };

        let mut warn = false;
        {
            let mut stats = lock(&self.epoch.stats);
            stats.record_tick(ts);
            if let Some(d) = drift {
                warn = stats.record_drift(d, self.interval_ms);
            }
        }
        if warn {
            if let Some(hook) = &self.on_drift_warning {
                hook(drift.unwrap_or(0));
            }
        }

        let started = Instant::now();
        let result = self.handler.invoke(tick).await;
        let elapsed = (started.elapsed().as_millis().min(u128::from(u64::MAX))) as u64;
        lock(&self.epoch.stats).record_handler(elapsed, result.is_err());

        if let Err(err) = result {
            if let Some(hook) = &self.on_error {
                hook(&err);
            }
        }
    }

    /// Fixed delay: sleep, fire inline, repeat.
    async fn run_block(self: Arc<Self>) {
        while self.sleep(self.interval_ms).await {
            self.fire(TickReason::Interval, Some(0)).await;
        }
    }

    /// Fixed rate with skip. The loop owns the timeline; handlers run on
    /// their own task so a slow one cannot stall the rate.
    async fn run_drop(self: Arc<Self>) {
        let interval = self.interval_ms as i64;
        self.next_ideal.store(self.mono_ms() + interval, Ordering::SeqCst);

        loop {
            let delay = (self.next_ideal.load(Ordering::SeqCst) - self.mono_ms()).max(0) as u64;
            if !self.sleep(delay).await {
                break;
            }

            let now = self.mono_ms();
            let drift = now - self.next_ideal.load(Ordering::SeqCst);
            self.next_ideal.fetch_add(interval, Ordering::SeqCst);

            // The next cycle is armed by the loop continuing, before the
            // handler gets a chance to run.
            if self.busy.swap(true, Ordering::SeqCst) {
                lock(&self.epoch.stats).add_dropped(1);
                continue;
            }

            let ticker = Arc::clone(&self);
            tokio::spawn(async move {
                if ticker.token.is_cancelled() {
                    ticker.busy.store(false, Ordering::SeqCst);
                    return;
                }
                ticker.fire(TickReason::Interval, Some(drift)).await;
                ticker.busy.store(false, Ordering::SeqCst);
                ticker.catch_up(drift).await;
            });
        }
    }

    /// Drop-policy recovery: bounded catch-up fires, then clamp whole
    /// irrecoverable intervals into `dropped_ticks`.
    async fn catch_up(&self, drift: i64) {
        let interval = self.interval_ms as i64;

        let mut fired = 0u32;
        while fired < self.max_catch_up {
            if self.token.is_cancelled() {
                return;
            }
            if self.next_ideal.load(Ordering::SeqCst) > self.mono_ms() {
                break;
            }
            self.next_ideal.fetch_add(interval, Ordering::SeqCst);
            self.fire(TickReason::Catchup, Some(drift)).await;
            fired += 1;
        }

        let behind = self.mono_ms() - self.next_ideal.load(Ordering::SeqCst);
        if behind > 0 {
            let skipped = behind / interval;
            if skipped > 0 {
                lock(&self.epoch.stats).add_dropped(skipped as u64);
                self.next_ideal.fetch_add(skipped * interval, Ordering::SeqCst);
            }
        }
    }

    /// Fixed rate with accumulator. Handlers are awaited inline; pending
    /// elapsed time drains as a bounded burst of sequential fires.
    async fn run_adaptive(self: Arc<Self>) {
        let interval = self.interval_ms as i64;
        let mut next_ideal = self.mono_ms() + interval;
        let mut accumulator: i64 = 0;

        loop {
            let delay = (next_ideal - self.mono_ms()).max(0) as u64;
            if !self.sleep(delay).await {
                break;
            }

            let now = self.mono_ms();
            let drift = now - next_ideal;
            accumulator += interval + drift;

            // At most max_catch_up + 1 firings per cycle: one interval tick
            // carrying the observed drift, then catch-ups with drift 0.
            let mut fired = 0u32;
            while accumulator >= interval && fired <= self.max_catch_up {
                accumulator -= interval;
                let (reason, d) = if fired == 0 {
                    (TickReason::Interval, drift)
                } else {
                    (TickReason::Catchup, 0)
                };
                self.fire(reason, Some(d)).await;
                fired += 1;
                if self.token.is_cancelled() {
                    return;
                }
            }

            if accumulator >= interval {
                let skipped = accumulator / interval;
                lock(&self.epoch.stats).add_dropped(skipped as u64);
                accumulator -= skipped * interval;
            }

            // Anchored to the fire-time `now`: inline handler time shows up
            // as drift on the next cycle and feeds the accumulator.
            next_ideal = now + (interval - accumulator).max(0);
        }
    }
}
