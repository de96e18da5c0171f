//! # Bridge clock: external pushes become ticks.
//!
//! [`BridgeClock`] has no scheduler of its own — each [`push`]
//! (BridgeClock::push) while running produces exactly one [`Tick`] with
//! reason `Bridge`. Pushes land on an unbounded queue drained by a worker
//! task that awaits the handler sequentially, so handler invocations arrive
//! in push (= `seq`) order and `push` itself never waits:
//!
//! ```text
//!    push() ──► [queue] ──► worker ──► handler.invoke(tick)
//!   (sync,                 (FIFO,       └─► errors counted, never
//!    non-blocking)          one at        propagated to the pusher
//!                           a time)
//! ```
//!
//! A push while stopped, or before any handler is registered, is a silent
//! no-op. Stats for an async handler are updated when it resolves; do not
//! expect `avg_handler_ms` to be consistent immediately after `push`
//! returns.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clocks::clock::{lock, Clock, StatsCore, TickHandlerRef};
use crate::clocks::tick::{wall_ms, Tick, TickReason, TickStats};
use crate::error::ClockError;

/// Sequence counter and stats for one `start` epoch.
#[derive(Default)]
struct BridgeEpoch {
    seq: AtomicU64,
    stats: Mutex<StatsCore>,
}

/// External-push clock. See the module docs.
pub struct BridgeClock {
    running: AtomicBool,
    epoch: Mutex<Arc<BridgeEpoch>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Tick>>>,
    token: Mutex<Option<CancellationToken>>,
}

impl BridgeClock {
    /// Creates a stopped bridge clock.
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            epoch: Mutex::new(Arc::new(BridgeEpoch::default())),
            sender: Mutex::new(None),
            token: Mutex::new(None),
        }
    }

    /// Produces one `Bridge` tick if the clock is running; otherwise a
    /// silent no-op.
    ///
    /// Never blocks and never waits for the handler. Handler errors are
    /// counted in [`TickStats::errors`] and do not surface here.
    pub fn push(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        let sender = match lock(&self.sender).as_ref() {
            Some(tx) => tx.clone(),
            None => return,
        };

        let epoch = self.epoch();
        let seq = epoch.seq.fetch_add(1, Ordering::SeqCst);
        let ts = wall_ms();
        let tick = Tick {
            ts,
            seq,
            reason: TickReason::Bridge,
            drift: None,
        };
        lock(&epoch.stats).record_tick(ts);
        let _ = sender.send(tick);
    }

    fn epoch(&self) -> Arc<BridgeEpoch> {
        Arc::clone(&lock(&self.epoch))
    }
}

impl Default for BridgeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for BridgeClock {
    /// Registers the handler and spawns the delivery worker.
    ///
    /// Must be called within a Tokio runtime.
    async fn start(&self, handler: TickHandlerRef) -> Result<(), ClockError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ClockError::AlreadyRunning);
        }

        let epoch = Arc::new(BridgeEpoch::default());
        *lock(&self.epoch) = Arc::clone(&epoch);

        let (tx, mut rx) = mpsc::unbounded_channel::<Tick>();
        *lock(&self.sender) = Some(tx);

        let token = CancellationToken::new();
        *lock(&self.token) = Some(token.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(tick) => {
                            let started = Instant::now();
                            let result = handler.invoke(tick).await;
                            let elapsed =
                                (started.elapsed().as_millis().min(u128::from(u64::MAX))) as u64;
                            lock(&epoch.stats).record_handler(elapsed, result.is_err());
                        }
                        None => break,
                    },
                }
            }
        });
        Ok(())
    }

    /// Stops delivery. Queued but undelivered ticks are discarded; an
    /// in-flight handler invocation may complete.
    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        lock(&self.sender).take();
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
