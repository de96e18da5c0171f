//! # Clock→source adapter.
//!
//! [`ClockSource`] turns any [`Clock`] into a [`Source`]: every tick is
//! mapped through a pure function into a signal and handed to the emit
//! function. Emit failures surface to the clock as handler errors, so they
//! land in the clock's [`TickStats::errors`](crate::TickStats).
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tickbus::{
//!     random_id, ClockSource, IntervalClock, IntervalConfig, Signal, SignalBus, Source, Tick,
//! };
//!
//! #[derive(Clone)]
//! struct Heartbeat {
//!     id: String,
//!     ts: u64,
//!     seq: u64,
//! }
//! # impl Signal for Heartbeat {
//! #     fn kind(&self) -> &str { "heartbeat" }
//! #     fn id(&self) -> &str { &self.id }
//! #     fn ts(&self) -> u64 { self.ts }
//! # }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: SignalBus<Heartbeat> = SignalBus::new();
//! let clock = Arc::new(IntervalClock::new(IntervalConfig::every_millis(1_000))?);
//! let source = ClockSource::new(clock, |tick: Tick| Heartbeat {
//!     id: random_id(),
//!     ts: tick.ts,
//!     seq: tick.seq,
//! })
//! .with_name("heartbeat");
//!
//! source.start(bus.emitter()).await?;
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::clocks::{Clock, Tick, TickHandlerRef};
use crate::error::{HandleError, SourceError};
use crate::signal::Signal;
use crate::sources::source::{EmitFn, Source};

/// Adapts a [`Clock`] into a [`Source`] via a tick→signal mapping.
pub struct ClockSource<S: Signal> {
    name: Cow<'static, str>,
    clock: Arc<dyn Clock>,
    map: Arc<dyn Fn(Tick) -> S + Send + Sync>,
    started: AtomicBool,
}

impl<S: Signal> ClockSource<S> {
    /// Wraps `clock`, mapping each tick through `map`. The name defaults
    /// to `"clock"`.
    pub fn new(clock: Arc<dyn Clock>, map: impl Fn(Tick) -> S + Send + Sync + 'static) -> Self {
        Self {
            name: Cow::Borrowed("clock"),
            clock,
            map: Arc::new(map),
            started: AtomicBool::new(false),
        }
    }

    /// Overrides the source name.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// The wrapped clock, for stats inspection.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[async_trait]
impl<S: Signal> Source<S> for ClockSource<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, emit: EmitFn<S>) -> Result<(), SourceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SourceError::AlreadyStarted {
                name: self.name.to_string(),
            });
        }

        let map = Arc::clone(&self.map);
        let handler: TickHandlerRef = Arc::new(move |tick: Tick| {
            let pending = emit(map(tick));
            async move {
                pending
                    .await
                    .map_err(|err| HandleError::fail(err.to_string()))
            }
        });

        if let Err(err) = self.clock.start(handler).await {
            self.started.store(false, Ordering::SeqCst);
            return Err(SourceError::Clock { source: err });
        }
        Ok(())
    }

    async fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            self.clock.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocks::TestClock;
    use crate::error::BusError;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Pulse {
        id: String,
        ts: u64,
    }

    impl Signal for Pulse {
        fn kind(&self) -> &str {
            "pulse"
        }
        fn id(&self) -> &str {
            &self.id
        }
        fn ts(&self) -> u64 {
            self.ts
        }
        fn source(&self) -> Option<&str> {
            Some("test")
        }
    }

    fn collecting_emit(seen: &Arc<Mutex<Vec<u64>>>) -> EmitFn<Pulse> {
        let seen = Arc::clone(seen);
        Arc::new(move |signal: Pulse| {
            let seen = Arc::clone(&seen);
            Box::pin(async move {
                seen.lock().unwrap().push(signal.ts);
                Ok::<_, BusError>(())
            })
        })
    }

    #[tokio::test]
    async fn maps_ticks_to_signals() {
        let clock = Arc::new(TestClock::new(100).expect("valid"));
        let source = ClockSource::new(Arc::clone(&clock) as Arc<dyn Clock>, |tick: Tick| Pulse {
            id: format!("pulse-{}", tick.seq),
            ts: tick.ts,
        })
        .with_name("pulse");

        let seen = Arc::new(Mutex::new(Vec::new()));
        source.start(collecting_emit(&seen)).await.expect("start");
        assert_eq!(source.name(), "pulse");

        clock.tick(3).await.expect("tick");
        assert_eq!(*seen.lock().unwrap(), vec![100, 200, 300]);

        source.stop().await;
        assert!(!clock.is_running());
        // idempotent
        source.stop().await;
    }

    #[tokio::test]
    async fn double_start_fails() {
        let clock = Arc::new(TestClock::new(100).expect("valid"));
        let source = ClockSource::new(Arc::clone(&clock) as Arc<dyn Clock>, |tick: Tick| Pulse {
            id: format!("pulse-{}", tick.seq),
            ts: tick.ts,
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        source.start(collecting_emit(&seen)).await.expect("start");
        let again = source.start(collecting_emit(&seen)).await;
        assert!(matches!(again, Err(SourceError::AlreadyStarted { .. })));
    }

    #[tokio::test]
    async fn emit_failure_counts_as_clock_error() {
        let clock = Arc::new(TestClock::new(100).expect("valid"));
        let source = ClockSource::new(Arc::clone(&clock) as Arc<dyn Clock>, |tick: Tick| Pulse {
            id: format!("pulse-{}", tick.seq),
            ts: tick.ts,
        });

        let failing: EmitFn<Pulse> = Arc::new(|_signal: Pulse| {
            Box::pin(async {
                Err(BusError::Transport {
                    reason: "down".into(),
                })
            })
        });
        source.start(failing).await.expect("start");

        // the test clock rethrows what real clocks would only count
        let err = clock.tick(1).await;
        assert!(matches!(err, Err(crate::error::ClockError::Handler { .. })));
        assert_eq!(clock.stats().errors, 1);
    }
}
