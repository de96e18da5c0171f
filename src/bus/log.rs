//! # Simple logging subscriber for debugging and demos.
//!
//! [`SignalLogger`] prints every signal it sees to stdout in a
//! human-readable format. Register it as an any-handler:
//!
//! ```text
//! [signal] kind=heartbeat id=5f1c… ts=1712000000000
//! [signal] kind=file-changed id=09aa… ts=1712000000123 source=watcher
//! ```
//!
//! Enabled via the `logging` feature. Not intended for production use —
//! implement a custom handler for structured logging or metrics.

use crate::bus::handler::{BoxHandleFuture, Handler};
use crate::signal::Signal;

/// Stdout logging any-handler.
///
/// ```no_run
/// # use tickbus::{SignalBus, SignalLogger, Signal};
/// # #[derive(Clone)]
/// # struct S;
/// # impl Signal for S {
/// #     fn kind(&self) -> &str { "s" }
/// #     fn id(&self) -> &str { "1" }
/// #     fn ts(&self) -> u64 { 0 }
/// # }
/// let bus: SignalBus<S> = SignalBus::new();
/// bus.on_any(SignalLogger);
/// ```
pub struct SignalLogger;

impl<S: Signal> Handler<S> for SignalLogger {
    fn handle(&self, signal: S) -> BoxHandleFuture {
        Box::pin(async move {
            match signal.source() {
                Some(source) => println!(
                    "[signal] kind={} id={} ts={} source={}",
                    signal.kind(),
                    signal.id(),
                    signal.ts(),
                    source
                ),
                None => println!(
                    "[signal] kind={} id={} ts={}",
                    signal.kind(),
                    signal.id(),
                    signal.ts()
                ),
            }
            Ok(())
        })
    }
}
