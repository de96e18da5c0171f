//! # Signal handler seam.
//!
//! [`Handler`] is the extension point for subscribing to signals. It is
//! blanket-implemented for async closures, so registration normally looks
//! like:
//!
//! ```rust
//! # use tickbus::{HandleError, SignalBus, Signal};
//! # #[derive(Clone)]
//! # struct S;
//! # impl Signal for S {
//! #     fn kind(&self) -> &str { "s" }
//! #     fn id(&self) -> &str { "1" }
//! #     fn ts(&self) -> u64 { 0 }
//! # }
//! let bus: SignalBus<S> = SignalBus::new();
//! let sub = bus.on("s", |_signal: S| async move {
//!     Ok::<_, HandleError>(())
//! });
//! # sub.unsubscribe();
//! ```
//!
//! Handlers receive a clone of the signal and run under the bus's
//! [`HandlerExecutor`](crate::HandlerExecutor); their errors are counted
//! and reported, never propagated to the emitter.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::HandleError;
use crate::signal::Signal;

/// Boxed future returned by [`Handler::handle`].
pub type BoxHandleFuture = Pin<Box<dyn Future<Output = Result<(), HandleError>> + Send + 'static>>;

/// Shared handle to a signal handler.
pub type HandlerRef<S> = Arc<dyn Handler<S>>;

/// Receiver of signals dispatched by the bus.
pub trait Handler<S: Signal>: Send + Sync + 'static {
    /// Creates the future handling one signal.
    fn handle(&self, signal: S) -> BoxHandleFuture;
}

impl<S, F, Fut> Handler<S> for F
where
    S: Signal,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandleError>> + Send + 'static,
{
    fn handle(&self, signal: S) -> BoxHandleFuture {
        Box::pin((self)(signal))
    }
}
