//! # Middleware: the onion around signal dispatch.
//!
//! Middleware wraps the terminal handler step symmetrically. Earlier
//! registrations are outermost; a middleware that never calls
//! [`Next::run`] short-circuits every later middleware **and** every
//! handler. Middleware errors are pipeline errors — they reject the `emit`
//! that triggered the dispatch.
//!
//! ```text
//!   emit(s) ─► M1 ─► M2 ─► [typed handlers, any-handlers]
//!                 ◄──── ◄────────────┘
//!   (pre-call order M1→M2, post-call order M2→M1)
//! ```
//!
//! The chain is folded from the registration list **at dispatch time**, so
//! a `layer` call between two emits takes effect on the second.
//!
//! ## Rules
//! - Middleware may await work before and after `next.run(...)`.
//! - Middleware must not alter a signal's `kind` or `id` in ways visible
//!   downstream; the bus does not defend against it.
//!
//! ## Example
//! ```rust
//! # use tickbus::{Next, SignalBus, Signal};
//! # #[derive(Clone)]
//! # struct S;
//! # impl Signal for S {
//! #     fn kind(&self) -> &str { "audit" }
//! #     fn id(&self) -> &str { "1" }
//! #     fn ts(&self) -> u64 { 0 }
//! # }
//! let bus: SignalBus<S> = SignalBus::new();
//! bus.layer(|signal: S, next: Next<S>| async move {
//!     if signal.kind() == "drop" {
//!         return Ok(()); // swallow: nothing downstream runs
//!     }
//!     next.run(signal).await
//! });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BusError;
use crate::signal::Signal;

/// Boxed future produced by a middleware or by the folded chain.
pub type BoxDispatchFuture = Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + 'static>>;

/// Callable remainder of the dispatch chain.
pub(crate) type DispatchFn<S> = Arc<dyn Fn(S) -> BoxDispatchFuture + Send + Sync>;

/// Shared handle to a middleware.
pub type MiddlewareRef<S> = Arc<dyn Middleware<S>>;

/// A stage wrapping the remainder of the dispatch chain.
pub trait Middleware<S: Signal>: Send + Sync + 'static {
    /// Handles one signal; call `next.run(signal)` to continue the chain.
    fn handle(&self, signal: S, next: Next<S>) -> BoxDispatchFuture;
}

impl<S, F, Fut> Middleware<S> for F
where
    S: Signal,
    F: Fn(S, Next<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BusError>> + Send + 'static,
{
    fn handle(&self, signal: S, next: Next<S>) -> BoxDispatchFuture {
        Box::pin((self)(signal, next))
    }
}

/// The remainder of the dispatch chain, handed to each middleware.
///
/// Dropping it without calling [`run`](Next::run) short-circuits all
/// downstream middleware and handlers.
pub struct Next<S> {
    chain: DispatchFn<S>,
}

impl<S: Signal> Next<S> {
    pub(crate) fn new(chain: DispatchFn<S>) -> Self {
        Self { chain }
    }

    /// Runs the rest of the chain with the given signal.
    pub async fn run(self, signal: S) -> Result<(), BusError> {
        (self.chain)(signal).await
    }
}

/// Folds the middleware list into a callable onion around `terminal`.
///
/// Built per dispatch — never precomputed at registration time, so the
/// order can't go stale after a late `layer`.
pub(crate) fn fold_chain<S: Signal>(
    middleware: Vec<MiddlewareRef<S>>,
    terminal: DispatchFn<S>,
) -> DispatchFn<S> {
    let mut chain = terminal;
    for mw in middleware.into_iter().rev() {
        let prev = chain;
        chain = Arc::new(move |signal: S| {
            let next = Next::new(Arc::clone(&prev));
            mw.handle(signal, next)
        });
    }
    chain
}
