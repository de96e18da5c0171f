//! # Signal bus: emit pipeline, subscription tables, middleware, replay.
//!
//! [`SignalBus`] owns the dispatch machinery for one signal set. It is a
//! cheap clonable handle; clones share the same tables and counters.
//!
//! ## Emit pipeline
//! ```text
//!   emit(s) ─► store.save ─► transport.emit ─► store.mark_acked
//!                               │
//!                    (single dispatch subscription,
//!                     installed at construction)
//!                               ▼
//!                middleware onion ─► typed handlers ─► any-handlers
//!                                    (executor.execute per invocation)
//! ```
//!
//! ## Rules
//! - `emit` resolves only after every handler and middleware path has
//!   resolved (subject to the executor's policy).
//! - Handler errors are counted and reported through the `on_error` hook;
//!   they never reject `emit`. Middleware, store, and transport errors do.
//! - Typed handlers run before any-handlers, each list in registration
//!   order; dispatch iterates snapshots, so unsubscribing mid-dispatch is
//!   safe and takes effect on the next signal.
//! - `replay` republishes unacked signals through the transport without
//!   re-saving them.
//!
//! ## Example
//! ```rust
//! use tickbus::{HandleError, Signal, SignalBus};
//!
//! #[derive(Clone)]
//! struct Ping {
//!     id: String,
//!     ts: u64,
//! }
//!
//! impl Signal for Ping {
//!     fn kind(&self) -> &str {
//!         "ping"
//!     }
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!     fn ts(&self) -> u64 {
//!         self.ts
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tickbus::BusError> {
//! let bus: SignalBus<Ping> = SignalBus::new();
//! let sub = bus.on("ping", |signal: Ping| async move {
//!     let _ = signal.ts();
//!     Ok::<_, HandleError>(())
//! });
//!
//! bus.emit(Ping { id: "a".into(), ts: 1 }).await?;
//! assert_eq!(bus.stats().emitted, 1);
//! assert_eq!(bus.stats().handled, 1);
//! sub.unsubscribe();
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use dashmap::DashMap;

use crate::bus::handler::{Handler, HandlerRef};
use crate::bus::middleware::{fold_chain, DispatchFn, Middleware, MiddlewareRef};
use crate::clocks::lock;
use crate::error::{BusError, HandleError};
use crate::executor::{HandlerExecutor, InlineExecutor};
use crate::signal::Signal;
use crate::sources::EmitFn;
use crate::store::{NullStore, SignalStore};
use crate::transport::{InProcessTransport, Transport};

/// Hook receiving every caught handler failure.
///
/// The label pinpoints the failing registration: `"type:<kind>"` for typed
/// handlers, `"any:<index>"` for any-handlers.
pub type DispatchErrorHook<S> = Arc<dyn Fn(&S, &str, &HandleError) + Send + Sync>;

/// Counter and table-size snapshot for a bus.
///
/// Counters start at construction and are never reset by the bus itself;
/// [`SignalBus::clear`] only empties the tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Signals accepted by `emit`.
    pub emitted: u64,
    /// Successful handler invocations.
    pub handled: u64,
    /// Failed handler invocations.
    pub errors: u64,
    /// Live typed registrations, across all kinds.
    pub handlers: usize,
    /// Live any-handler registrations.
    pub any_handlers: usize,
    /// Registered middleware.
    pub middleware: usize,
}

/// Pluggable collaborators for a [`SignalBus`].
pub struct BusConfig<S: Signal> {
    /// Delivery surface between emit and dispatch.
    pub transport: Arc<dyn Transport<S>>,
    /// Durability hooks.
    pub store: Arc<dyn SignalStore<S>>,
    /// Handler invocation policy.
    pub executor: Arc<dyn HandlerExecutor<S>>,
    /// Receives every caught handler failure.
    pub on_error: Option<DispatchErrorHook<S>>,
}

impl<S: Signal> Default for BusConfig<S> {
    /// In-process transport, no durability, inline sequential execution.
    fn default() -> Self {
        Self {
            transport: Arc::new(InProcessTransport::new()),
            store: Arc::new(NullStore),
            executor: Arc::new(InlineExecutor::new()),
            on_error: None,
        }
    }
}

/// One registration in a handler table.
struct Entry<S: Signal> {
    id: u64,
    handler: HandlerRef<S>,
}

struct BusInner<S: Signal> {
    typed: DashMap<String, Vec<Entry<S>>>,
    any: Mutex<Vec<Entry<S>>>,
    middleware: Mutex<Vec<MiddlewareRef<S>>>,
    transport: Arc<dyn Transport<S>>,
    store: Arc<dyn SignalStore<S>>,
    executor: Arc<dyn HandlerExecutor<S>>,
    on_error: Option<DispatchErrorHook<S>>,
    emitted: AtomicU64,
    handled: AtomicU64,
    errors: AtomicU64,
    next_entry_id: AtomicU64,
}

/// Typed in-process event bus. See the module docs for the pipeline.
pub struct SignalBus<S: Signal> {
    inner: Arc<BusInner<S>>,
}

impl<S: Signal> Clone for SignalBus<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Signal> SignalBus<S> {
    /// A bus with the default collaborators.
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// A bus with the given collaborators.
    ///
    /// Installs the single dispatch subscription on the transport. The
    /// subscription holds only a weak reference, so dropping every bus
    /// handle tears the pipeline down even if the transport outlives it.
    pub fn with_config(cfg: BusConfig<S>) -> Self {
        let inner = Arc::new(BusInner {
            typed: DashMap::new(),
            any: Mutex::new(Vec::new()),
            middleware: Mutex::new(Vec::new()),
            transport: cfg.transport,
            store: cfg.store,
            executor: cfg.executor,
            on_error: cfg.on_error,
            emitted: AtomicU64::new(0),
            handled: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            next_entry_id: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&inner);
        inner.transport.subscribe(Arc::new(move |signal: S| {
            let weak: Weak<BusInner<S>> = weak.clone();
            Box::pin(async move {
                match weak.upgrade() {
                    Some(inner) => inner.dispatch(signal).await,
                    None => Ok(()),
                }
            })
        }));

        Self { inner }
    }

    /// Runs the full pipeline for one signal.
    ///
    /// Resolves once every middleware and handler path has resolved. A
    /// store `save` failure means the signal is lost; transport and
    /// middleware failures mean delivery is undefined for this signal and
    /// it stays unacked for [`replay`](SignalBus::replay).
    pub async fn emit(&self, signal: S) -> Result<(), BusError> {
        self.inner.emitted.fetch_add(1, Ordering::SeqCst);
        self.inner.store.save(&signal).await?;
        let id = signal.id().to_string();
        self.inner.transport.emit(signal).await?;
        self.inner.store.mark_acked(&id).await?;
        Ok(())
    }

    /// Registers a typed handler. Duplicates are allowed and each gets its
    /// own registration.
    pub fn on(&self, kind: impl Into<String>, handler: impl Handler<S>) -> Subscription {
        let kind = kind.into();
        let id = self.inner.next_entry_id.fetch_add(1, Ordering::SeqCst);
        self.inner.typed.entry(kind.clone()).or_default().push(Entry {
            id,
            handler: Arc::new(handler),
        });

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Some(mut slot) = inner.typed.get_mut(&kind) {
                    let entries = slot.value_mut();
                    if let Some(pos) = entries.iter().position(|e| e.id == id) {
                        entries.remove(pos);
                    }
                }
            }
        })
    }

    /// Registers a type-agnostic handler, invoked after the typed list.
    pub fn on_any(&self, handler: impl Handler<S>) -> Subscription {
        let id = self.inner.next_entry_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.any).push(Entry {
            id,
            handler: Arc::new(handler),
        });

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut entries = lock(&inner.any);
                if let Some(pos) = entries.iter().position(|e| e.id == id) {
                    entries.remove(pos);
                }
            }
        })
    }

    /// Appends a middleware to the chain. There is no unregister; `clear`
    /// is the only removal.
    pub fn layer(&self, middleware: impl Middleware<S>) {
        lock(&self.inner.middleware).push(Arc::new(middleware));
    }

    /// Empties the typed, any, and middleware tables. Counters keep their
    /// values.
    pub fn clear(&self) {
        self.inner.typed.clear();
        lock(&self.inner.any).clear();
        lock(&self.inner.middleware).clear();
    }

    /// Snapshot of counters and table sizes.
    pub fn stats(&self) -> BusStats {
        BusStats {
            emitted: self.inner.emitted.load(Ordering::SeqCst),
            handled: self.inner.handled.load(Ordering::SeqCst),
            errors: self.inner.errors.load(Ordering::SeqCst),
            handlers: self.inner.typed.iter().map(|e| e.value().len()).sum(),
            any_handlers: lock(&self.inner.any).len(),
            middleware: lock(&self.inner.middleware).len(),
        }
    }

    /// Republishes every unacked signal through the transport (skipping
    /// `save`), acking each; returns how many were replayed. Store order
    /// is preserved.
    pub async fn replay(&self) -> Result<usize, BusError> {
        let pending = self.inner.store.unacked().await?;
        let count = pending.len();
        for signal in pending {
            let id = signal.id().to_string();
            self.inner.transport.emit(signal).await?;
            self.inner.store.mark_acked(&id).await?;
        }
        Ok(count)
    }

    /// The emit function handed to a [`Source`](crate::Source).
    pub fn emitter(&self) -> EmitFn<S> {
        let bus = self.clone();
        Arc::new(move |signal: S| {
            let bus = bus.clone();
            Box::pin(async move { bus.emit(signal).await })
        })
    }
}

impl<S: Signal> Default for SignalBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Signal> BusInner<S> {
    /// Transport-side entry point: fold the current middleware list around
    /// the terminal handler step and run it.
    async fn dispatch(self: Arc<Self>, signal: S) -> Result<(), BusError> {
        let middleware = lock(&self.middleware).clone();
        let terminal_state = Arc::clone(&self);
        let terminal: DispatchFn<S> = Arc::new(move |sig: S| {
            let inner = Arc::clone(&terminal_state);
            Box::pin(async move {
                inner.run_handlers(sig).await;
                Ok(())
            })
        });
        let chain = fold_chain(middleware, terminal);
        chain(signal).await
    }

    /// Terminal step: typed handlers in registration order, then
    /// any-handlers. Iterates snapshots; a handler failure is counted,
    /// reported, and never stops the iteration.
    async fn run_handlers(&self, signal: S) {
        let typed: Vec<HandlerRef<S>> = self
            .typed
            .get(signal.kind())
            .map(|slot| slot.iter().map(|e| Arc::clone(&e.handler)).collect())
            .unwrap_or_default();
        let label = format!("type:{}", signal.kind());
        for handler in &typed {
            self.invoke(handler, &signal, &label).await;
        }

        let any: Vec<HandlerRef<S>> = lock(&self.any)
            .iter()
            .map(|e| Arc::clone(&e.handler))
            .collect();
        for (index, handler) in any.iter().enumerate() {
            self.invoke(handler, &signal, &format!("any:{index}")).await;
        }
    }

    async fn invoke(&self, handler: &HandlerRef<S>, signal: &S, label: &str) {
        match self.executor.execute(handler, signal.clone()).await {
            Ok(()) => {
                self.handled.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                if let Some(hook) = &self.on_error {
                    hook(signal, label, &err);
                }
            }
        }
    }
}

/// Idempotent unsubscribe handle returned by [`SignalBus::on`] and
/// [`SignalBus::on_any`].
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) any number of times
/// removes exactly one registration. Dropping the handle does **not**
/// unsubscribe.
pub struct Subscription {
    active: AtomicBool,
    remove: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    fn new(remove: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            active: AtomicBool::new(true),
            remove: Box::new(remove),
        }
    }

    /// Removes the registration this handle was returned for.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            (self.remove)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Probe {
        id: &'static str,
    }

    impl Signal for Probe {
        fn kind(&self) -> &str {
            "probe"
        }
        fn id(&self) -> &str {
            self.id
        }
        fn ts(&self) -> u64 {
            0
        }
    }

    #[tokio::test]
    async fn clear_keeps_counters() {
        let bus: SignalBus<Probe> = SignalBus::new();
        bus.on("probe", |_s: Probe| async { Ok::<_, HandleError>(()) });
        bus.on_any(|_s: Probe| async { Ok::<_, HandleError>(()) });
        bus.emit(Probe { id: "a" }).await.expect("emit");

        assert_eq!(bus.stats().handled, 2);
        bus.clear();

        let stats = bus.stats();
        assert_eq!(stats.handlers, 0);
        assert_eq!(stats.any_handlers, 0);
        assert_eq!(stats.middleware, 0);
        // counters survive
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.handled, 2);
    }

    #[tokio::test]
    async fn table_sizes_track_registrations() {
        let bus: SignalBus<Probe> = SignalBus::new();
        let a = bus.on("probe", |_s: Probe| async { Ok::<_, HandleError>(()) });
        let _b = bus.on("probe", |_s: Probe| async { Ok::<_, HandleError>(()) });
        bus.layer(|signal: Probe, next: crate::bus::Next<Probe>| async move {
            next.run(signal).await
        });

        assert_eq!(bus.stats().handlers, 2);
        assert_eq!(bus.stats().middleware, 1);

        a.unsubscribe();
        a.unsubscribe();
        assert_eq!(bus.stats().handlers, 1);
    }
}
