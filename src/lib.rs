//! # tickbus
//!
//! **Tickbus** is a typed, in-process event-bus runtime with pluggable
//! transport, persistence, and execution layers, plus a family of timing
//! primitives ("clocks") that drive scheduled signal production.
//!
//! A host program declares a closed set of signal types as an enum,
//! produces them from sources (periodic clocks, external pushes), and
//! dispatches them deterministically through a middleware chain to typed
//! and type-agnostic subscribers, with durability hooks for at-least-once
//! replay after a restart.
//!
//! ## Features
//!
//! | Area           | Description                                                        | Key types / traits                                  |
//! |----------------|--------------------------------------------------------------------|-----------------------------------------------------|
//! | **Bus**        | Emit pipeline, subscriptions, middleware onion, replay.            | [`SignalBus`], [`Handler`], [`Middleware`]          |
//! | **Clocks**     | Interval scheduling with back-pressure, virtual time, pushes.      | [`IntervalClock`], [`TestClock`], [`BridgeClock`]   |
//! | **Sources**    | Producers feeding the bus through an emit function.                | [`Source`], [`ClockSource`]                         |
//! | **Durability** | Save / ack / replay hooks.                                         | [`SignalStore`], [`MemoryStore`]                    |
//! | **Delivery**   | Swappable transport and handler-invocation policy.                 | [`Transport`], [`HandlerExecutor`]                  |
//! | **Errors**     | Typed errors split by producer.                                    | [`BusError`], [`ClockError`], [`HandleError`]       |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`SignalLogger`] any-handler
//!   _(demo/reference only)_.
//!
//! ```rust
//! use tickbus::{HandleError, Signal, SignalBus};
//!
//! #[derive(Clone)]
//! enum AppSignal {
//!     Heartbeat { id: String, ts: u64 },
//! }
//!
//! impl Signal for AppSignal {
//!     fn kind(&self) -> &str {
//!         match self {
//!             AppSignal::Heartbeat { .. } => "heartbeat",
//!         }
//!     }
//!     fn id(&self) -> &str {
//!         match self {
//!             AppSignal::Heartbeat { id, .. } => id,
//!         }
//!     }
//!     fn ts(&self) -> u64 {
//!         match self {
//!             AppSignal::Heartbeat { ts, .. } => *ts,
//!         }
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus: SignalBus<AppSignal> = SignalBus::new();
//!
//!     bus.on("heartbeat", |signal: AppSignal| async move {
//!         println!("beat at {}", signal.ts());
//!         Ok::<_, HandleError>(())
//!     });
//!
//!     bus.emit(AppSignal::Heartbeat {
//!         id: tickbus::random_id(),
//!         ts: 1,
//!     })
//!     .await?;
//!
//!     assert_eq!(bus.stats().handled, 1);
//!     Ok(())
//! }
//! ```
//!
//! ---

mod bus;
mod clocks;
mod error;
mod executor;
mod signal;
mod sources;
mod store;
mod transport;

// ---- Public re-exports ----

pub use bus::{
    BoxDispatchFuture, BoxHandleFuture, BusConfig, BusStats, DispatchErrorHook, Handler,
    HandlerRef, Middleware, MiddlewareRef, Next, SignalBus, Subscription,
};
pub use clocks::{
    BackpressurePolicy, BoxTickFuture, BridgeClock, Clock, DriftHook, IntervalClock,
    IntervalConfig, TestClock, Tick, TickErrorHook, TickHandler, TickHandlerRef, TickReason,
    TickStats,
};
pub use error::{BusError, ClockError, HandleError, SourceError};
pub use executor::{ExecutorStats, HandlerExecutor, InlineExecutor};
pub use signal::{random_id, Signal};
pub use sources::{BoxEmitFuture, ClockSource, EmitFn, Source};
pub use store::{MemoryStore, NullStore, SignalStore};
pub use transport::{
    BoxTransportFuture, InProcessTransport, SubscriberId, Transport, TransportSubscriber,
};

// Optional: expose a simple built-in logging subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use bus::SignalLogger;
