//! # Signal bus: typed dispatch with a middleware onion.
//!
//! This module groups the bus **pipeline** and the seams consumers plug
//! into it.
//!
//! ## Contents
//! - [`SignalBus`], [`BusConfig`], [`BusStats`], [`Subscription`] — the
//!   bus itself
//! - [`Handler`] — typed / any-handler seam (async closures work)
//! - [`Middleware`], [`Next`] — the onion around the terminal handler step
//!
//! ## Quick reference
//! - **Publishers**: [`SignalBus::emit`], [`SignalBus::replay`], and any
//!   [`Source`](crate::Source) holding the bus's
//!   [`emitter`](SignalBus::emitter).
//! - **Consumers**: handlers registered via [`SignalBus::on`] /
//!   [`SignalBus::on_any`].

mod core;
mod handler;
#[cfg(feature = "logging")]
mod log;
mod middleware;

pub use self::core::{BusConfig, BusStats, DispatchErrorHook, SignalBus, Subscription};
pub use self::handler::{BoxHandleFuture, Handler, HandlerRef};
#[cfg(feature = "logging")]
pub use self::log::SignalLogger;
pub use self::middleware::{BoxDispatchFuture, Middleware, MiddlewareRef, Next};
