//! # Timing primitives driving scheduled signal production.
//!
//! This module groups the tick **data model** and the three concrete
//! clocks behind the shared [`Clock`] contract.
//!
//! ## Contents
//! - [`Tick`], [`TickReason`], [`TickStats`] — the timing event and its
//!   per-epoch accounting
//! - [`Clock`], [`TickHandler`] — the lifecycle contract and the consumer
//!   seam
//! - [`IntervalClock`] — periodic generator with block / drop / adaptive
//!   back-pressure
//! - [`TestClock`] — virtual time for deterministic tests
//! - [`BridgeClock`] — externally pushed ticks
//!
//! ## Quick reference
//! - **Producers**: the interval scheduler loops, the bridge worker, the
//!   test clock's manual drivers.
//! - **Consumers**: anything implementing [`TickHandler`] — usually an
//!   async closure, or a [`ClockSource`](crate::ClockSource) mapping ticks
//!   to signals for a bus.

mod bridge;
mod clock;
mod drift;
mod interval;
mod test_clock;
mod tick;

pub use bridge::BridgeClock;
pub use clock::{BoxTickFuture, Clock, TickHandler, TickHandlerRef};
pub use interval::{
    BackpressurePolicy, DriftHook, IntervalClock, IntervalConfig, TickErrorHook,
};
pub use test_clock::TestClock;
pub use tick::{Tick, TickReason, TickStats};

pub(crate) use clock::lock;
