//! # Signal sources: external producers feeding the bus.
//!
//! A source receives an [`EmitFn`] from its consumer and calls it for
//! every signal it produces. The crate ships the [`ClockSource`] adapter;
//! file-watcher or cron adapters follow the same [`Source`] contract.

mod clock_source;
mod source;

pub use clock_source::ClockSource;
pub use source::{BoxEmitFuture, EmitFn, Source};
