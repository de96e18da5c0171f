//! # Source contract: the producer side of the bus.
//!
//! A [`Source`] is anything that turns some external phenomenon —
//! file-system changes, schedules, pushes from another subsystem — into
//! signals. The consumer hands the source an [`EmitFn`] (usually
//! [`SignalBus::emitter`](crate::SignalBus::emitter)); the source calls it
//! for every signal it produces.
//!
//! ## Rules
//! - `start` may fail with [`SourceError::AlreadyStarted`] on double start.
//! - `stop` is idempotent.
//! - Ordering across distinct sources is undefined.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BusError, SourceError};
use crate::signal::Signal;

/// Boxed future returned by an [`EmitFn`].
pub type BoxEmitFuture = Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + 'static>>;

/// The emit function a source receives from its consumer.
pub type EmitFn<S> = Arc<dyn Fn(S) -> BoxEmitFuture + Send + Sync>;

/// A producer of signals with a start/stop lifecycle.
#[async_trait]
pub trait Source<S: Signal>: Send + Sync {
    /// Stable, human-readable source name (used as the origin tag).
    fn name(&self) -> &str;

    /// Begins producing signals through `emit`.
    async fn start(&self, emit: EmitFn<S>) -> Result<(), SourceError>;

    /// Stops producing signals. Idempotent.
    async fn stop(&self);
}
