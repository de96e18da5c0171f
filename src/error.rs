//! # Error types used by the tickbus runtime, clocks, and handlers.
//!
//! This module defines four error enums, split by who produces them:
//!
//! - [`ClockError`] — lifecycle and configuration errors raised by clocks.
//! - [`SourceError`] — lifecycle errors raised by signal sources.
//! - [`BusError`] — failures of the emit pipeline (store, transport,
//!   middleware). These reject [`SignalBus::emit`](crate::SignalBus::emit).
//! - [`HandleError`] — failures produced by tick and signal handlers. These
//!   are caught and counted everywhere except the test clock, which rethrows
//!   them to enable assertions.
//!
//! All types provide `as_label()` for short stable labels in logs/metrics.

use thiserror::Error;

/// Errors raised by clock lifecycle and configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClockError {
    /// The configured interval was zero.
    #[error("interval must be positive")]
    InvalidInterval,

    /// `start` was called while the clock was already running.
    #[error("clock already running")]
    AlreadyRunning,

    /// A manual operation (`tick`, `advance_by`, `flush`) was invoked on a
    /// clock that is not running.
    #[error("clock not running")]
    NotRunning,

    /// A handler error rethrown by the test clock.
    #[error("tick handler failed")]
    Handler {
        #[source]
        source: HandleError,
    },
}

impl ClockError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClockError::InvalidInterval => "clock_invalid_interval",
            ClockError::AlreadyRunning => "clock_already_running",
            ClockError::NotRunning => "clock_not_running",
            ClockError::Handler { .. } => "clock_handler_failed",
        }
    }
}

/// Errors raised by source lifecycle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SourceError {
    /// `start` was called on a source that is already started.
    #[error("source '{name}' already started")]
    AlreadyStarted {
        /// The source name.
        name: String,
    },

    /// The underlying clock refused to start or stop.
    #[error("source clock failed")]
    Clock {
        #[source]
        source: ClockError,
    },
}

impl SourceError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::AlreadyStarted { .. } => "source_already_started",
            SourceError::Clock { .. } => "source_clock_failed",
        }
    }
}

/// Errors produced by the emit pipeline.
///
/// Any of these rejects the `emit` (or `replay`) call that triggered it.
/// Handler failures are **not** represented here — they are caught by the
/// dispatch step and reported through the bus error hook instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// The store failed to save, ack, or list signals.
    #[error("store failure: {reason}")]
    Store { reason: String },

    /// The transport failed to deliver a signal.
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// A middleware aborted the dispatch with an error.
    #[error("middleware failure: {reason}")]
    Middleware { reason: String },
}

impl BusError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Store { .. } => "bus_store_failure",
            BusError::Transport { .. } => "bus_transport_failure",
            BusError::Middleware { .. } => "bus_middleware_failure",
        }
    }
}

/// Errors produced by tick and signal handlers.
///
/// Real clocks and the bus catch these, count them, and report them through
/// the configured error hooks. The test clock rethrows them wrapped in
/// [`ClockError::Handler`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandleError {
    /// The handler returned an error.
    #[error("handler failed: {reason}")]
    Fail { reason: String },

    /// The handler panicked; the panic was caught by the executor.
    #[error("handler panicked: {reason}")]
    Panicked { reason: String },
}

impl HandleError {
    /// Creates a [`HandleError::Fail`] from any printable reason.
    pub fn fail(reason: impl Into<String>) -> Self {
        HandleError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandleError::Fail { .. } => "handler_failed",
            HandleError::Panicked { .. } => "handler_panicked",
        }
    }
}
