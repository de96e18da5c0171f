//! # Handler executor: the invocation policy seam.
//!
//! The bus never calls a handler directly — it goes through a
//! [`HandlerExecutor`], so deployments can swap in queueing or pooling
//! without touching dispatch semantics. The default [`InlineExecutor`]
//! runs the handler on the caller's task, which is what gives the bus its
//! sequential ordering guarantees.
//!
//! Panics inside a handler are caught here and reported as
//! [`HandleError::Panicked`], isolating a misbehaving subscriber from the
//! rest of the dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::FutureExt;

use crate::bus::HandlerRef;
use crate::error::HandleError;
use crate::signal::Signal;

/// Snapshot of an executor's load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Invocations accepted but not yet started.
    pub queued: usize,
    /// Invocations currently running.
    pub processing: usize,
}

/// Handler invocation policy.
#[async_trait]
pub trait HandlerExecutor<S: Signal>: Send + Sync {
    /// Runs one handler invocation to completion.
    async fn execute(&self, handler: &HandlerRef<S>, signal: S) -> Result<(), HandleError>;

    /// Snapshot of the executor's load.
    fn stats(&self) -> ExecutorStats;
}

/// Default executor: runs handlers inline on the dispatching task.
///
/// `queued` is always 0 — nothing waits, everything runs immediately and
/// sequentially.
pub struct InlineExecutor {
    processing: AtomicUsize,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self {
            processing: AtomicUsize::new(0),
        }
    }
}

impl Default for InlineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: Signal> HandlerExecutor<S> for InlineExecutor {
    async fn execute(&self, handler: &HandlerRef<S>, signal: S) -> Result<(), HandleError> {
        self.processing.fetch_add(1, Ordering::SeqCst);
        let result = std::panic::AssertUnwindSafe(handler.handle(signal))
            .catch_unwind()
            .await;
        self.processing.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(outcome) => outcome,
            Err(payload) => Err(HandleError::Panicked {
                reason: panic_reason(payload.as_ref()),
            }),
        }
    }

    fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            queued: 0,
            processing: self.processing.load(Ordering::SeqCst),
        }
    }
}

/// Extracts a printable message from a caught panic payload.
fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
