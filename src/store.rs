//! # Durability hooks for at-least-once replay.
//!
//! A [`SignalStore`] sees every signal before it reaches the transport
//! (`save`), learns when dispatch finished (`mark_acked`), and can hand
//! back the signals that never got acknowledged (`unacked`) so
//! [`SignalBus::replay`](crate::SignalBus::replay) can republish them
//! after a restart.
//!
//! Implementations must preserve the signal record field-for-field on the
//! `save` → `unacked` round trip, and must return unacked signals in save
//! order.
//!
//! Two implementations ship with the crate:
//! - [`NullStore`] — the default; durability disabled, all hooks no-ops.
//! - [`MemoryStore`] — ordered in-memory retention until ack; backs
//!   replay tests and small embedded deployments.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::clocks::lock;
use crate::error::BusError;
use crate::signal::Signal;

/// Durability hooks invoked by the emit pipeline.
///
/// All methods report failures as [`BusError::Store`]; a `save` failure
/// means the signal is lost (the bus will not deliver it).
#[async_trait]
pub trait SignalStore<S: Signal>: Send + Sync {
    /// Persists one signal before delivery.
    async fn save(&self, signal: &S) -> Result<(), BusError>;

    /// Marks a previously saved signal as fully dispatched.
    async fn mark_acked(&self, id: &str) -> Result<(), BusError>;

    /// Returns all saved-but-unacked signals, in save order.
    async fn unacked(&self) -> Result<Vec<S>, BusError>;
}

/// Default store: durability disabled.
pub struct NullStore;

#[async_trait]
impl<S: Signal> SignalStore<S> for NullStore {
    async fn save(&self, _signal: &S) -> Result<(), BusError> {
        Ok(())
    }

    async fn mark_acked(&self, _id: &str) -> Result<(), BusError> {
        Ok(())
    }

    async fn unacked(&self) -> Result<Vec<S>, BusError> {
        Ok(Vec::new())
    }
}

/// One retained record.
struct Entry<S> {
    id: String,
    signal: S,
    acked: bool,
}

/// Ordered in-memory store.
///
/// Keeps every saved signal (acked entries included) for the lifetime of
/// the store; `unacked` clones out the pending ones in save order.
pub struct MemoryStore<S> {
    entries: Mutex<Vec<Entry<S>>>,
}

impl<S: Signal> MemoryStore<S> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Total retained records, acked or not.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records still awaiting acknowledgement.
    pub fn pending(&self) -> usize {
        lock(&self.entries).iter().filter(|e| !e.acked).count()
    }
}

impl<S: Signal> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: Signal> SignalStore<S> for MemoryStore<S> {
    async fn save(&self, signal: &S) -> Result<(), BusError> {
        lock(&self.entries).push(Entry {
            id: signal.id().to_string(),
            signal: signal.clone(),
            acked: false,
        });
        Ok(())
    }

    async fn mark_acked(&self, id: &str) -> Result<(), BusError> {
        for entry in lock(&self.entries).iter_mut() {
            if entry.id == id {
                entry.acked = true;
            }
        }
        Ok(())
    }

    async fn unacked(&self) -> Result<Vec<S>, BusError> {
        Ok(lock(&self.entries)
            .iter()
            .filter(|e| !e.acked)
            .map(|e| e.signal.clone())
            .collect())
    }
}
