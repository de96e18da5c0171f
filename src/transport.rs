//! # Transport: the fan-out delivery surface between emit and dispatch.
//!
//! The bus publishes every saved signal on its [`Transport`] and receives
//! it back through the single subscription it installs at construction.
//! Swapping the transport is how a deployment would move delivery onto a
//! broker without touching bus semantics; the default
//! [`InProcessTransport`] is a plain in-process fan-out that awaits each
//! subscriber sequentially and propagates the first error.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::clocks::lock;
use crate::error::BusError;
use crate::signal::Signal;

/// Boxed future returned by a transport subscriber.
pub type BoxTransportFuture = Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + 'static>>;

/// A delivery callback registered on a transport.
pub type TransportSubscriber<S> = Arc<dyn Fn(S) -> BoxTransportFuture + Send + Sync>;

/// Identifier returned by [`Transport::subscribe`].
pub type SubscriberId = u64;

/// Fan-out delivery surface.
///
/// The bus registers exactly one subscription; additional subscribers are
/// a transport implementation's own business (mirrors, taps, brokers).
#[async_trait]
pub trait Transport<S: Signal>: Send + Sync {
    /// Delivers one signal to every current subscriber.
    async fn emit(&self, signal: S) -> Result<(), BusError>;

    /// Registers a subscriber; returns its id for [`unsubscribe`]
    /// (Transport::unsubscribe).
    fn subscribe(&self, subscriber: TransportSubscriber<S>) -> SubscriberId;

    /// Removes a subscriber. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriberId);
}

/// Default transport: in-process, ordered, sequential fan-out.
pub struct InProcessTransport<S: Signal> {
    subscribers: Mutex<Vec<(SubscriberId, TransportSubscriber<S>)>>,
    next_id: AtomicU64,
}

impl<S: Signal> InProcessTransport<S> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        lock(&self.subscribers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Signal> Default for InProcessTransport<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: Signal> Transport<S> for InProcessTransport<S> {
    async fn emit(&self, signal: S) -> Result<(), BusError> {
        // snapshot so subscribe/unsubscribe during delivery can't disturb
        // the in-flight iteration
        let subscribers: Vec<TransportSubscriber<S>> = lock(&self.subscribers)
            .iter()
            .map(|(_, sub)| Arc::clone(sub))
            .collect();
        for subscriber in subscribers {
            subscriber(signal.clone()).await?;
        }
        Ok(())
    }

    fn subscribe(&self, subscriber: TransportSubscriber<S>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.subscribers).push((id, subscriber));
        id
    }

    fn unsubscribe(&self, id: SubscriberId) {
        lock(&self.subscribers).retain(|(sid, _)| *sid != id);
    }
}
