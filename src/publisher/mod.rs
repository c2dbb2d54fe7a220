//! Fan-out of changed records to live subscribers.
//!
//! Every publish is offered to the sinks registered at that moment, one
//! non-blocking delivery per sink. A sink that is full or closing loses that
//! message and nothing else; there is no replay for late subscribers.

use crate::error::DeliveryError;
use crate::record::Record;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Serialized record as sent to subscribers
pub type Message = Arc<str>;

/// Per-subscriber buffer used by [`Publisher::subscribe`]
pub const DEFAULT_SINK_CAPACITY: usize = 256;

/// Delivery endpoint for one connected client.
///
/// `deliver` must not block: it either hands the message over or fails.
pub trait Sink: Send + Sync {
    fn deliver(&self, message: Message) -> Result<(), DeliveryError>;
}

/// Sink backed by a bounded channel; the transport reads the other end
pub struct ChannelSink {
    tx: mpsc::Sender<Message>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }
}

impl Sink for ChannelSink {
    fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Opaque registration handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SinkHandle(Uuid);

impl SinkHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Registration returned by [`Publisher::subscribe`]
pub struct Subscription {
    handle: SinkHandle,
    rx: mpsc::Receiver<Message>,
}

impl Subscription {
    pub fn handle(&self) -> SinkHandle {
        self.handle
    }

    /// Next message, or `None` once unsubscribed and drained
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    pub fn into_receiver(self) -> mpsc::Receiver<Message> {
        self.rx
    }
}

/// Outcome of one publish call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Registry of live sinks
pub struct Publisher {
    sinks: DashMap<SinkHandle, Arc<dyn Sink>>,
    capacity: usize,
}

impl Publisher {
    pub fn new(capacity: usize) -> Self {
        Self {
            sinks: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register a channel-backed sink
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let handle = self.attach(Arc::new(ChannelSink::new(tx)));
        Subscription { handle, rx }
    }

    /// Register a transport-provided sink
    pub fn attach(&self, sink: Arc<dyn Sink>) -> SinkHandle {
        let handle = SinkHandle::new();
        self.sinks.insert(handle, sink);
        debug!(subscribers = self.sinks.len(), "Sink attached");
        handle
    }

    /// Remove a sink. Unknown or already removed handles are ignored.
    pub fn unsubscribe(&self, handle: SinkHandle) -> bool {
        let removed = self.sinks.remove(&handle).is_some();
        if removed {
            debug!(subscribers = self.sinks.len(), "Sink detached");
        }
        removed
    }

    /// Drop every sink; channel subscribers see their stream end
    pub fn close_all(&self) {
        self.sinks.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }

    /// Serialize `record` once and offer it to every registered sink
    pub fn publish(&self, record: &Record) -> Result<PublishReport, serde_json::Error> {
        let message: Message = serde_json::to_string(record)?.into();
        Ok(self.publish_message(message))
    }

    /// Offer an already serialized message to every registered sink
    pub fn publish_message(&self, message: Message) -> PublishReport {
        // Copy the registry first: sinks may come and go while we deliver
        let sinks: Vec<(SinkHandle, Arc<dyn Sink>)> = self
            .sinks
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut report = PublishReport::default();
        for (handle, sink) in sinks {
            match sink.deliver(Arc::clone(&message)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(sink = ?handle, error = %e, "Delivery to subscriber failed");
                }
            }
        }

        report
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_CAPACITY)
    }
}
