//! Subscriber registry and broadcast of decoded pad events.
//!
//! The dispatcher models "anything that can receive a [`PadEvent`]" as the
//! [`PadEventSink`] capability. Delivery strategy is an explicit choice made
//! at construction, not an accident of locking:
//!
//! - [`DeliveryMode::InLock`] broadcasts while holding the registry lock
//!   (a slow sink delays registry mutations and the next read)
//! - [`DeliveryMode::Snapshot`] clones the registry under the lock and
//!   invokes outside it
//!
//! Either way, every subscriber registered at publish time sees every event,
//! in the order it was decoded: there is exactly one publisher (the receive
//! worker) and sinks are invoked synchronously on it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::PadEvent;

/// Capability: receive decoded pad events.
///
/// Invoked synchronously on the receive worker; implementations that block
/// hold up the whole receive path.
pub trait PadEventSink: Send + Sync {
    fn on_pad_event(&self, event: &PadEvent);
}

/// How `publish` traverses the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Invoke sinks while holding the registry lock.
    #[default]
    InLock,
    /// Snapshot the registry under the lock, invoke outside it.
    Snapshot,
}

/// Thread-safe sink registry with synchronous broadcast.
pub struct EventDispatcher {
    sinks: Mutex<Vec<Arc<dyn PadEventSink>>>,
    mode: DeliveryMode,
}

impl EventDispatcher {
    pub fn new(mode: DeliveryMode) -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
            mode,
        }
    }

    /// Register a sink. Returns false if this exact sink (by identity) is
    /// already registered.
    pub fn subscribe(&self, sink: Arc<dyn PadEventSink>) -> bool {
        let mut sinks = self.sinks.lock();
        if sinks.iter().any(|s| Arc::ptr_eq(s, &sink)) {
            return false;
        }
        sinks.push(sink);
        true
    }

    /// Remove a previously registered sink. Returns false if it was absent.
    pub fn unsubscribe(&self, sink: &Arc<dyn PadEventSink>) -> bool {
        let mut sinks = self.sinks.lock();
        match sinks.iter().position(|s| Arc::ptr_eq(s, sink)) {
            Some(pos) => {
                sinks.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.lock().is_empty()
    }

    /// Broadcast one event to every registered sink, in registration order.
    pub fn publish(&self, event: &PadEvent) {
        match self.mode {
            DeliveryMode::InLock => {
                let sinks = self.sinks.lock();
                for sink in sinks.iter() {
                    sink.on_pad_event(event);
                }
            }
            DeliveryMode::Snapshot => {
                let snapshot: Vec<_> = self.sinks.lock().clone();
                for sink in snapshot {
                    sink.on_pad_event(event);
                }
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DeliveryMode::default())
    }
}

/// Closure adapter implementing [`PadEventSink`].
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: Fn(&PadEvent) + Send + Sync,
{
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self(f))
    }
}

impl<F> PadEventSink for FnSink<F>
where
    F: Fn(&PadEvent) + Send + Sync,
{
    fn on_pad_event(&self, event: &PadEvent) {
        self.0(event);
    }
}

/// Sink that fans events out over a tokio broadcast channel, for async
/// consumers that would rather `recv().await` than implement a sink.
pub struct BroadcastSink {
    tx: broadcast::Sender<PadEvent>,
}

impl BroadcastSink {
    /// Create the sink together with an initial receiver.
    pub fn new(capacity: usize) -> (Arc<Self>, broadcast::Receiver<PadEvent>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Arc::new(Self { tx }), rx)
    }

    /// Subscribe another receiver to the same stream.
    pub fn subscribe(&self) -> broadcast::Receiver<PadEvent> {
        self.tx.subscribe()
    }
}

impl PadEventSink for BroadcastSink {
    fn on_pad_event(&self, event: &PadEvent) {
        // A send with no live receivers is fine; lagged receivers see
        // RecvError::Lagged on their side.
        if self.tx.send(*event).is_err() {
            debug!("pad event dropped: no broadcast receivers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PadIdentity;
    use parking_lot::Mutex as PlMutex;

    struct Collector(PlMutex<Vec<PadEvent>>);

    impl Collector {
        fn new() -> Arc<Self> {
            Arc::new(Self(PlMutex::new(Vec::new())))
        }
    }

    impl PadEventSink for Collector {
        fn on_pad_event(&self, event: &PadEvent) {
            self.0.lock().push(*event);
        }
    }

    fn event(index: u8) -> PadEvent {
        PadEvent {
            pad: PadIdentity::Grid(index),
            pressed: true,
        }
    }

    #[test]
    fn duplicate_subscription_is_rejected() {
        let dispatcher = EventDispatcher::default();
        let sink = Collector::new();
        assert!(dispatcher.subscribe(sink.clone()));
        assert!(!dispatcher.subscribe(sink.clone()));
        assert_eq!(dispatcher.len(), 1);

        let as_dyn: Arc<dyn PadEventSink> = sink;
        assert!(dispatcher.unsubscribe(&as_dyn));
        assert!(!dispatcher.unsubscribe(&as_dyn));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn publish_reaches_all_sinks_in_order() {
        for mode in [DeliveryMode::InLock, DeliveryMode::Snapshot] {
            let dispatcher = EventDispatcher::new(mode);
            let a = Collector::new();
            let b = Collector::new();
            dispatcher.subscribe(a.clone());
            dispatcher.subscribe(b.clone());

            dispatcher.publish(&event(1));
            dispatcher.publish(&event(2));

            assert_eq!(*a.0.lock(), vec![event(1), event(2)]);
            assert_eq!(*b.0.lock(), vec![event(1), event(2)]);
        }
    }

    #[test]
    fn unsubscribed_sink_stops_receiving() {
        let dispatcher = EventDispatcher::default();
        let sink = Collector::new();
        dispatcher.subscribe(sink.clone());
        dispatcher.publish(&event(1));

        let as_dyn: Arc<dyn PadEventSink> = sink.clone();
        dispatcher.unsubscribe(&as_dyn);
        dispatcher.publish(&event(2));

        assert_eq!(*sink.0.lock(), vec![event(1)]);
    }
}
