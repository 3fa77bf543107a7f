//! Composition root: one opened channel handle, two workers, one dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::warn;

use crate::dispatcher::{BroadcastSink, DeliveryMode, EventDispatcher, PadEventSink};
use crate::error::BridgeError;
use crate::receive_channel::{ReceiveChannel, DEFAULT_READ_TIMEOUT};
use crate::send_channel::SendChannel;
use crate::types::{Command, PadColor, PadEvent, PadIdentity};
use crate::BulkChannel;

/// Broadcast channel capacity for decoded events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Tunables injected at construction instead of hard-coded in the workers.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Per-read timeout of the receive worker. Bounds stop latency, not the
    /// data itself.
    pub read_timeout: Duration,
    /// How the dispatcher traverses its registry on publish.
    pub delivery: DeliveryMode,
    /// Capacity of the broadcast stream behind [`Connection::events`].
    pub event_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            delivery: DeliveryMode::default(),
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// A live bridge to one opened Launchpad.
///
/// Owns the send and receive channels exclusively for its lifetime. The
/// underlying handle is opened and closed by the caller; the connection
/// never does either.
pub struct Connection {
    channel: Arc<dyn BulkChannel>,
    sender: SendChannel,
    receiver: ReceiveChannel,
    dispatcher: Arc<EventDispatcher>,
    broadcast: Arc<BroadcastSink>,
}

impl Connection {
    pub fn new(channel: Arc<dyn BulkChannel>) -> Self {
        Self::with_config(channel, ConnectionConfig::default())
    }

    pub fn with_config(channel: Arc<dyn BulkChannel>, config: ConnectionConfig) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new(config.delivery));
        let (broadcast, _initial_rx) = BroadcastSink::new(config.event_capacity);
        dispatcher.subscribe(broadcast.clone());

        let sender = SendChannel::new(Arc::clone(&channel));
        let receiver = ReceiveChannel::new(Arc::clone(&channel), Arc::clone(&dispatcher))
            .with_read_timeout(config.read_timeout);

        Self {
            channel,
            sender,
            receiver,
            dispatcher,
            broadcast,
        }
    }

    // === Lifecycle ===

    /// Start the outbound worker.
    pub fn start_sender(&self) -> Result<(), BridgeError> {
        self.sender.start()
    }

    /// Stop the outbound worker, discarding anything still queued.
    pub fn stop_sender(&self) -> Result<(), BridgeError> {
        self.sender.stop()
    }

    /// Start the inbound worker.
    pub fn start_receiver(&self) -> Result<(), BridgeError> {
        self.receiver.start()
    }

    /// Stop the inbound worker, abandoning any partially-scanned bytes.
    pub fn stop_receiver(&self) -> Result<(), BridgeError> {
        self.receiver.stop()
    }

    /// Outbound channel, for state and fault inspection.
    pub fn send_channel(&self) -> &SendChannel {
        &self.sender
    }

    /// Inbound channel, for state and fault inspection.
    pub fn receive_channel(&self) -> &ReceiveChannel {
        &self.receiver
    }

    // === Commands ===

    /// Light a pad. Rejected with [`BridgeError::ChannelNotRunning`] while
    /// the sender is stopped — never silently queued-and-forgotten.
    pub fn light_pad(
        &self,
        pad: impl Into<PadIdentity>,
        color: PadColor,
    ) -> Result<(), BridgeError> {
        self.ensure_sender_running()?;
        let command = Command::light(pad.into(), color)?;
        self.sender.enqueue(command);
        Ok(())
    }

    /// Unlight a pad. Same precondition as [`Connection::light_pad`].
    pub fn clear_pad(&self, pad: impl Into<PadIdentity>) -> Result<(), BridgeError> {
        self.ensure_sender_running()?;
        let command = Command::clear(pad.into())?;
        self.sender.enqueue(command);
        Ok(())
    }

    fn ensure_sender_running(&self) -> Result<(), BridgeError> {
        if !self.sender.is_running() {
            return Err(BridgeError::ChannelNotRunning { channel: "send" });
        }
        Ok(())
    }

    // === Events ===

    /// Register a sink. Legal while the receiver is stopped, but inert until
    /// it runs.
    pub fn subscribe(&self, sink: Arc<dyn PadEventSink>) -> bool {
        if !self.receiver.is_running() {
            warn!("subscribing while the receive channel is stopped: no events will flow yet");
        }
        self.dispatcher.subscribe(sink)
    }

    /// Remove a previously registered sink.
    pub fn unsubscribe(&self, sink: &Arc<dyn PadEventSink>) -> bool {
        self.dispatcher.unsubscribe(sink)
    }

    /// Subscribe to decoded events as an async broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<PadEvent> {
        self.broadcast.subscribe()
    }

    // === Device ===

    /// Human-readable name of the device behind the channel.
    pub fn device_name(&self) -> String {
        self.channel.device_info().name()
    }
}
