//! Protocol bridge for the Novation Launchpad pad grid over USB bulk transfer.
//!
//! The Launchpad is an 8×8 pressure pad matrix plus two auxiliary control
//! strips (eight buttons along the top, eight along the right edge),
//! addressed over a vendor-class bulk endpoint pair. This crate turns that
//! byte stream into a typed surface:
//!
//! - outbound: logical light/unlight commands encoded into 3-byte packets
//!   and pumped by a dedicated send worker
//! - inbound: raw reads incrementally parsed into press/release events and
//!   broadcast to every registered subscriber
//!
//! ```text
//! [UsbBulkChannel]          ← implements BulkChannel (raw bulk I/O)
//!        |
//!   [Connection]            ← owns SendChannel + ReceiveChannel
//!        |
//! [EventDispatcher] → sinks
//! ```
//!
//! Device discovery and the permission handshake are out of scope: the
//! caller hands [`Connection`] an already-opened channel handle.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event_parser;
pub mod protocol;
pub mod receive_channel;
pub mod send_channel;
pub mod types;
pub mod usb;

pub use connection::{Connection, ConnectionConfig};
pub use dispatcher::{BroadcastSink, DeliveryMode, EventDispatcher, FnSink, PadEventSink};
pub use error::{BridgeError, ChannelError, DecodeError};
pub use event_parser::{RecordScanner, ScanMode};
pub use receive_channel::ReceiveChannel;
pub use send_channel::SendChannel;
pub use types::{
    ChannelState, Command, DeviceInfo, PadColor, PadEvent, PadIdentity, RightPad, TopPad,
};
pub use usb::UsbBulkChannel;

use std::sync::Arc;
use std::time::Duration;

/// The raw bulk-transfer channel both workers drive.
///
/// Implementations wrap an already-opened device handle. The handle is
/// assumed safe for one concurrent writer plus one concurrent reader; the
/// send and receive workers never share a call.
pub trait BulkChannel: Send + Sync {
    /// Write one complete packet to the output endpoint.
    ///
    /// A short write is an error — command packets are never split.
    fn write(&self, data: &[u8]) -> Result<(), ChannelError>;

    /// Blocking read from the input endpoint into `buf`.
    ///
    /// Returns the number of bytes read; `Ok(0)` means the timeout elapsed
    /// with no data. The timeout bounds how long a stop request can go
    /// unnoticed by the receive worker.
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, ChannelError>;

    /// Maximum packet size of the input endpoint, in bytes.
    ///
    /// Sizes the receive worker's read buffer.
    fn max_packet_size(&self) -> usize;

    /// Identification of the device behind the channel.
    fn device_info(&self) -> &DeviceInfo;
}

/// Type alias for a shared boxed channel
pub type BoxedChannel = Arc<dyn BulkChannel>;
