//! Bridge error types

use thiserror::Error;

use crate::types::ChannelState;

/// Errors surfaced synchronously on the public command/lifecycle surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// A main-grid index outside 0..=63 was used to build a pad identity.
    #[error("unsupported main-grid pad index: {index}")]
    InvalidPadIdentity { index: u8 },

    /// A color intensity outside 0..=3 was passed to the encoder.
    #[error("color intensity out of range: red={red}, green={green} (each must be 0..=3)")]
    InvalidColorIntensity { red: u8, green: u8 },

    /// A command or stop call was made while the channel was stopped.
    #[error("{channel} channel is not running")]
    ChannelNotRunning { channel: &'static str },

    /// `start()` was called on a channel that is already running.
    #[error("{channel} channel is already running")]
    ChannelAlreadyRunning { channel: &'static str },
}

impl BridgeError {
    /// Build the lifecycle usage error matching an observed channel state.
    pub(crate) fn lifecycle(channel: &'static str, actual: ChannelState) -> Self {
        match actual {
            ChannelState::Running => BridgeError::ChannelAlreadyRunning { channel },
            ChannelState::Stopped => BridgeError::ChannelNotRunning { channel },
        }
    }
}

/// Transport-level I/O failures.
///
/// Fatal to the owning channel only: the worker records the fault, flips the
/// channel to `Stopped`, and exits. Nothing here terminates the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("USB error: {0}")]
    Usb(String),

    #[error("device disconnected")]
    Disconnected,

    #[error("short bulk write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("no suitable bulk endpoint pair on interface {interface}")]
    NoBulkEndpoints { interface: u8 },
}

impl From<rusb::Error> for ChannelError {
    fn from(e: rusb::Error) -> Self {
        match e {
            rusb::Error::NoDevice => ChannelError::Disconnected,
            other => ChannelError::Usb(other.to_string()),
        }
    }
}

/// Decode failures internal to the receive path.
///
/// Subscribers never see these as anything other than "no event for that
/// span": the scanner drops the record and resynchronizes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Grid arithmetic on the address byte yielded out-of-range coordinates.
    #[error("address byte 0x{raw:02X} does not normalize to a grid pad")]
    MalformedAddress { raw: u8 },

    /// The record's state byte would read past the end of the buffer.
    #[error("record truncated at end of read buffer")]
    TruncatedRecord,
}
