//! Common types for the bridge: pad identities, colors, commands, events.

use std::fmt;

use crate::error::BridgeError;
use crate::protocol::{self, wire};

// ---------------------------------------------------------------------------
// Pad identity
// ---------------------------------------------------------------------------

/// One of the eight buttons on the top control strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TopPad {
    Up = 0,
    Down,
    Left,
    Right,
    Session,
    User1,
    User2,
    Mixer,
}

impl TopPad {
    /// All top-strip buttons in strip order.
    pub const ALL: [TopPad; 8] = [
        TopPad::Up,
        TopPad::Down,
        TopPad::Left,
        TopPad::Right,
        TopPad::Session,
        TopPad::User1,
        TopPad::User2,
        TopPad::Mixer,
    ];

    /// Position within the strip, 0..=7.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Raw device address byte.
    pub fn address(self) -> u8 {
        protocol::TOP_ADDRESSES[self as usize]
    }

    /// Match a raw address byte against the enumerated top-strip set.
    pub fn from_address(raw: u8) -> Option<Self> {
        protocol::TOP_ADDRESSES
            .iter()
            .position(|&a| a == raw)
            .map(|i| Self::ALL[i])
    }
}

/// One of the eight buttons on the right control strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RightPad {
    Vol = 0,
    Pan,
    SndA,
    SndB,
    Stop,
    TrkOn,
    Solo,
    Arm,
}

impl RightPad {
    /// All right-strip buttons in strip order.
    pub const ALL: [RightPad; 8] = [
        RightPad::Vol,
        RightPad::Pan,
        RightPad::SndA,
        RightPad::SndB,
        RightPad::Stop,
        RightPad::TrkOn,
        RightPad::Solo,
        RightPad::Arm,
    ];

    /// Position within the strip, 0..=7.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Raw device address byte.
    pub fn address(self) -> u8 {
        protocol::RIGHT_ADDRESSES[self as usize]
    }

    /// Match a raw address byte against the enumerated right-strip set.
    ///
    /// 0x68 matches [`RightPad::Solo`] here and [`TopPad::Up`] in
    /// [`TopPad::from_address`]; callers disambiguate by scanner mode.
    pub fn from_address(raw: u8) -> Option<Self> {
        protocol::RIGHT_ADDRESSES
            .iter()
            .position(|&a| a == raw)
            .map(|i| Self::ALL[i])
    }
}

/// Logical identity of one addressable pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadIdentity {
    /// Top control strip button.
    Top(TopPad),
    /// Right control strip button.
    Right(RightPad),
    /// Main 8×8 grid pad, row-major index 0..=63.
    Grid(u8),
}

impl PadIdentity {
    /// Build a validated main-grid identity.
    pub fn grid(index: u8) -> Result<Self, BridgeError> {
        if index >= protocol::GRID_SIZE {
            return Err(BridgeError::InvalidPadIdentity { index });
        }
        Ok(PadIdentity::Grid(index))
    }

    /// Raw device address byte for this pad.
    ///
    /// The grid check is defensive: `PadIdentity::Grid` can be constructed
    /// with an arbitrary index, so the out-of-range case is rejected here
    /// again before anything reaches the wire.
    pub fn device_address(self) -> Result<u8, BridgeError> {
        match self {
            PadIdentity::Top(pad) => Ok(pad.address()),
            PadIdentity::Right(pad) => Ok(pad.address()),
            PadIdentity::Grid(index) => {
                if index >= protocol::GRID_SIZE {
                    return Err(BridgeError::InvalidPadIdentity { index });
                }
                Ok(protocol::grid_address(index))
            }
        }
    }

    /// Wire type identifier for records addressing this pad.
    ///
    /// Right-strip and grid pads share one type id on the wire.
    pub fn type_id(self) -> u8 {
        match self {
            PadIdentity::Top(_) => wire::TYPE_CONTROL_TOP,
            PadIdentity::Right(_) | PadIdentity::Grid(_) => wire::TYPE_PAD,
        }
    }
}

impl From<TopPad> for PadIdentity {
    fn from(pad: TopPad) -> Self {
        PadIdentity::Top(pad)
    }
}

impl From<RightPad> for PadIdentity {
    fn from(pad: RightPad) -> Self {
        PadIdentity::Right(pad)
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Packed pad color: independent red and green intensities, each 0..=3.
///
/// The wire byte is `red + green * 16`, so the defined palette occupies
/// 0..=51 and byte 0 means "off".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadColor(u8);

impl PadColor {
    /// Both LEDs off.
    pub const OFF: PadColor = PadColor(0);
    /// Full red.
    pub const RED: PadColor = PadColor(3);
    /// Full green.
    pub const GREEN: PadColor = PadColor(48);
    /// Full red + full green.
    pub const AMBER: PadColor = PadColor(51);

    /// Pack independent intensities into one color byte.
    pub fn new(red: u8, green: u8) -> Result<Self, BridgeError> {
        if red > 3 || green > 3 {
            return Err(BridgeError::InvalidColorIntensity { red, green });
        }
        Ok(PadColor(red + green * 16))
    }

    /// The packed wire byte.
    pub fn byte(self) -> u8 {
        self.0
    }

    /// Red intensity, 0..=3.
    pub fn red(self) -> u8 {
        self.0 % 16
    }

    /// Green intensity, 0..=3.
    pub fn green(self) -> u8 {
        self.0 / 16
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One 3-byte output packet, immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    type_id: u8,
    address: u8,
    color: u8,
}

impl Command {
    /// Encode a "light this pad" command.
    pub fn light(pad: PadIdentity, color: PadColor) -> Result<Self, BridgeError> {
        Ok(Command {
            type_id: pad.type_id(),
            address: pad.device_address()?,
            color: color.byte(),
        })
    }

    /// Encode an "unlight this pad" command (color byte 0).
    pub fn clear(pad: PadIdentity) -> Result<Self, BridgeError> {
        Self::light(pad, PadColor::OFF)
    }

    /// Wire image, written as one bulk transfer.
    pub fn to_bytes(self) -> [u8; wire::COMMAND_LEN] {
        [self.type_id, self.address, self.color]
    }
}

// ---------------------------------------------------------------------------
// Decoded event
// ---------------------------------------------------------------------------

/// One decoded press/release event, as handed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadEvent {
    /// Which pad the record addressed.
    pub pad: PadIdentity,
    /// True for press, false for release.
    pub pressed: bool,
}

impl fmt::Display for PadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.pressed { "pressed" } else { "released" };
        match self.pad {
            PadIdentity::Top(pad) => write!(f, "top {pad:?} {state}"),
            PadIdentity::Right(pad) => write!(f, "right {pad:?} {state}"),
            PadIdentity::Grid(index) => write!(f, "grid {index} {state}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a send or receive channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Stopped,
    Running,
}

// ---------------------------------------------------------------------------
// Device info
// ---------------------------------------------------------------------------

/// Identification of the device behind a bulk channel.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// USB vendor ID
    pub vid: u16,
    /// USB product ID
    pub pid: u16,
    /// Manufacturer string if available
    pub manufacturer: Option<String>,
    /// Product string if available
    pub product: Option<String>,
}

impl DeviceInfo {
    /// Human-readable device name: `vid:pid - manufacturer - product`.
    pub fn name(&self) -> String {
        format!(
            "{:04x}:{:04x} - {} - {}",
            self.vid,
            self.pid,
            self.manufacturer.as_deref().unwrap_or("?"),
            self.product.as_deref().unwrap_or("?")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_packing_is_injective_over_domain() {
        let mut seen = std::collections::HashSet::new();
        for red in 0..=3 {
            for green in 0..=3 {
                let color = PadColor::new(red, green).unwrap();
                assert!(seen.insert(color.byte()), "duplicate byte for {red},{green}");
                assert_eq!(color.red(), red);
                assert_eq!(color.green(), green);
            }
        }
        assert_eq!(PadColor::new(0, 0).unwrap(), PadColor::OFF);
        assert_eq!(PadColor::new(3, 3).unwrap().byte(), 51);
    }

    #[test]
    fn color_rejects_out_of_range_intensity() {
        assert_eq!(
            PadColor::new(4, 0),
            Err(BridgeError::InvalidColorIntensity { red: 4, green: 0 })
        );
        assert_eq!(
            PadColor::new(0, 255),
            Err(BridgeError::InvalidColorIntensity { red: 0, green: 255 })
        );
    }

    #[test]
    fn grid_identity_validates_index() {
        assert!(PadIdentity::grid(63).is_ok());
        assert_eq!(
            PadIdentity::grid(64),
            Err(BridgeError::InvalidPadIdentity { index: 64 })
        );
        // Defensive check on a raw out-of-range Grid value
        assert_eq!(
            PadIdentity::Grid(200).device_address(),
            Err(BridgeError::InvalidPadIdentity { index: 200 })
        );
    }

    #[test]
    fn type_id_is_shared_by_right_and_grid() {
        assert_eq!(PadIdentity::Top(TopPad::Up).type_id(), 0xB0);
        assert_eq!(PadIdentity::Right(RightPad::Vol).type_id(), 0x90);
        assert_eq!(PadIdentity::Grid(0).type_id(), 0x90);
    }

    #[test]
    fn light_and_clear_encode_three_bytes() {
        let lit = Command::light(PadIdentity::Grid(9), PadColor::AMBER).unwrap();
        assert_eq!(lit.to_bytes(), [0x90, 0x11, 51]);

        let top = Command::light(TopPad::Mixer.into(), PadColor::RED).unwrap();
        assert_eq!(top.to_bytes(), [0xB0, 0x6F, 3]);

        // clear is idempotent: two clears encode identically
        let a = Command::clear(PadIdentity::Grid(5)).unwrap();
        let b = Command::clear(PadIdentity::Grid(5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_bytes()[2], 0);
    }

    #[test]
    fn strip_addresses_round_trip() {
        for pad in TopPad::ALL {
            assert_eq!(TopPad::from_address(pad.address()), Some(pad));
        }
        for pad in RightPad::ALL {
            assert_eq!(RightPad::from_address(pad.address()), Some(pad));
        }
        assert_eq!(TopPad::from_address(0x00), None);
        assert_eq!(RightPad::from_address(0x00), None);
    }
}
