//! Protocol constants and address arithmetic for the Launchpad wire format.
//!
//! Output packets are exactly 3 bytes: `[type_id, address, color]`. Input
//! arrives as repeating records `[type_id]? address state`, where the type
//! byte is optional because the device only resends it when the record
//! category changes (see [`crate::event_parser`]).

use crate::error::DecodeError;

/// Wire type identifiers and record constants
pub mod wire {
    /// Leading byte of a top-control record.
    pub const TYPE_CONTROL_TOP: u8 = 0xB0;

    /// Leading byte shared by right-control and main-grid records.
    ///
    /// The sharing is intentional on the wire: right-strip buttons are
    /// distinguished from grid pads by address, not by type, which is why
    /// decoding scans the right-control address set before falling back to
    /// grid arithmetic.
    pub const TYPE_PAD: u8 = 0x90;

    /// State byte of a press record; anything else is a release.
    pub const PRESSED: u8 = 0x7F;

    /// Every output packet is this long.
    pub const COMMAND_LEN: usize = 3;
}

/// Device identification constants
///
/// Consumed by whatever performs discovery upstream — the bridge itself only
/// ever sees an opened handle.
pub mod device {
    /// Novation vendor ID
    pub const VENDOR_ID: u16 = 0x1235;
    /// Launchpad product ID
    pub const PRODUCT_ID: u16 = 0x000E;
    /// Vendor-specific device class
    pub const DEVICE_CLASS: u8 = 0xFF;
    /// Device subclass
    pub const DEVICE_SUBCLASS: u8 = 0x00;
    /// Device protocol
    pub const DEVICE_PROTOCOL: u8 = 0xFF;

    /// Check whether descriptor fields identify a supported Launchpad.
    pub fn is_supported(vid: u16, pid: u16, class: u8, subclass: u8, protocol: u8) -> bool {
        vid == VENDOR_ID
            && pid == PRODUCT_ID
            && class == DEVICE_CLASS
            && subclass == DEVICE_SUBCLASS
            && protocol == DEVICE_PROTOCOL
    }
}

/// Device addresses of the eight top-strip buttons, in strip order.
pub const TOP_ADDRESSES: [u8; 8] = [0x68, 0x69, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F];

/// Device addresses of the eight right-strip buttons, in strip order.
///
/// Note the collision with [`TOP_ADDRESSES`]: 0x68 is both the top-strip
/// Up arrow and the right-strip Solo button. The reverse mapping is only
/// unambiguous given the scanner mode, which always wins (a byte matched in
/// CONTROL_TOP mode is Up; in PAD mode it is Solo).
pub const RIGHT_ADDRESSES: [u8; 8] = [0x08, 0x18, 0x28, 0x38, 0x48, 0x58, 0x68, 0x78];

/// Number of pads in the main grid.
pub const GRID_SIZE: u8 = 64;

/// Device address of a main-grid pad.
///
/// Callers validate `index < 64`; the top nibble carries the row.
pub fn grid_address(index: u8) -> u8 {
    (index / 8) * 16 + index % 8
}

/// Normalize a raw address byte back to a main-grid index.
///
/// `line = raw / 16`, `column = raw % 16`. Column values 8..15 are strip
/// aliases, not grid pads, so they fail rather than fold into the grid.
pub fn grid_index(raw: u8) -> Result<u8, DecodeError> {
    let line = raw / 16;
    let column = raw % 16;
    if line > 7 || column > 7 {
        return Err(DecodeError::MalformedAddress { raw });
    }
    Ok(line * 8 + column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_addresses_round_trip() {
        for index in 0..GRID_SIZE {
            assert_eq!(grid_index(grid_address(index)), Ok(index));
        }
    }

    #[test]
    fn strip_alias_column_is_malformed() {
        // Column 8 of any row is a right-strip alias, not a grid pad
        assert_eq!(
            grid_index(0x08),
            Err(DecodeError::MalformedAddress { raw: 0x08 })
        );
        // Row 8+ is off the grid entirely
        assert_eq!(
            grid_index(0x80),
            Err(DecodeError::MalformedAddress { raw: 0x80 })
        );
        assert_eq!(
            grid_index(0xFF),
            Err(DecodeError::MalformedAddress { raw: 0xFF })
        );
    }

    #[test]
    fn top_and_right_strips_collide_on_0x68() {
        assert!(TOP_ADDRESSES.contains(&0x68));
        assert!(RIGHT_ADDRESSES.contains(&0x68));
    }
}
