//! Incremental parsing of the inbound byte stream into pad events.
//!
//! Input arrives in arbitrarily-sized, arbitrarily-boundaried bulk reads.
//! The grammar is a sequence of records:
//!
//! ```text
//! record := [type_byte]? address_byte state_byte
//! state_byte == 0x7F  => pressed
//! state_byte != 0x7F  => released
//! ```
//!
//! The type byte is only present when the record category changes, so the
//! scanner carries a persistent mode across calls: a mode byte seen in one
//! read governs every following record until the next type byte, including
//! records in later reads.

use tracing::{debug, warn};

use crate::protocol::{self, wire};
use crate::types::{PadEvent, PadIdentity, RightPad, TopPad};

/// Interpretation context for address bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Addresses resolve against the top-strip set.
    ControlTop,
    /// Addresses resolve against the right-strip set, then the grid.
    Pad,
    /// Bookkeeping state after a right-strip record. Scans exactly like
    /// [`ScanMode::Pad`]; kept distinct because the wire shares one type
    /// byte between right-strip and grid records.
    ControlRight,
}

impl ScanMode {
    fn is_control_top(self) -> bool {
        matches!(self, ScanMode::ControlTop)
    }
}

/// Stateful scanner over inbound read buffers.
///
/// One instance lives for the lifetime of a receive worker; its mode
/// persists across reads. Malformed spans never abort the scan: the record
/// is dropped and the scanner resynchronizes at the next type byte.
#[derive(Debug)]
pub struct RecordScanner {
    mode: ScanMode,
}

impl Default for RecordScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordScanner {
    /// New scanner in the initial mode.
    ///
    /// Starts in `Pad` mode: a stream that opens without a type byte is
    /// interpreted as grid/right-strip records, matching device behavior.
    pub fn new() -> Self {
        Self {
            mode: ScanMode::Pad,
        }
    }

    /// Current interpretation mode.
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Scan one read buffer, returning every complete record in order.
    ///
    /// A record whose state byte falls past the end of `buf` is dropped;
    /// re-assembly across reads is not attempted because bulk reads are
    /// packet-aligned in practice.
    pub fn scan(&mut self, buf: &[u8]) -> Vec<PadEvent> {
        let mut events = Vec::new();
        let n = buf.len();
        let mut i = 0;

        while i < n {
            // Optional type byte; updates the persistent mode.
            if buf[i] == wire::TYPE_CONTROL_TOP {
                self.mode = ScanMode::ControlTop;
                i += 1;
            } else if buf[i] == wire::TYPE_PAD {
                self.mode = ScanMode::Pad;
                i += 1;
            }
            if i >= n {
                // Trailing type byte: the mode carries into the next read.
                break;
            }

            let address = buf[i];
            if self.mode.is_control_top() {
                match TopPad::from_address(address) {
                    Some(pad) => {
                        let Some(&state) = buf.get(i + 1) else {
                            debug!("dropping truncated top-control record at end of buffer");
                            break;
                        };
                        events.push(PadEvent {
                            pad: pad.into(),
                            pressed: state == wire::PRESSED,
                        });
                        i += 2;
                    }
                    None => {
                        // The device grammar leaves this case undefined.
                        // Fail closed: drop the byte and resynchronize at
                        // the next type byte rather than guess a fallback.
                        warn!(
                            "unmatched address 0x{address:02X} in top-control mode, resyncing"
                        );
                        i = resync(buf, i + 1);
                    }
                }
            } else if let Some(pad) = RightPad::from_address(address) {
                let Some(&state) = buf.get(i + 1) else {
                    debug!("dropping truncated right-control record at end of buffer");
                    break;
                };
                self.mode = ScanMode::ControlRight;
                events.push(PadEvent {
                    pad: pad.into(),
                    pressed: state == wire::PRESSED,
                });
                i += 2;
            } else {
                match protocol::grid_index(address) {
                    Ok(index) => {
                        let Some(&state) = buf.get(i + 1) else {
                            debug!("dropping truncated grid record at end of buffer");
                            break;
                        };
                        self.mode = ScanMode::Pad;
                        events.push(PadEvent {
                            pad: PadIdentity::Grid(index),
                            pressed: state == wire::PRESSED,
                        });
                        i += 2;
                    }
                    Err(e) => {
                        warn!("dropping malformed record ({e}), resyncing");
                        i = resync(buf, i + 1);
                    }
                }
            }
        }

        events
    }
}

/// Advance to the next type-identifier byte at or after `from`.
fn resync(buf: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < buf.len() && buf[i] != wire::TYPE_CONTROL_TOP && buf[i] != wire::TYPE_PAD {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(pad: PadIdentity) -> PadEvent {
        PadEvent { pad, pressed: true }
    }

    fn release(pad: PadIdentity) -> PadEvent {
        PadEvent {
            pad,
            pressed: false,
        }
    }

    #[test]
    fn grid_press_then_release() {
        let mut scanner = RecordScanner::new();
        let events = scanner.scan(&[0x90, 0, 127, 1, 0]);
        assert_eq!(
            events,
            vec![
                press(PadIdentity::Grid(0)),
                release(PadIdentity::Grid(1)),
            ]
        );
    }

    #[test]
    fn mode_persists_across_reads() {
        let mut scanner = RecordScanner::new();
        let first = scanner.scan(&[0xB0, TopPad::Left.address(), 127]);
        assert_eq!(first, vec![press(TopPad::Left.into())]);

        // No type byte in the second read: still top-control
        let second = scanner.scan(&[TopPad::Right.address(), 127]);
        assert_eq!(second, vec![press(TopPad::Right.into())]);
    }

    #[test]
    fn trailing_type_byte_carries_mode() {
        let mut scanner = RecordScanner::new();
        assert!(scanner.scan(&[0xB0]).is_empty());
        assert_eq!(scanner.mode(), ScanMode::ControlTop);

        let events = scanner.scan(&[TopPad::Session.address(), 0]);
        assert_eq!(events, vec![release(TopPad::Session.into())]);
    }

    #[test]
    fn truncated_record_is_dropped_without_event() {
        let mut scanner = RecordScanner::new();
        // Address byte present, state byte missing
        assert!(scanner.scan(&[0x90, 0]).is_empty());
    }

    #[test]
    fn right_strip_matches_before_grid() {
        let mut scanner = RecordScanner::new();
        // 0x08 is Vol, not a grid pad
        let events = scanner.scan(&[0x90, 0x08, 127]);
        assert_eq!(events, vec![press(RightPad::Vol.into())]);
        assert_eq!(scanner.mode(), ScanMode::ControlRight);

        // A grid record after a right-strip record needs no fresh type byte
        let events = scanner.scan(&[0x00, 127]);
        assert_eq!(events, vec![press(PadIdentity::Grid(0))]);
    }

    #[test]
    fn collision_byte_resolves_by_mode() {
        // 0x68 is Up in top-control mode and Solo in pad mode
        let mut scanner = RecordScanner::new();
        let events = scanner.scan(&[0xB0, 0x68, 127]);
        assert_eq!(events, vec![press(TopPad::Up.into())]);

        let events = scanner.scan(&[0x90, 0x68, 127]);
        assert_eq!(events, vec![press(RightPad::Solo.into())]);
    }

    #[test]
    fn malformed_grid_address_resyncs_at_next_type_byte() {
        let mut scanner = RecordScanner::new();
        // 0x7F normalizes to line 7 / column 15: malformed. The scanner
        // must skip to the 0x90 and still decode the following record.
        let events = scanner.scan(&[0x90, 0x7F, 127, 0x90, 0x02, 127]);
        assert_eq!(events, vec![press(PadIdentity::Grid(2))]);
    }

    #[test]
    fn top_control_no_match_fails_closed() {
        let mut scanner = RecordScanner::new();
        // 0x05 is not a top-strip address; drop and resync, then the 0xB0
        // record decodes normally.
        let events = scanner.scan(&[0xB0, 0x05, 127, 0xB0, 0x68, 127]);
        assert_eq!(events, vec![press(TopPad::Up.into())]);
    }

    #[test]
    fn starts_in_pad_mode_without_type_byte() {
        let mut scanner = RecordScanner::new();
        let events = scanner.scan(&[0x11, 127]);
        assert_eq!(events, vec![press(PadIdentity::Grid(9))]);
    }

    #[test]
    fn interleaved_modes_in_one_buffer() {
        let mut scanner = RecordScanner::new();
        let events = scanner.scan(&[
            0x90, 0x00, 127, // grid 0 down
            0xB0, 0x6F, 127, // Mixer down
            0x6E, 0, // User2 up, mode still top-control
            0x90, 0x78, 127, // Arm down
        ]);
        assert_eq!(
            events,
            vec![
                press(PadIdentity::Grid(0)),
                press(TopPad::Mixer.into()),
                release(TopPad::User2.into()),
                press(RightPad::Arm.into()),
            ]
        );
    }
}
