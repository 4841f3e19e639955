//! Frame codec for the OPP wire protocol.
//!
//! Requests and replies share the same fixed 8-byte layout:
//!
//! ```text
//!  offset  0        1       2 .. 5     6          7
//!         +--------+------+----------+----------+------------+
//!         | family | code | payload  | checksum | terminator |
//!         +--------+------+----------+----------+------------+
//! ```
//!
//! The payload is big-endian. The checksum is a CRC-8 (polynomial `0x07`,
//! initial value `0xFF`, no reflection, no final XOR) over bytes `0..6`. The
//! terminator is always `0xFF` on the wire.

use std::fmt;

use crate::error::{Error, Result};

/// Length of every frame on the wire.
pub const FRAME_LEN: usize = 8;

/// Value of the last byte of every frame.
pub const TERMINATOR: u8 = 0xFF;

const CRC8_POLY: u8 = 0x07;
const CRC8_INIT: u8 = 0xFF;

/// CRC-8 transition table: `CRC8_TABLE[x]` is the CRC of byte `x` starting
/// from an accumulator of zero.
static CRC8_TABLE: [u8; 256] = crc8_table();

const fn crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

// =============================================================================
// Public Interface
// =============================================================================

/// Compute the CRC-8 of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(CRC8_INIT, |acc, byte| CRC8_TABLE[(acc ^ byte) as usize])
}

/// Write the checksum of `frame[..N-2]` into `frame[N-2]`.
///
/// The terminator in `frame[N-1]` is left untouched. Frames shorter than two
/// bytes have no room for a checksum and are left unchanged.
pub fn stamp(frame: &mut [u8]) {
    if let Some(at) = frame.len().checked_sub(2) {
        frame[at] = checksum(&frame[..at]);
    }
}

/// Check that `frame[N-2]` holds the checksum of `frame[..N-2]`.
pub fn verify(frame: &[u8]) -> bool {
    match frame.len().checked_sub(2) {
        Some(at) => checksum(&frame[..at]) == frame[at],
        None => false,
    }
}

/// The two leading bytes of a frame selecting the operation on the board.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Command {
    pub family: u8,
    pub code: u8,
}
impl Command {
    /// Read the board's 32 bit serial number.
    pub const GET_SERIAL_NUMBER: Command = Command::new(0x20, 0x02);

    pub const fn new(family: u8, code: u8) -> Self {
        Command { family, code }
    }
}
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} {:#04x}", self.family, self.code)
    }
}

/// One 8-byte protocol frame.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Build a request frame with a valid checksum and terminator.
    pub fn request(command: Command, payload: u32) -> Self {
        let p = payload.to_be_bytes();
        let mut bytes = [
            command.family,
            command.code,
            p[0],
            p[1],
            p[2],
            p[3],
            0x00,
            TERMINATOR,
        ];
        stamp(&mut bytes);
        Frame(bytes)
    }

    /// Wrap raw bytes received from the wire without validating them.
    pub fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Frame(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn command(&self) -> Command {
        Command::new(self.0[0], self.0[1])
    }

    pub fn payload(&self) -> u32 {
        u32::from_be_bytes([self.0[2], self.0[3], self.0[4], self.0[5]])
    }

    pub fn checksum(&self) -> u8 {
        self.0[FRAME_LEN - 2]
    }

    pub fn terminator(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }

    /// Validate this frame as the reply to `expected` and return its payload.
    ///
    /// The echoed command is checked before the checksum, so a reply for the
    /// wrong command is reported as such whatever its checksum. The
    /// terminator is not checked.
    pub fn decode_reply(&self, expected: Command) -> Result<u32> {
        let actual = self.command();
        if actual != expected {
            return Err(Error::UnexpectedReply { expected, actual });
        }
        if !verify(&self.0) {
            return Err(Error::Checksum {
                expected: checksum(&self.0[..FRAME_LEN - 2]),
                actual: self.checksum(),
            });
        }
        Ok(self.payload())
    }
}
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:#04x}", byte)?;
        }
        write!(f, ")")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn table_matches_known_entries() {
        assert_eq!(CRC8_TABLE[0x00], 0x00);
        assert_eq!(CRC8_TABLE[0x01], 0x07);
        assert_eq!(CRC8_TABLE[0x40], 0xc7);
        assert_eq!(CRC8_TABLE[0x80], 0x89);
        assert_eq!(CRC8_TABLE[0xff], 0xf3);
    }

    #[test]
    fn checksum_of_empty_input_is_initial_value() {
        assert_eq!(checksum(b""), 0xff);
    }

    #[test]
    fn checksum_known_values() {
        assert_eq!(checksum(&[0u8; 6]), 0xaf);
        assert_eq!(checksum(&[0x20, 0x02, 0x00, 0x00, 0x00, 0x00]), 0x50);
        assert_eq!(checksum(&[0x20, 0x02, 0x00, 0x00, 0x00, 0x2a]), 0x86);
        assert_eq!(checksum(b"123456789"), 0xfb);
    }

    #[test]
    fn checksum_is_order_sensitive() {
        assert_ne!(checksum(&[0x01, 0x02]), checksum(&[0x02, 0x01]));
    }

    #[test]
    fn serial_number_request_layout() {
        let frame = Frame::request(Command::GET_SERIAL_NUMBER, 0);
        assert_eq!(
            frame.as_bytes(),
            &[0x20, 0x02, 0x00, 0x00, 0x00, 0x00, 0x50, 0xff]
        );
    }

    #[test]
    fn payload_is_big_endian() {
        let frame = Frame::request(Command::new(0x10, 0x01), 0x1234_5678);
        assert_eq!(&frame.as_bytes()[2..6], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(frame.payload(), 0x1234_5678);
    }

    #[test]
    fn stamp_leaves_terminator_alone() {
        let mut bytes = [0x20, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x42];
        stamp(&mut bytes);
        assert_eq!(bytes[6], 0x50);
        assert_eq!(bytes[7], 0x42);
    }

    #[test]
    fn too_short_frames_never_verify() {
        assert!(!verify(&[]));
        assert!(!verify(&[0xff]));
        let mut one = [0x12];
        stamp(&mut one);
        assert_eq!(one, [0x12]);
    }

    #[test]
    fn decode_checks_echo_before_checksum() {
        let mut bytes = [0x21, 0x02, 0x00, 0x00, 0x00, 0x2a, 0x00, 0xff];
        stamp(&mut bytes);
        let err = Frame::from_bytes(bytes)
            .decode_reply(Command::GET_SERIAL_NUMBER)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedReply { .. }));

        bytes[6] ^= 0xff;
        let err = Frame::from_bytes(bytes)
            .decode_reply(Command::GET_SERIAL_NUMBER)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedReply { .. }));
    }

    #[test]
    fn decode_reports_both_checksums() {
        let bytes = [0x20, 0x02, 0x00, 0x00, 0x00, 0x2a, 0x13, 0xff];
        match Frame::from_bytes(bytes).decode_reply(Command::GET_SERIAL_NUMBER) {
            Err(Error::Checksum { expected, actual }) => {
                assert_eq!(expected, 0x86);
                assert_eq!(actual, 0x13);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn debug_shows_hex_bytes() {
        let frame = Frame::request(Command::GET_SERIAL_NUMBER, 0);
        assert_eq!(
            format!("{:?}", frame),
            "Frame(0x20 0x02 0x00 0x00 0x00 0x00 0x50 0xff)"
        );
    }

    proptest! {
        #[test]
        fn stamped_frames_verify(content in any::<[u8; 6]>(), terminator in any::<u8>()) {
            let mut bytes = [0u8; FRAME_LEN];
            bytes[..6].copy_from_slice(&content);
            bytes[7] = terminator;
            stamp(&mut bytes);
            prop_assert!(verify(&bytes));
        }

        #[test]
        fn single_bit_errors_are_detected(
            content in any::<[u8; 6]>(),
            byte in 0usize..6,
            bit in 0u8..8,
        ) {
            let mut bytes = [0u8; FRAME_LEN];
            bytes[..6].copy_from_slice(&content);
            bytes[7] = TERMINATOR;
            stamp(&mut bytes);
            bytes[byte] ^= 1 << bit;
            prop_assert!(!verify(&bytes));
        }

        #[test]
        fn requests_round_trip(
            family in any::<u8>(),
            code in any::<u8>(),
            payload in any::<u32>(),
        ) {
            let command = Command::new(family, code);
            let frame = Frame::request(command, payload);
            prop_assert_eq!(frame.terminator(), TERMINATOR);
            prop_assert_eq!(frame.decode_reply(command).ok(), Some(payload));
        }
    }
}
