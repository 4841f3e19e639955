//! Errors reported by the protocol engine.
//!
//! Every failure is returned to the caller of the operation that detected it
//! and nothing is retried internally. A failed transaction leaves the
//! [`Session`](crate::Session) usable for the next one.

use std::io;

use thiserror::Error;

use crate::frame::Command;

/// Errors that can occur while discovering, opening or talking to a board.
#[derive(Error, Debug)]
pub enum Error {
    /// The host could not produce the list of serial ports.
    #[error("failed to list serial ports: {0}")]
    Enumeration(#[source] serialport::Error),

    /// No unclaimed port matched the identity filters and could be opened.
    #[error("OPP board not found ({scanned} ports scanned, {filters} identity filters)")]
    DeviceNotFound { scanned: usize, filters: usize },

    /// The serial port could not be opened.
    #[error("failed to open serial port `{port}`: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// The transport rejected one of the line settings.
    #[error("failed to set serial port {setting}: {source}")]
    TransportConfig {
        setting: &'static str,
        #[source]
        source: serialport::Error,
    },

    /// Fewer bytes than requested were written before the timeout.
    #[error("failed to send all the data: {written} of {requested} bytes written")]
    PartialWrite { requested: usize, written: usize },

    /// Fewer bytes than a full frame were received before the timeout.
    #[error("failed to receive response: {received} of {expected} bytes read")]
    ShortRead { expected: usize, received: usize },

    /// The reply did not echo the command that was sent.
    #[error("invalid response: expected command {expected}, got {actual}")]
    UnexpectedReply { expected: Command, actual: Command },

    /// The reply checksum byte does not match its content.
    #[error("invalid crc8: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    /// The transport failed for a reason other than a timeout.
    #[error("failed to {operation} data: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// A USB identity string is not in the `vvvv:pppp` hex form.
    #[error("invalid USB identity `{0}`, expected `vvvv:pppp` in hex")]
    InvalidIdentity(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_diagnostic_context() {
        let err = Error::Checksum {
            expected: 0x86,
            actual: 0x00,
        };
        assert_eq!(err.to_string(), "invalid crc8: expected 0x86, got 0x00");

        let err = Error::UnexpectedReply {
            expected: Command::GET_SERIAL_NUMBER,
            actual: Command::new(0x21, 0x02),
        };
        assert_eq!(
            err.to_string(),
            "invalid response: expected command 0x20 0x02, got 0x21 0x02"
        );

        let err = Error::ShortRead {
            expected: 8,
            received: 3,
        };
        assert_eq!(
            err.to_string(),
            "failed to receive response: 3 of 8 bytes read"
        );
    }
}
