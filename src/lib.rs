//! Oppcom talks to an OPP board over its USB serial line.
//!
//! The board speaks a strictly synchronous request/reply protocol made of
//! fixed 8-byte frames, each protected by a CRC-8 checksum. There is only ever
//! one transaction in flight: a request frame is written and exactly one reply
//! frame is read back before anything else happens on the line.
//!
//! The crate is organized in three layers:
//!
//! * The **frame codec** ([`frame`]) computes, stamps and verifies checksums
//!   and lays out request frames.
//! * A **session** ([`Session`]) owns one configured serial line and exposes
//!   typed commands such as [`Session::get_serial_number`], each being one
//!   send-then-receive transaction.
//! * A **selector** ([`Selector`]) enumerates the host's serial ports, keeps
//!   the USB ones passing its identity filters and hands out a session for the
//!   first one it has not already handed out.
//!
//! The serial line itself is abstracted by the [`Transport`] trait and the
//! port list by the [`PortProvider`] trait, both implemented for the host
//! through [`serialport`].
//!
//! Every failure is reported as an [`Error`] to the caller of the operation
//! that detected it. Nothing is retried internally; the caller decides whether
//! to try again.
//!
//! **Example** - Reading the serial number of the first board found:
//! ```no_run
//! let mut selector = oppcom::Selector::new()?;
//! let mut board = selector.acquire()?;
//! println!("serial number: {:#010x}", board.get_serial_number()?);
//! # Ok::<(), oppcom::Error>(())
//! ```

pub mod frame;

mod error;
mod selector;
mod session;
mod settings;
mod transport;
mod utils;

#[cfg(test)]
mod mock;

pub use error::{Error, Result};
pub use frame::{Command, Frame};
pub use selector::{PortProvider, Selector, UsbIdentity};
pub use session::Session;
pub use settings::{DataBits, FlowControl, Parity, Settings, SettingsBuilder, StopBits};
pub use transport::{LineSetting, Transport};
pub use utils::{describe_port, enumerate_ports, SystemPorts};
