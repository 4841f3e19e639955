//! A live, configured binding to one board.
//!
//! A [`Session`] owns its serial line from the moment it is configured until
//! it is closed or dropped. Each command is one transaction: a request frame
//! is written, then exactly one reply frame is read and validated. Taking
//! `&mut self` for every transaction guarantees that at most one is in flight
//! per session.
//!
//! **Example** - Reading the serial number of a board on a known port:
//! ```no_run
//! use oppcom::{Session, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().finalize();
//! let mut session = Session::connect("/dev/ttyACM0", &settings)?;
//! println!("serial number: {:#010x}", session.get_serial_number()?);
//! # Ok::<(), oppcom::Error>(())
//! ```

use std::{fmt, time::Duration};

use hexplay::HexViewBuilder;
use log::{debug, info, log_enabled, trace, Level::Trace};
use serialport::SerialPort;

use crate::{
    error::{Error, Result},
    frame::{Command, Frame, FRAME_LEN, TERMINATOR},
    settings::Settings,
    transport::Transport,
    utils::open_port,
};

// =============================================================================
// Public Interface
// =============================================================================

pub struct Session<T: Transport = Box<dyn SerialPort>> {
    port: T,
    name: String,
    timeout: Duration,
}

impl Session<Box<dyn SerialPort>> {
    /// Open the host serial port at `path` and configure it.
    pub fn connect(path: &str, settings: &Settings) -> Result<Self> {
        let port = open_port(path, settings)?;
        Session::open(port, settings)
    }
}

impl<T: Transport> Session<T> {
    /// Configure `port` with the line settings and take ownership of it.
    ///
    /// If any setting is rejected, the port is dropped, and therefore closed,
    /// before the error is returned.
    pub fn open(mut port: T, settings: &Settings) -> Result<Self> {
        let name = port.name().unwrap_or_else(|| "<unnamed>".into());
        for setting in settings.line().iter() {
            port.apply(*setting)
                .map_err(|source| Error::TransportConfig {
                    setting: setting.name(),
                    source,
                })?;
        }
        info!("Connected to {} at {} baud", name, settings.baud_rate);
        debug!("data_bits    : {:#?}", settings.data_bits);
        debug!("stop_bits    : {:#?}", settings.stop_bits);
        debug!("parity       : {:#?}", settings.parity);
        debug!("flow control : {:#?}", settings.flow_control);

        Ok(Session {
            port,
            name,
            timeout: settings.timeout,
        })
    }

    /// Name of the port this session is bound to.
    pub fn port_name(&self) -> &str {
        &self.name
    }

    /// Read the board's serial number.
    pub fn get_serial_number(&mut self) -> Result<u32> {
        self.transact(Command::GET_SERIAL_NUMBER, 0)
    }

    /// Run one transaction: send `command` with `payload`, then return the
    /// payload of the reply.
    ///
    /// The reply must be a full frame, echo `command` and carry a valid
    /// checksum. Any failure aborts this transaction only; the session can
    /// still be used afterwards.
    pub fn transact(&mut self, command: Command, payload: u32) -> Result<u32> {
        let request = Frame::request(command, payload);
        self.send(&request)?;
        let reply = self.receive()?;
        if reply.terminator() != TERMINATOR {
            debug!(
                "reply terminator is {:#04x} instead of {:#04x}, ignored",
                reply.terminator(),
                TERMINATOR
            );
        }
        reply.decode_reply(command)
    }

    /// Release the port. Dropping the session has the same effect.
    pub fn close(self) {}
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        info!("Closing {}", self.name);
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("port", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// =============================================================================
// Private stuff
// =============================================================================

impl<T: Transport> Session<T> {
    fn send(&mut self, request: &Frame) -> Result<()> {
        let bytes = request.as_bytes();
        trace!("writing {:?}", request);
        dump(bytes);

        let written = self
            .port
            .blocking_write(bytes, self.timeout)
            .map_err(|source| Error::Io {
                operation: "write",
                source,
            })?;
        if written < bytes.len() {
            return Err(Error::PartialWrite {
                requested: bytes.len(),
                written,
            });
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<Frame> {
        let mut bytes = [0u8; FRAME_LEN];
        let received = self
            .port
            .blocking_read(&mut bytes, self.timeout)
            .map_err(|source| Error::Io {
                operation: "read",
                source,
            })?;
        trace!("read {} bytes", received);
        dump(&bytes[..received]);

        if received < FRAME_LEN {
            return Err(Error::ShortRead {
                expected: FRAME_LEN,
                received,
            });
        }
        Ok(Frame::from_bytes(bytes))
    }
}

/// Dump the frame bytes in a hex table for debugging
fn dump(bytes: &[u8]) {
    if log_enabled!(Trace) && !bytes.is_empty() {
        let view = HexViewBuilder::new(bytes)
            .address_offset(0)
            .row_width(16)
            .finish();
        trace!("\n{}", view);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
