//! The serial line capability consumed by a [`Session`](crate::Session).
//!
//! A transport is one open serial line. Sessions configure it, then use
//! blocking reads and writes bounded by a timeout. Dropping the transport
//! closes the line.

use std::{
    io,
    time::{Duration, Instant},
};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

// =============================================================================
// Public Interface
// =============================================================================

/// One configuration step applied to a serial line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LineSetting {
    BaudRate(u32),
    DataBits(DataBits),
    Parity(Parity),
    StopBits(StopBits),
    FlowControl(FlowControl),
}
impl LineSetting {
    /// Human readable name of the setting, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            LineSetting::BaudRate(_) => "baud rate",
            LineSetting::DataBits(_) => "data bits",
            LineSetting::Parity(_) => "parity",
            LineSetting::StopBits(_) => "stop bits",
            LineSetting::FlowControl(_) => "flow control",
        }
    }
}

/// A configurable serial line with blocking, timeout bounded I/O.
pub trait Transport {
    /// The port name, if the line has one.
    fn name(&self) -> Option<String>;

    /// Apply one line setting.
    fn apply(&mut self, setting: LineSetting) -> serialport::Result<()>;

    /// Read until `buf` is full or `timeout` has elapsed, returning the number
    /// of bytes read. Running out of time is not an error.
    fn blocking_read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write until all of `buf` is sent or `timeout` has elapsed, returning
    /// the number of bytes written. Running out of time is not an error.
    fn blocking_write(&mut self, buf: &[u8], timeout: Duration) -> io::Result<usize>;
}

impl Transport for Box<dyn SerialPort> {
    fn name(&self) -> Option<String> {
        SerialPort::name(&**self)
    }

    fn apply(&mut self, setting: LineSetting) -> serialport::Result<()> {
        let port: &mut dyn SerialPort = &mut **self;
        match setting {
            LineSetting::BaudRate(baud_rate) => port.set_baud_rate(baud_rate),
            LineSetting::DataBits(data_bits) => port.set_data_bits(data_bits),
            LineSetting::Parity(parity) => port.set_parity(parity),
            LineSetting::StopBits(stop_bits) => port.set_stop_bits(stop_bits),
            LineSetting::FlowControl(flow_control) => port.set_flow_control(flow_control),
        }
    }

    fn blocking_read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let port: &mut dyn SerialPort = &mut **self;
        let deadline = Instant::now() + timeout;
        let mut done = 0;
        while done < buf.len() {
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if remaining > Duration::from_millis(0) => remaining,
                _ => break,
            };
            port.set_timeout(remaining)?;
            match port.read(&mut buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(done)
    }

    fn blocking_write(&mut self, buf: &[u8], timeout: Duration) -> io::Result<usize> {
        let port: &mut dyn SerialPort = &mut **self;
        let deadline = Instant::now() + timeout;
        let mut done = 0;
        while done < buf.len() {
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if remaining > Duration::from_millis(0) => remaining,
                _ => break,
            };
            port.set_timeout(remaining)?;
            match port.write(&buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(done)
    }
}
