//! In-memory transport and port provider used by the unit tests.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io,
    rc::Rc,
    time::Duration,
};

use serialport::{SerialPortInfo, SerialPortType, UsbPortInfo};

use crate::{
    error::{Error, Result},
    frame::{self, FRAME_LEN},
    selector::PortProvider,
    settings::Settings,
    transport::{LineSetting, Transport},
};

/// What the tests can observe about a [`MockTransport`] after handing it over.
#[derive(Default)]
pub(crate) struct Probe {
    pub written: RefCell<Vec<u8>>,
    pub applied: RefCell<Vec<LineSetting>>,
    pub closed: Cell<bool>,
}

pub(crate) struct MockTransport {
    name: String,
    replies: VecDeque<Vec<u8>>,
    reject: Option<&'static str>,
    write_limit: Option<usize>,
    probe: Rc<Probe>,
}
impl MockTransport {
    pub fn new(name: &str) -> Self {
        MockTransport {
            name: name.into(),
            replies: VecDeque::new(),
            reject: None,
            write_limit: None,
            probe: Rc::new(Probe::default()),
        }
    }

    /// Queue the bytes returned by the next blocking read.
    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    /// Reject the line setting with the given name.
    pub fn reject(mut self, setting: &'static str) -> Self {
        self.reject = Some(setting);
        self
    }

    /// Accept at most `limit` bytes per write.
    pub fn write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn probe(&self) -> Rc<Probe> {
        Rc::clone(&self.probe)
    }
}
impl Transport for MockTransport {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn apply(&mut self, setting: LineSetting) -> serialport::Result<()> {
        if self.reject == Some(setting.name()) {
            return Err(serialport::Error::new(
                serialport::ErrorKind::InvalidInput,
                "rejected by mock",
            ));
        }
        self.probe.applied.borrow_mut().push(setting);
        Ok(())
    }

    fn blocking_read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        match self.replies.pop_front() {
            Some(reply) => {
                let n = reply.len().min(buf.len());
                buf[..n].copy_from_slice(&reply[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn blocking_write(&mut self, buf: &[u8], _timeout: Duration) -> io::Result<usize> {
        let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.probe.written.borrow_mut().extend_from_slice(&buf[..n]);
        Ok(n)
    }
}
impl Drop for MockTransport {
    fn drop(&mut self) {
        self.probe.closed.set(true);
    }
}

/// A stamped reply frame echoing `family`/`code` with `payload`.
pub(crate) fn reply_frame(family: u8, code: u8, payload: u32) -> [u8; FRAME_LEN] {
    let p = payload.to_be_bytes();
    let mut bytes = [family, code, p[0], p[1], p[2], p[3], 0x00, 0xff];
    frame::stamp(&mut bytes);
    bytes
}

pub(crate) fn usb_port(name: &str, vid: u16, pid: u16) -> SerialPortInfo {
    SerialPortInfo {
        port_name: name.into(),
        port_type: SerialPortType::UsbPort(UsbPortInfo {
            vid,
            pid,
            serial_number: None,
            manufacturer: None,
            product: None,
        }),
    }
}

pub(crate) fn pci_port(name: &str) -> SerialPortInfo {
    SerialPortInfo {
        port_name: name.into(),
        port_type: SerialPortType::PciPort,
    }
}

/// A port provider over a fixed list of ports.
#[derive(Default)]
pub(crate) struct MockPorts {
    pub ports: Vec<SerialPortInfo>,
    /// Ports that fail to open.
    pub broken: Vec<String>,
    /// Enumeration fails altogether.
    pub unavailable: bool,
    pub opened: RefCell<Vec<String>>,
}
impl MockPorts {
    pub fn new(ports: Vec<SerialPortInfo>) -> Self {
        MockPorts {
            ports,
            ..Default::default()
        }
    }
}
impl PortProvider for MockPorts {
    type Port = MockTransport;

    fn enumerate(&self) -> Result<Vec<SerialPortInfo>> {
        if self.unavailable {
            return Err(Error::Enumeration(serialport::Error::new(
                serialport::ErrorKind::Unknown,
                "no port list",
            )));
        }
        Ok(self.ports.clone())
    }

    fn open(&self, info: &SerialPortInfo, _settings: &Settings) -> Result<MockTransport> {
        if self.broken.contains(&info.port_name) {
            return Err(Error::TransportOpen {
                port: info.port_name.clone(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "busy"),
            });
        }
        self.opened.borrow_mut().push(info.port_name.clone());
        Ok(MockTransport::new(&info.port_name))
    }
}
