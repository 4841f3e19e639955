//! Serial port enumeration and opening on the host.

use log::debug;
use serialport::{available_ports, SerialPort, SerialPortInfo, SerialPortType};

use crate::{
    error::{Error, Result},
    selector::PortProvider,
    settings::Settings,
};

//==============================================================================
// Public Interface
//==============================================================================

/// The host's serial ports, as reported by the operating system.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemPorts;

impl PortProvider for SystemPorts {
    type Port = Box<dyn SerialPort>;

    fn enumerate(&self) -> Result<Vec<SerialPortInfo>> {
        enumerate_ports()
    }

    fn open(&self, port: &SerialPortInfo, settings: &Settings) -> Result<Self::Port> {
        open_port(&port.port_name, settings)
    }
}

/// List all serial ports on the host.
pub fn enumerate_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = available_ports().map_err(Error::Enumeration)?;
    for p in &ports {
        debug!("found {}", describe_port(p));
    }
    Ok(ports)
}

/// One line description of a port, with the USB details when there are some.
pub fn describe_port(port: &SerialPortInfo) -> String {
    match &port.port_type {
        // USB ports give us more info about the connected serial controller
        SerialPortType::UsbPort(info) => format!(
            "{}: {:04x}:{:04x} ({} / {})",
            port.port_name,
            info.vid,
            info.pid,
            info.manufacturer.as_ref().map_or("", String::as_str),
            info.product.as_ref().map_or("", String::as_str)
        ),
        SerialPortType::PciPort => format!("{}: PCI", port.port_name),
        SerialPortType::BluetoothPort => format!("{}: Bluetooth", port.port_name),
        SerialPortType::Unknown => port.port_name.clone(),
    }
}

//==============================================================================
// Crate-Public Interface
//==============================================================================

/// Open the port at `path`. The line settings are passed to the open call and
/// applied again by [`Session::open`](crate::Session::open).
pub(crate) fn open_port(path: &str, settings: &Settings) -> Result<Box<dyn SerialPort>> {
    debug!("Opening port {}", path);
    serialport::new(path, settings.baud_rate)
        .data_bits(settings.data_bits)
        .stop_bits(settings.stop_bits)
        .parity(settings.parity)
        .flow_control(settings.flow_control)
        .timeout(settings.timeout)
        .open()
        .map_err(|source| Error::TransportOpen {
            port: path.into(),
            source,
        })
}

//==============================================================================
// Unit Tests
//==============================================================================
