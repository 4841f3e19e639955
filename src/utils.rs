//! Helper functions to deal with the host's serial ports.

mod ports;

pub use ports::{describe_port, enumerate_ports, SystemPorts};
pub(crate) use ports::open_port;
