//! Board discovery among the host's serial ports.
//!
//! A [`Selector`] is one discovery context: it enumerates the host's ports
//! once when created, then hands out Sessions for matching USB ports, first
//! match wins. Ports it already handed out are remembered and never handed
//! out again by the same selector. Sessions own their port outright, so they
//! stay valid after the selector is dropped.
//!
//! The claimed-port bookkeeping is not synchronized. Concurrent discovery
//! should use one selector per thread.
//!
//! **Example** - Acquiring the first board with a known USB identity:
//! ```no_run
//! use oppcom::Selector;
//!
//! let mut selector = Selector::new()?.with_identity_filter(0x1234, 0x5678);
//! let mut session = selector.acquire()?;
//! println!("serial number: {:#010x}", session.get_serial_number()?);
//! # Ok::<(), oppcom::Error>(())
//! ```

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    str::FromStr,
};

use log::{debug, info, warn};
use serialport::{SerialPortInfo, SerialPortType};

use crate::{
    error::{Error, Result},
    session::Session,
    settings::Settings,
    transport::Transport,
    utils::SystemPorts,
};

// =============================================================================
// Public Interface
// =============================================================================

/// A USB (vendor id, product id) pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UsbIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}
impl UsbIdentity {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        UsbIdentity {
            vendor_id,
            product_id,
        }
    }

    /// The identity of `port`, or `None` if it is not a USB port.
    pub fn of(port: &SerialPortInfo) -> Option<Self> {
        match &port.port_type {
            SerialPortType::UsbPort(info) => Some(UsbIdentity::new(info.vid, info.pid)),
            _ => None,
        }
    }
}
impl fmt::Display for UsbIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}
impl FromStr for UsbIdentity {
    type Err = Error;

    /// Parse `vvvv:pppp`, both parts in hex with an optional `0x` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidIdentity(s.into());
        let hex = |part: &str| {
            let part = part.trim();
            let digits = part
                .strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part);
            u16::from_str_radix(digits, 16).map_err(|_| invalid())
        };
        let mut parts = s.splitn(2, ':');
        match (parts.next(), parts.next()) {
            (Some(vendor), Some(product)) => Ok(UsbIdentity::new(hex(vendor)?, hex(product)?)),
            _ => Err(invalid()),
        }
    }
}

/// Source of serial ports for a [`Selector`].
pub trait PortProvider {
    type Port: Transport;

    /// List all serial ports on the host, in a stable order.
    fn enumerate(&self) -> Result<Vec<SerialPortInfo>>;

    /// Open `port`. The returned transport is not configured yet.
    fn open(&self, port: &SerialPortInfo, settings: &Settings) -> Result<Self::Port>;
}

/// Finds and claims boards among the ports enumerated at creation time.
pub struct Selector<P: PortProvider = SystemPorts> {
    provider: P,
    settings: Settings,
    ports: Vec<SerialPortInfo>,
    identities: BTreeSet<UsbIdentity>,
    claimed: HashSet<usize>,
}

impl Selector<SystemPorts> {
    /// Enumerate the host's serial ports, using the default settings for the
    /// sessions.
    pub fn new() -> Result<Self> {
        Self::with_settings(Settings::default())
    }

    /// Enumerate the host's serial ports, using `settings` for the sessions.
    pub fn with_settings(settings: Settings) -> Result<Self> {
        Self::with_provider(SystemPorts, settings)
    }
}

impl<P: PortProvider> Selector<P> {
    /// Enumerate the ports of `provider`.
    pub fn with_provider(provider: P, settings: Settings) -> Result<Self> {
        let ports = provider.enumerate()?;
        debug!("{} serial ports found", ports.len());
        Ok(Selector {
            provider,
            settings,
            ports,
            identities: BTreeSet::new(),
            claimed: HashSet::new(),
        })
    }

    /// Only accept USB ports with this identity. Can be repeated to accept
    /// several identities. Without any filter, every USB port is accepted.
    pub fn with_identity_filter(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.identities
            .insert(UsbIdentity::new(vendor_id, product_id));
        self
    }

    /// The ports enumerated when this selector was created.
    pub fn ports(&self) -> &[SerialPortInfo] {
        &self.ports
    }

    /// Whether a port with `identity` passes the identity filters.
    pub fn accepts(&self, identity: &UsbIdentity) -> bool {
        self.identities.is_empty() || self.identities.contains(identity)
    }

    /// Open a session on the first unclaimed USB port passing the identity
    /// filters, in enumeration order.
    ///
    /// A matching port that fails to open is skipped and stays unclaimed. If
    /// no port could be opened but some matched, the error of the last one
    /// that failed is returned instead of `DeviceNotFound`.
    pub fn acquire(&mut self) -> Result<Session<P::Port>> {
        let mut last_error = None;
        for (index, port) in self.ports.iter().enumerate() {
            if self.claimed.contains(&index) {
                continue;
            }
            let identity = match UsbIdentity::of(port) {
                Some(identity) => identity,
                None => {
                    debug!("{}: not a USB port, skipped", port.port_name);
                    continue;
                }
            };
            if !self.accepts(&identity) {
                debug!("{}: {} not accepted, skipped", port.port_name, identity);
                continue;
            }

            let session = self
                .provider
                .open(port, &self.settings)
                .and_then(|transport| Session::open(transport, &self.settings));
            match session {
                Ok(session) => {
                    info!("{}: board {} selected", port.port_name, identity);
                    self.claimed.insert(index);
                    return Ok(session);
                }
                Err(e) => {
                    warn!("{}: {}", port.port_name, e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            return Err(e);
        }
        Err(Error::DeviceNotFound {
            scanned: self.ports.len(),
            filters: self.identities.len(),
        })
    }
}

impl<P: PortProvider> fmt::Debug for Selector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("ports", &self.ports)
            .field("identities", &self.identities)
            .field("claimed", &self.claimed)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
