//! Settings related to the serial line and the request/reply transactions.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::transport::LineSetting;

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings related to the serial port used to talk to the board
/// and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path. When set, discovery is
    /// skipped and this port is used directly.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,
    /// How long a blocking read or write may take before giving up.
    pub timeout: Duration,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}
impl Settings {
    /// The line settings in the order they are applied when a session opens.
    pub fn line(&self) -> [LineSetting; 5] {
        [
            LineSetting::BaudRate(self.baud_rate),
            LineSetting::DataBits(self.data_bits),
            LineSetting::Parity(self.parity),
            LineSetting::StopBits(self.stop_bits),
            LineSetting::FlowControl(self.flow_control),
        ]
    }
}
impl Default for Settings {
    fn default() -> Self {
        SettingsBuilder::new().finalize()
    }
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set. The defaults are what the board expects: 115200 baud, 8N1,
/// no flow control and a 10 ms transfer timeout.
///
/// **Example**
///
/// ```
/// use oppcom::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().path("/dev/ttyACM0").finalize();
/// assert_eq!(settings.baud_rate, 115_200);
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                baud_rate: 115_200,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                timeout: Duration::from_millis(10),
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().as_ref().to_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Set the timeout applied to each blocking read and write
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_millis(10),
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyACM0").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyACM0");
}

#[test]
fn baud_rate() {
    let baud_rate = 9_600;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn parity() {
    let parity = Parity::Even;
    let settings = SettingsBuilder::new().parity(parity).finalize();
    assert_eq!(settings.parity, parity);
}

#[test]
fn timeout() {
    let timeout = Duration::from_millis(250);
    let settings = SettingsBuilder::new().timeout(timeout).finalize();
    assert_eq!(settings.timeout, timeout);
}

#[test]
fn line_settings_order() {
    let names: Vec<&str> = Settings::default()
        .line()
        .iter()
        .map(LineSetting::name)
        .collect();
    assert_eq!(
        names,
        ["baud rate", "data bits", "parity", "stop bits", "flow control"]
    );
}
