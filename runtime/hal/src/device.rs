//! Device identity
//!
//! Classes, ids and platform addresses that make up the identity of a
//! registered driver.

use core::fmt;
use core::str::FromStr;

use crate::error::UnknownClass;

/// Category of hardware capability
///
/// Each class maps to exactly one capability trait in [`crate::capability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DeviceClass {
    /// Motion control (axes, arms, gantries)
    Motion,
    /// Field bus (CAN, Modbus, EtherCAT)
    DigitalBus,
    /// Analog inputs and outputs (ADC/DAC)
    AnalogIo,
    /// Byte-oriented serial bus (UART, I2C, SPI)
    SerialBus,
    /// Sensor fusion processing
    SensorFusion,
}

impl DeviceClass {
    /// Every class, in declaration order
    pub const ALL: [DeviceClass; 5] = [
        DeviceClass::Motion,
        DeviceClass::DigitalBus,
        DeviceClass::AnalogIo,
        DeviceClass::SerialBus,
        DeviceClass::SensorFusion,
    ];

    /// Stable lowercase name, used in logs and configuration
    pub const fn name(self) -> &'static str {
        match self {
            DeviceClass::Motion => "motion",
            DeviceClass::DigitalBus => "digital-bus",
            DeviceClass::AnalogIo => "analog-io",
            DeviceClass::SerialBus => "serial-bus",
            DeviceClass::SensorFusion => "sensor-fusion",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceClass {
    type Err = UnknownClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceClass::ALL
            .iter()
            .copied()
            .find(|class| class.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownClass(s.into()))
    }
}

/// Identifier of a registered driver
///
/// Unique within one registry. Ids from two different registries are not
/// comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Wrap a raw id (for caller-supplied fixed ids)
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// Where a device lives on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceAddress {
    /// Memory-mapped register block
    Mmio { base: usize, size: usize },

    /// Address on a shared bus (bus index, device address)
    Bus { bus: u8, address: u16 },

    /// I/O port base (x86)
    Port(u16),

    /// No physical address (simulated or dummy device)
    #[default]
    Virtual,
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAddress::Mmio { base, size } => write!(f, "mmio {:#x}+{:#x}", base, size),
            DeviceAddress::Bus { bus, address } => write!(f, "bus{}:{:#04x}", bus, address),
            DeviceAddress::Port(port) => write!(f, "port {:#x}", port),
            DeviceAddress::Virtual => f.write_str("virtual"),
        }
    }
}
