//! Driver handles
//!
//! A [`DriverHandle`] binds one type-erased [`Driver`] to its identity. Only
//! the registry creates handles, and it never gives them away: callers see
//! them through short-lived references.

use crate::capability::{AnalogIo, DigitalBus, Driver, MotionControl, SensorFusion, SerialBus};
use crate::device::{DeviceAddress, DeviceClass, DeviceId};

/// Registration request: who the new device is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Class the driver must implement
    pub class: DeviceClass,

    /// Name for logs and debugging
    pub name: String,

    /// Platform address of the device
    pub address: DeviceAddress,

    /// Caller-chosen id; `None` lets the registry assign one
    pub fixed_id: Option<DeviceId>,
}

impl DeviceDescriptor {
    /// Descriptor named after its class, at a virtual address
    pub fn new(class: DeviceClass) -> Self {
        Self {
            class,
            name: class.name().into(),
            address: DeviceAddress::Virtual,
            fixed_id: None,
        }
    }

    /// Set the device name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the platform address
    pub fn at(mut self, address: DeviceAddress) -> Self {
        self.address = address;
        self
    }

    /// Request a fixed id
    pub fn with_id(mut self, id: DeviceId) -> Self {
        self.fixed_id = Some(id);
        self
    }
}

/// A registered driver and its identity
#[derive(Debug)]
pub struct DriverHandle {
    id: DeviceId,
    name: String,
    address: DeviceAddress,
    driver: Driver,
}

impl DriverHandle {
    pub(crate) fn new(id: DeviceId, name: String, address: DeviceAddress, driver: Driver) -> Self {
        Self { id, name, address, driver }
    }

    /// Registry-assigned id
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Device class (fixed by the driver variant)
    pub fn class(&self) -> DeviceClass {
        self.driver.class()
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform address
    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// The type-erased driver
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Motion capability, if this is a motion device
    pub fn as_motion(&self) -> Option<&dyn MotionControl> {
        match &self.driver {
            Driver::Motion(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    /// Digital bus capability, if this is a bus device
    pub fn as_digital_bus(&self) -> Option<&dyn DigitalBus> {
        match &self.driver {
            Driver::DigitalBus(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    /// Analog I/O capability, if this is an analog device
    pub fn as_analog(&self) -> Option<&dyn AnalogIo> {
        match &self.driver {
            Driver::AnalogIo(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    /// Serial bus capability, if this is a serial device
    pub fn as_serial(&self) -> Option<&dyn SerialBus> {
        match &self.driver {
            Driver::SerialBus(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    /// Sensor fusion capability, if this is a fusion device
    pub fn as_fusion(&self) -> Option<&dyn SensorFusion> {
        match &self.driver {
            Driver::SensorFusion(d) => Some(d.as_ref()),
            _ => None,
        }
    }
}
