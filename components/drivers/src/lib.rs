//! Device Drivers - Concrete implementations of the HAL capability traits
//!
//! # Purpose
//! Collection of drivers the kernel bootstrap can bind at boot:
//! - [`null`]: one do-nothing driver per device class, used when a board has
//!   no real binding for a class (or the board is unknown)
//! - [`sim`]: simulated devices with real behaviour, used on the host
//!   simulation board and in tests
//!
//! # Integration Points
//! - Depends on: `edgeos-hal` capability traits
//! - Provides to: Kernel bootstrap (driver catalog)
//!
//! # Testing Strategy
//! - Unit tests: driver behaviour in each module

pub mod null;
pub mod ring_buffer;
pub mod sim;

pub use null::{NullAnalog, NullBus, NullFusion, NullMotion, NullSerial};
pub use ring_buffer::{BufferFull, RingBuffer};
pub use sim::{
    ComplementaryFilter, LoopbackBus, LoopbackSerial, SimulatedAdc, SimulatedAxis, Workspace,
};

use edgeos_hal::{DeviceClass, Driver};

/// Build the null driver for `class`
pub fn null_driver(class: DeviceClass) -> Driver {
    match class {
        DeviceClass::Motion => Driver::motion(NullMotion),
        DeviceClass::DigitalBus => Driver::digital_bus(NullBus),
        DeviceClass::AnalogIo => Driver::analog_io(NullAnalog),
        DeviceClass::SerialBus => Driver::serial_bus(NullSerial),
        DeviceClass::SensorFusion => Driver::sensor_fusion(NullFusion),
    }
}
