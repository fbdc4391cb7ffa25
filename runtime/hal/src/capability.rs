//! Capability traits
//!
//! One minimal operation contract per [`DeviceClass`]. Every operation either
//! completes within a bounded time or reports a [`DriverError`]; nothing here
//! assumes success.
//!
//! All methods take `&self` so that readers of the registry can invoke
//! drivers concurrently. Drivers keep mutable state behind their own locks.

use core::fmt;

use crate::device::DeviceClass;
use crate::error::{DriverError, DriverResult};

/// Lifecycle shared by every driver
///
/// The registry calls `start` before a new driver is inserted and
/// `shutdown` right before it is dropped.
pub trait DriverLifecycle: Send + Sync {
    /// Start the driver (begin operations)
    fn start(&self) -> DriverResult<()> {
        Ok(())
    }

    /// Shutdown the driver (release the device)
    fn shutdown(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// Motion control: a positioner with three axes
pub trait MotionControl: DriverLifecycle {
    /// Current position as (x, y, z)
    fn position(&self) -> DriverResult<(f64, f64, f64)>;

    /// Command a move to an absolute position
    fn move_to(&self, x: f64, y: f64, z: f64) -> DriverResult<()>;

    /// Stop all motion immediately
    fn emergency_stop(&self) -> DriverResult<()>;

    /// Human-readable status line
    fn status(&self) -> DriverResult<String>;
}

/// Field bus protocol spoken by a [`DigitalBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusProtocol {
    /// CAN 2.0B (29-bit ids, 8-byte payloads)
    Can,
    /// Modbus RTU/TCP
    Modbus,
    /// EtherCAT
    EtherCat,
}

impl fmt::Display for BusProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusProtocol::Can => "can",
            BusProtocol::Modbus => "modbus",
            BusProtocol::EtherCat => "ethercat",
        })
    }
}

/// A frame sent or received on a digital bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusFrame {
    /// Frame / slave / register id, protocol dependent
    pub id: u32,

    /// Frame payload
    pub payload: Vec<u8>,
}

impl BusFrame {
    /// Create a frame from an id and payload bytes
    pub fn new(id: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self { id, payload: payload.into() }
    }
}

/// Digital field bus (CAN / Modbus / EtherCAT style)
pub trait DigitalBus: DriverLifecycle {
    /// Protocol spoken on this bus
    fn protocol(&self) -> BusProtocol;

    /// Send a frame
    fn send(&self, id: u32, payload: &[u8]) -> DriverResult<()>;

    /// Receive the next pending frame, if any
    fn receive(&self) -> DriverResult<Option<BusFrame>>;

    /// Description of the most recent bus error, if any
    fn last_error(&self) -> Option<String>;
}

/// Analog inputs (and optionally outputs)
pub trait AnalogIo: DriverLifecycle {
    /// Number of channels
    fn channels(&self) -> u8;

    /// Sample a channel (volts)
    fn read(&self, channel: u8) -> DriverResult<f32>;

    /// Drive an output channel (volts)
    fn write(&self, _channel: u8, _value: f32) -> DriverResult<()> {
        Err(DriverError::Unsupported("analog output"))
    }
}

/// Byte-oriented serial bus (UART / I2C / SPI style)
pub trait SerialBus: DriverLifecycle {
    /// Transmit a single byte
    fn send(&self, byte: u8) -> DriverResult<()>;

    /// Receive a single byte, if one is pending
    fn receive(&self) -> DriverResult<Option<u8>>;

    /// Full-duplex style transfer
    ///
    /// Default implementation sends every byte of `out`, then drains at most
    /// `out.len()` received bytes.
    fn transfer(&self, out: &[u8]) -> DriverResult<Vec<u8>> {
        for &byte in out {
            self.send(byte)?;
        }

        let mut received = Vec::with_capacity(out.len());
        while received.len() < out.len() {
            match self.receive()? {
                Some(byte) => received.push(byte),
                None => break,
            }
        }
        Ok(received)
    }
}

/// Sensor fusion: turns an input vector into an output vector
pub trait SensorFusion: DriverLifecycle {
    /// Expected input vector length
    fn input_len(&self) -> usize;

    /// Produced output vector length
    fn output_len(&self) -> usize;

    /// Run one fusion step
    fn process(&self, input: &[f32]) -> DriverResult<Vec<f32>>;
}

/// A type-erased driver instance
///
/// The variant fixes the device class, so a handle's class can never change
/// after construction.
pub enum Driver {
    Motion(Box<dyn MotionControl>),
    DigitalBus(Box<dyn DigitalBus>),
    AnalogIo(Box<dyn AnalogIo>),
    SerialBus(Box<dyn SerialBus>),
    SensorFusion(Box<dyn SensorFusion>),
}

impl Driver {
    /// Wrap a motion driver
    pub fn motion(driver: impl MotionControl + 'static) -> Self {
        Driver::Motion(Box::new(driver))
    }

    /// Wrap a digital bus driver
    pub fn digital_bus(driver: impl DigitalBus + 'static) -> Self {
        Driver::DigitalBus(Box::new(driver))
    }

    /// Wrap an analog I/O driver
    pub fn analog_io(driver: impl AnalogIo + 'static) -> Self {
        Driver::AnalogIo(Box::new(driver))
    }

    /// Wrap a serial bus driver
    pub fn serial_bus(driver: impl SerialBus + 'static) -> Self {
        Driver::SerialBus(Box::new(driver))
    }

    /// Wrap a sensor fusion driver
    pub fn sensor_fusion(driver: impl SensorFusion + 'static) -> Self {
        Driver::SensorFusion(Box::new(driver))
    }

    /// Class implemented by this driver
    pub fn class(&self) -> DeviceClass {
        match self {
            Driver::Motion(_) => DeviceClass::Motion,
            Driver::DigitalBus(_) => DeviceClass::DigitalBus,
            Driver::AnalogIo(_) => DeviceClass::AnalogIo,
            Driver::SerialBus(_) => DeviceClass::SerialBus,
            Driver::SensorFusion(_) => DeviceClass::SensorFusion,
        }
    }

    /// Start the driver, regardless of class
    pub fn start(&self) -> DriverResult<()> {
        match self {
            Driver::Motion(d) => d.start(),
            Driver::DigitalBus(d) => d.start(),
            Driver::AnalogIo(d) => d.start(),
            Driver::SerialBus(d) => d.start(),
            Driver::SensorFusion(d) => d.start(),
        }
    }

    /// Shut the driver down, regardless of class
    pub fn shutdown(&self) -> DriverResult<()> {
        match self {
            Driver::Motion(d) => d.shutdown(),
            Driver::DigitalBus(d) => d.shutdown(),
            Driver::AnalogIo(d) => d.shutdown(),
            Driver::SerialBus(d) => d.shutdown(),
            Driver::SensorFusion(d) => d.shutdown(),
        }
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Driver").field(&self.class()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spin::Mutex;
    use std::collections::VecDeque;

    /// Serial mock that echoes every byte back
    struct EchoSerial {
        rx: Mutex<VecDeque<u8>>,
    }

    impl DriverLifecycle for EchoSerial {}

    impl SerialBus for EchoSerial {
        fn send(&self, byte: u8) -> DriverResult<()> {
            self.rx.lock().push_back(byte);
            Ok(())
        }

        fn receive(&self) -> DriverResult<Option<u8>> {
            Ok(self.rx.lock().pop_front())
        }
    }

    struct InputOnly;

    impl DriverLifecycle for InputOnly {}

    impl AnalogIo for InputOnly {
        fn channels(&self) -> u8 {
            1
        }

        fn read(&self, _channel: u8) -> DriverResult<f32> {
            Ok(1.5)
        }
    }

    #[test]
    fn test_default_transfer_echoes() {
        let serial = EchoSerial { rx: Mutex::new(VecDeque::new()) };
        assert_eq!(serial.transfer(b"ping").unwrap(), b"ping".to_vec());
        assert_eq!(serial.receive().unwrap(), None);
    }

    #[test]
    fn test_default_analog_write_unsupported() {
        let adc = InputOnly;
        assert_eq!(adc.read(0).unwrap(), 1.5);
        assert!(matches!(adc.write(0, 1.0), Err(DriverError::Unsupported(_))));
    }

    #[test]
    fn test_driver_class_follows_variant() {
        let driver = Driver::analog_io(InputOnly);
        assert_eq!(driver.class(), DeviceClass::AnalogIo);
        assert!(driver.start().is_ok());
        assert!(driver.shutdown().is_ok());
        assert_eq!(format!("{:?}", driver), "Driver(AnalogIo)");
    }
}
