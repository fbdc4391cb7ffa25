//! Null drivers (no hardware)
//!
//! Do-nothing implementations for every device class. They are bound when a
//! platform has no real driver for a class, so the rest of the system can
//! keep running against a well-typed device.
//!
//! Every operation succeeds; inputs are ignored.

use edgeos_hal::{
    AnalogIo, BusFrame, BusProtocol, DigitalBus, DriverLifecycle, DriverResult, MotionControl,
    SensorFusion, SerialBus,
};

/// Motion driver parked at the origin
pub struct NullMotion;

impl DriverLifecycle for NullMotion {}

impl MotionControl for NullMotion {
    fn position(&self) -> DriverResult<(f64, f64, f64)> {
        Ok((0.0, 0.0, 0.0))
    }

    fn move_to(&self, _x: f64, _y: f64, _z: f64) -> DriverResult<()> {
        Ok(())
    }

    fn emergency_stop(&self) -> DriverResult<()> {
        Ok(())
    }

    fn status(&self) -> DriverResult<String> {
        Ok("null motion (no hardware)".into())
    }
}

/// Bus driver that discards frames and never receives
pub struct NullBus;

impl DriverLifecycle for NullBus {}

impl DigitalBus for NullBus {
    fn protocol(&self) -> BusProtocol {
        BusProtocol::Can
    }

    fn send(&self, _id: u32, _payload: &[u8]) -> DriverResult<()> {
        Ok(())
    }

    fn receive(&self) -> DriverResult<Option<BusFrame>> {
        Ok(None)
    }

    fn last_error(&self) -> Option<String> {
        None
    }
}

/// Analog driver with one channel that always reads 0 V
pub struct NullAnalog;

impl DriverLifecycle for NullAnalog {}

impl AnalogIo for NullAnalog {
    fn channels(&self) -> u8 {
        1
    }

    fn read(&self, _channel: u8) -> DriverResult<f32> {
        Ok(0.0)
    }

    fn write(&self, _channel: u8, _value: f32) -> DriverResult<()> {
        Ok(())
    }
}

/// Serial driver that swallows output and never receives
pub struct NullSerial;

impl DriverLifecycle for NullSerial {}

impl SerialBus for NullSerial {
    fn send(&self, _byte: u8) -> DriverResult<()> {
        Ok(())
    }

    fn receive(&self) -> DriverResult<Option<u8>> {
        Ok(None)
    }
}

/// Fusion driver that echoes its input
pub struct NullFusion;

impl DriverLifecycle for NullFusion {}

impl SensorFusion for NullFusion {
    fn input_len(&self) -> usize {
        0
    }

    fn output_len(&self) -> usize {
        0
    }

    fn process(&self, input: &[f32]) -> DriverResult<Vec<f32>> {
        Ok(input.to_vec())
    }
}
