//! Simulated ADC/DAC
//!
//! Each channel holds a voltage. Inputs are injected with
//! [`SimulatedAdc::set_input`]; `write` drives a channel and reads back the
//! same value.

use edgeos_hal::{AnalogIo, DriverError, DriverLifecycle, DriverResult};
use spin::Mutex;

/// Default full-scale reference voltage
pub const DEFAULT_VREF: f32 = 3.3;

/// Simulated analog front end
pub struct SimulatedAdc {
    vref: f32,
    levels: Mutex<Vec<f32>>,
}

impl SimulatedAdc {
    /// `channels` channels at 0 V with a 0..=`DEFAULT_VREF` range
    pub fn new(channels: u8) -> Self {
        Self::with_vref(channels, DEFAULT_VREF)
    }

    /// `channels` channels with a 0..=`vref` range
    pub fn with_vref(channels: u8, vref: f32) -> Self {
        Self {
            vref,
            levels: Mutex::new(vec![0.0; usize::from(channels)]),
        }
    }

    /// Inject an input voltage (clamped to the converter range)
    pub fn set_input(&self, channel: u8, volts: f32) -> DriverResult<()> {
        let mut levels = self.levels.lock();
        let level = levels
            .get_mut(usize::from(channel))
            .ok_or(DriverError::InvalidChannel(channel))?;
        *level = volts.clamp(0.0, self.vref);
        Ok(())
    }
}

impl DriverLifecycle for SimulatedAdc {}

impl AnalogIo for SimulatedAdc {
    fn channels(&self) -> u8 {
        // Constructed from a u8 count, so this cannot truncate
        self.levels.lock().len() as u8
    }

    fn read(&self, channel: u8) -> DriverResult<f32> {
        self.levels
            .lock()
            .get(usize::from(channel))
            .copied()
            .ok_or(DriverError::InvalidChannel(channel))
    }

    fn write(&self, channel: u8, value: f32) -> DriverResult<()> {
        if !value.is_finite() || !(0.0..=self.vref).contains(&value) {
            return Err(DriverError::InvalidArgument(format!(
                "{} V outside 0..={} V",
                value, self.vref
            )));
        }

        let mut levels = self.levels.lock();
        let level = levels
            .get_mut(usize::from(channel))
            .ok_or(DriverError::InvalidChannel(channel))?;
        *level = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_injected_input() {
        let adc = SimulatedAdc::new(4);
        assert_eq!(adc.channels(), 4);
        adc.set_input(2, 1.25).unwrap();
        assert_eq!(adc.read(2).unwrap(), 1.25);
        assert_eq!(adc.read(0).unwrap(), 0.0);
    }

    #[test]
    fn test_input_clamped() {
        let adc = SimulatedAdc::new(1);
        adc.set_input(0, 12.0).unwrap();
        assert_eq!(adc.read(0).unwrap(), DEFAULT_VREF);
    }

    #[test]
    fn test_invalid_channel() {
        let adc = SimulatedAdc::new(2);
        assert_eq!(adc.read(2), Err(DriverError::InvalidChannel(2)));
        assert_eq!(adc.write(5, 1.0), Err(DriverError::InvalidChannel(5)));
    }

    #[test]
    fn test_write_reads_back() {
        let adc = SimulatedAdc::with_vref(1, 5.0);
        adc.write(0, 4.5).unwrap();
        assert_eq!(adc.read(0).unwrap(), 4.5);
        assert!(matches!(adc.write(0, 5.5), Err(DriverError::InvalidArgument(_))));
    }
}
