//! Complementary filter
//!
//! Fuses a gyro rate with an accelerometer tilt angle into one angle
//! estimate:
//!
//! ```text
//! angle = alpha * (angle + rate * dt) + (1 - alpha) * accel_angle
//! ```
//!
//! Input: `[gyro_rate (rad/s), accel_angle (rad)]`. Output: `[angle (rad)]`.
//! The first sample seeds the estimate with the accelerometer angle.

use edgeos_hal::{DriverError, DriverLifecycle, DriverResult, SensorFusion};
use spin::Mutex;

/// Complementary tilt filter
pub struct ComplementaryFilter {
    alpha: f32,
    dt: f32,
    angle: Mutex<Option<f32>>,
}

impl ComplementaryFilter {
    /// Filter with gyro weight `alpha` (0..=1) and sample period `dt` seconds
    pub fn new(alpha: f32, dt: f32) -> DriverResult<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(DriverError::Init(format!("alpha {} outside 0..=1", alpha)));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(DriverError::Init(format!("sample period {} must be positive", dt)));
        }

        Ok(Self {
            alpha,
            dt,
            angle: Mutex::new(None),
        })
    }

    /// Forget the current estimate
    pub fn reset(&self) {
        *self.angle.lock() = None;
    }
}

impl DriverLifecycle for ComplementaryFilter {
    fn start(&self) -> DriverResult<()> {
        self.reset();
        Ok(())
    }
}

impl SensorFusion for ComplementaryFilter {
    fn input_len(&self) -> usize {
        2
    }

    fn output_len(&self) -> usize {
        1
    }

    fn process(&self, input: &[f32]) -> DriverResult<Vec<f32>> {
        let &[rate, accel] = input else {
            return Err(DriverError::InvalidArgument(format!(
                "expected {} inputs, got {}",
                self.input_len(),
                input.len()
            )));
        };

        let mut angle = self.angle.lock();
        let next = match *angle {
            None => accel,
            Some(prev) => self.alpha * (prev + rate * self.dt) + (1.0 - self.alpha) * accel,
        };
        *angle = Some(next);
        Ok(vec![next])
    }
}
