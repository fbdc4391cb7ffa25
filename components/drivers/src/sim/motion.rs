//! Simulated three-axis positioner
//!
//! Moves complete instantly. Targets outside the workspace are rejected, and
//! an emergency stop latches until [`SimulatedAxis::reset`].

use edgeos_hal::{DriverError, DriverLifecycle, DriverResult, MotionControl};
use spin::Mutex;

/// Reachable volume of a positioner (inclusive bounds, per axis)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Workspace {
    pub min: (f64, f64, f64),
    pub max: (f64, f64, f64),
}

impl Workspace {
    /// Cube of half-width `extent` around the origin
    pub fn cube(extent: f64) -> Self {
        Self {
            min: (-extent, -extent, -extent),
            max: (extent, extent, extent),
        }
    }

    fn contains(&self, (x, y, z): (f64, f64, f64)) -> bool {
        (self.min.0..=self.max.0).contains(&x)
            && (self.min.1..=self.max.1).contains(&y)
            && (self.min.2..=self.max.2).contains(&z)
    }
}

struct AxisState {
    position: (f64, f64, f64),
    estop: bool,
    moves: u64,
}

/// Simulated positioner
pub struct SimulatedAxis {
    workspace: Workspace,
    state: Mutex<AxisState>,
}

impl SimulatedAxis {
    /// Positioner at the origin, limited to `workspace`
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            state: Mutex::new(AxisState {
                position: (0.0, 0.0, 0.0),
                estop: false,
                moves: 0,
            }),
        }
    }

    /// Clear a latched emergency stop
    pub fn reset(&self) {
        self.state.lock().estop = false;
    }

    /// Number of completed moves
    pub fn moves(&self) -> u64 {
        self.state.lock().moves
    }
}

impl DriverLifecycle for SimulatedAxis {
    fn shutdown(&self) -> DriverResult<()> {
        // Leave the axis stopped
        self.state.lock().estop = true;
        Ok(())
    }
}

impl MotionControl for SimulatedAxis {
    fn position(&self) -> DriverResult<(f64, f64, f64)> {
        Ok(self.state.lock().position)
    }

    fn move_to(&self, x: f64, y: f64, z: f64) -> DriverResult<()> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(DriverError::InvalidArgument("non-finite target".into()));
        }
        if !self.workspace.contains((x, y, z)) {
            return Err(DriverError::InvalidArgument(format!(
                "target ({}, {}, {}) outside workspace",
                x, y, z
            )));
        }

        let mut state = self.state.lock();
        if state.estop {
            return Err(DriverError::EmergencyStop);
        }
        state.position = (x, y, z);
        state.moves += 1;
        Ok(())
    }

    fn emergency_stop(&self) -> DriverResult<()> {
        self.state.lock().estop = true;
        log::warn!("Simulated axis: emergency stop latched");
        Ok(())
    }

    fn status(&self) -> DriverResult<String> {
        let state = self.state.lock();
        let (x, y, z) = state.position;
        if state.estop {
            Ok(format!("estop at ({:.3}, {:.3}, {:.3})", x, y, z))
        } else {
            Ok(format!("idle at ({:.3}, {:.3}, {:.3})", x, y, z))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_updates_position() {
        let axis = SimulatedAxis::new(Workspace::cube(10.0));
        axis.move_to(1.0, 2.0, 3.0).unwrap();
        assert_eq!(axis.position().unwrap(), (1.0, 2.0, 3.0));
        assert_eq!(axis.moves(), 1);
        assert_eq!(axis.status().unwrap(), "idle at (1.000, 2.000, 3.000)");
    }

    #[test]
    fn test_out_of_workspace_rejected() {
        let axis = SimulatedAxis::new(Workspace::cube(1.0));
        assert!(matches!(axis.move_to(0.0, 0.0, 2.0), Err(DriverError::InvalidArgument(_))));
        assert!(matches!(axis.move_to(f64::NAN, 0.0, 0.0), Err(DriverError::InvalidArgument(_))));
        assert_eq!(axis.position().unwrap(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_emergency_stop_latches() {
        let axis = SimulatedAxis::new(Workspace::cube(10.0));
        axis.emergency_stop().unwrap();
        assert_eq!(axis.move_to(1.0, 1.0, 1.0), Err(DriverError::EmergencyStop));
        assert!(axis.status().unwrap().starts_with("estop"));

        axis.reset();
        axis.move_to(1.0, 1.0, 1.0).unwrap();
        assert_eq!(axis.position().unwrap(), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_shutdown_stops_axis() {
        let axis = SimulatedAxis::new(Workspace::cube(10.0));
        axis.shutdown().unwrap();
        assert_eq!(axis.move_to(0.5, 0.5, 0.5), Err(DriverError::EmergencyStop));
    }
}
