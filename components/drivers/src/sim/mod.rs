//! Simulated devices
//!
//! Drivers with real behaviour but no hardware behind them. The kernel binds
//! these on the host simulation board; tests use them to check that the
//! registry forwards calls to the right device.

pub mod analog;
pub mod bus;
pub mod fusion;
pub mod motion;
pub mod serial;

pub use analog::SimulatedAdc;
pub use bus::LoopbackBus;
pub use fusion::ComplementaryFilter;
pub use motion::{SimulatedAxis, Workspace};
pub use serial::LoopbackSerial;
