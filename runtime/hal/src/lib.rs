//! EdgeOS HAL - Driver registry and capability contracts
//!
//! # Purpose
//! The HAL hides concrete hardware drivers behind one capability trait per
//! device class, and keeps every live driver in a single [`DriverRegistry`]
//! that the rest of the system borrows from.
//!
//! # Integration Points
//! - Depends on: nothing above `core`/`std` beyond the ambient crates
//! - Provides to: Kernel bootstrap, application code, concrete drivers
//! - Extension point: implement a capability trait and hand the registry a
//!   factory that builds a [`Driver`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Application / Kernel Bootstrap     │
//! └──────────────┬──────────────────────────┘
//!                │ register / lookup / invoke
//! ┌──────────────▼──────────────────────────┐
//! │          DriverRegistry (RwLock)        │
//! │  • DriverHandle (id, class, address)    │
//! │  • Driver (type-erased capability)      │
//! └──────────────┬──────────────────────────┘
//!                │ capability traits
//! ┌──────────────▼──────────────────────────┐
//! │   Concrete drivers (null / simulated)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Testing Strategy
//! - Unit tests: id allocation, class views, platform probes
//! - Integration tests: registry properties and concurrent registration

#![deny(unsafe_op_in_unsafe_fn)]

pub mod capability;
pub mod device;
pub mod error;
pub mod handle;
pub mod platform;
pub mod registry;

pub use capability::{
    AnalogIo, BusFrame, BusProtocol, DigitalBus, Driver, DriverLifecycle, MotionControl,
    SensorFusion, SerialBus,
};
pub use device::{DeviceAddress, DeviceClass, DeviceId};
pub use error::{DriverError, DriverResult, PlatformError, RegistryError, Result, UnknownClass};
pub use handle::{DeviceDescriptor, DriverHandle};
pub use platform::{
    detect, BoardId, BoardProbe, CompileTimeProbe, DeviceTreeProbe, EnvProbe, PlatformDescriptor,
    PlatformDetector, PlatformFeatures,
};
pub use registry::{ClassView, DriverRegistry, HandleRef};
