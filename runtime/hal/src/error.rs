//! Error types for the HAL
//!
//! Registry errors are ordinary typed results: a missing device is an
//! expected state on modular hardware. Driver errors are opaque to the
//! registry and are handed back to the caller exactly as the driver raised
//! them.

use thiserror::Error;

use crate::device::{DeviceClass, DeviceId};

/// Errors raised by a concrete driver while performing an operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation '{op}' timed out")]
    Timeout { op: &'static str },

    #[error("Invalid channel {0}")]
    InvalidChannel(u8),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("Emergency stop is latched")]
    EmergencyStop,

    #[error("Driver initialization failed: {0}")]
    Init(String),
}

/// Result type for driver operations
pub type DriverResult<T> = core::result::Result<T, DriverError>;

/// Errors raised by the driver registry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("Device {id} is already registered")]
    DuplicateRegistration { id: DeviceId },

    #[error("No device ids left to allocate")]
    IdSpaceExhausted,

    #[error("Device {id} not found")]
    NotFound { id: DeviceId },

    #[error("Device {id} is a {actual} device, expected {expected}")]
    ClassMismatch {
        id: DeviceId,
        expected: DeviceClass,
        actual: DeviceClass,
    },

    #[error("Factory for a {expected} device produced a {actual} driver")]
    WrongDriverClass {
        expected: DeviceClass,
        actual: DeviceClass,
    },

    #[error("Failed to construct {class} driver: {source}")]
    Construction {
        class: DeviceClass,
        #[source]
        source: DriverError,
    },
}

/// Result type for registry operations
pub type Result<T> = core::result::Result<T, RegistryError>;

/// Errors raised by platform detection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Platform could not be identified")]
    UnknownPlatform,

    #[error("Unknown board identifier '{0}'")]
    UnknownBoard(String),
}

/// A device class name that does not match any [`DeviceClass`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown device class '{0}'")]
pub struct UnknownClass(pub String);
