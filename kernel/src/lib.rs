//! EdgeOS Kernel Bootstrap
//!
//! Detects the board, reads the boot configuration and binds one or more
//! drivers per device class into a fresh [`DriverRegistry`].
//!
//! # Architecture
//!
//! The kernel is organized into the following modules:
//! - `config`: Boot configuration (TOML)
//! - `catalog`: Bindable drivers and the board features they need
//! - `bootstrap`: Bring-up sequence, boot report and the kernel handle
//!
//! # Boot sequence
//!
//! ```text
//! init()
//!   ├─ BootConfig (default or TOML)
//!   ├─ PlatformDescriptor (config override or edgeos_hal::detect())
//!   └─ bring_up(): catalog bindings → registry, null drivers as fallback
//! ```
//!
//! Every call to an `init*` function builds an independent registry, so
//! tests can boot as many kernels as they like.
//!
//! [`DriverRegistry`]: edgeos_hal::DriverRegistry

pub mod bootstrap;
pub mod catalog;
pub mod config;

pub use bootstrap::{bring_up, BindFailure, BootReport, BoundDevice, KernelHandle};
pub use catalog::{DriverBinding, DriverCatalog, DriverFactory};
pub use config::{BootConfig, UnknownPlatformPolicy};

use edgeos_hal::PlatformDescriptor;
use thiserror::Error;

/// Kernel errors
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Invalid boot configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Boot with the default configuration on the detected board
pub fn init() -> KernelHandle {
    init_with_config(BootConfig::default())
}

/// Boot with `config`, using its board override if present
pub fn init_with_config(config: BootConfig) -> KernelHandle {
    let platform = match config.board {
        Some(board) => {
            log::info!("Board forced by configuration: {}", board);
            PlatformDescriptor::for_board(board)
        }
        None => edgeos_hal::detect(),
    };
    init_with(config, platform, &DriverCatalog::standard())
}

/// Boot with an explicit platform and catalog
pub fn init_with(
    config: BootConfig,
    platform: PlatformDescriptor,
    catalog: &DriverCatalog,
) -> KernelHandle {
    bring_up(config, platform, catalog)
}
