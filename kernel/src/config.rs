//! Boot configuration
//!
//! Which device classes to bring up and what to do when the board has no
//! binding for a class. Loaded from TOML, e.g.:
//!
//! ```toml
//! classes = ["motion", "serial-bus"]
//! unknown-platform = "no-drivers"
//! fallback-to-dummy = false
//! board = "sim"
//! ```
//!
//! Every key is optional; missing keys take the [`BootConfig::default`] value.

use std::path::Path;

use edgeos_hal::{BoardId, DeviceClass};
use serde::Deserialize;

use crate::KernelError;

/// Policy for a board that detection could not identify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownPlatformPolicy {
    /// Register a null driver for every configured class
    #[default]
    DummyDrivers,

    /// Register nothing
    NoDrivers,
}

/// Kernel boot configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct BootConfig {
    /// Device classes to bring up
    pub classes: Vec<DeviceClass>,

    /// What to do on an unknown board
    pub unknown_platform: UnknownPlatformPolicy,

    /// Bind the null driver when a known board has no binding for a class
    pub fallback_to_dummy: bool,

    /// Skip detection and use this board
    pub board: Option<BoardId>,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            classes: DeviceClass::ALL.to_vec(),
            unknown_platform: UnknownPlatformPolicy::default(),
            fallback_to_dummy: true,
            board: None,
        }
    }
}

impl BootConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, KernelError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| KernelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Configured classes, deduplicated, in [`DeviceClass::ALL`] order
    pub fn enabled_classes(&self) -> impl Iterator<Item = DeviceClass> + '_ {
        DeviceClass::ALL
            .into_iter()
            .filter(move |class| self.classes.contains(class))
    }
}
