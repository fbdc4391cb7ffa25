//! Driver bring-up
//!
//! Walks the configured device classes and binds drivers into a fresh
//! registry:
//! 1. Unknown board under `no-drivers`: nothing
//! 2. Known board: every catalog binding whose features the board has
//! 3. Nothing bound and (unknown board or `fallback-to-dummy`): null driver
//!
//! A binding that fails to construct is logged and recorded in the
//! [`BootReport`]; boot continues with the remaining classes.

use edgeos_hal::{
    DeviceClass, DeviceDescriptor, DeviceId, DriverRegistry, PlatformDescriptor, RegistryError,
};

use crate::catalog::DriverCatalog;
use crate::config::{BootConfig, UnknownPlatformPolicy};

/// One device registered during boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundDevice {
    pub id: DeviceId,
    pub class: DeviceClass,
    pub name: String,
    /// Null driver stand-in rather than a real binding
    pub dummy: bool,
}

/// A binding that could not be registered
#[derive(Debug, Clone, PartialEq)]
pub struct BindFailure {
    pub class: DeviceClass,
    pub name: String,
    pub error: RegistryError,
}

/// Outcome of driver bring-up
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootReport {
    pub bound: Vec<BoundDevice>,
    pub failures: Vec<BindFailure>,
}

impl BootReport {
    /// Devices bound for `class`, in registration order
    pub fn bound_for(&self, class: DeviceClass) -> impl Iterator<Item = &BoundDevice> + '_ {
        self.bound.iter().filter(move |d| d.class == class)
    }

    /// Whether every attempted binding succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Running kernel: the registry plus what boot decided
///
/// Dropping the handle shuts every driver down.
pub struct KernelHandle {
    registry: DriverRegistry,
    platform: PlatformDescriptor,
    config: BootConfig,
    report: BootReport,
}

impl KernelHandle {
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn platform(&self) -> &PlatformDescriptor {
        &self.platform
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    pub fn report(&self) -> &BootReport {
        &self.report
    }

    /// Shut down and remove every driver, newest first
    ///
    /// Returns the number of drivers removed. Safe to call more than once.
    pub fn shutdown(&self) -> usize {
        let count = self.registry.shutdown_all();
        if count > 0 {
            log::info!("Kernel shut down {} driver(s)", count);
        }
        count
    }
}

impl Drop for KernelHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KernelHandle")
            .field("platform", &self.platform)
            .field("devices", &self.registry.len())
            .field("report", &self.report)
            .finish()
    }
}

/// Bind drivers for `platform` according to `config`
pub fn bring_up(
    config: BootConfig,
    platform: PlatformDescriptor,
    catalog: &DriverCatalog,
) -> KernelHandle {
    log::info!("Bringing up drivers on {}", platform);

    let registry = DriverRegistry::new();
    let mut report = BootReport::default();

    let skip_all = platform.is_unknown() && config.unknown_platform == UnknownPlatformPolicy::NoDrivers;
    if skip_all {
        log::warn!("Unknown platform, no drivers registered");
    }

    for class in config.enabled_classes().filter(|_| !skip_all) {
        let mut bound_any = false;

        if !platform.is_unknown() {
            for binding in catalog.matching(class, &platform) {
                match registry.register_with(binding.descriptor(), || binding.build(&platform)) {
                    Ok(id) => {
                        log::info!("  {} '{}' -> {}", class, binding.name, id);
                        report.bound.push(BoundDevice {
                            id,
                            class,
                            name: binding.name.to_string(),
                            dummy: false,
                        });
                        bound_any = true;
                    }
                    Err(error) => {
                        log::error!("  {} '{}' failed: {}", class, binding.name, error);
                        report.failures.push(BindFailure {
                            class,
                            name: binding.name.to_string(),
                            error,
                        });
                    }
                }
            }
        }

        if bound_any || !(platform.is_unknown() || config.fallback_to_dummy) {
            continue;
        }

        let name = format!("null-{}", class);
        let descriptor = DeviceDescriptor::new(class).named(name.clone());
        match registry.register_with(descriptor, || Ok(edgeos_drivers::null_driver(class))) {
            Ok(id) => {
                log::info!("  {} '{}' -> {} (no hardware)", class, name, id);
                report.bound.push(BoundDevice {
                    id,
                    class,
                    name,
                    dummy: true,
                });
            }
            Err(error) => {
                log::error!("  {} '{}' failed: {}", class, name, error);
                report.failures.push(BindFailure { class, name, error });
            }
        }
    }

    log::info!(
        "Driver bring-up complete: {} bound, {} failed",
        report.bound.len(),
        report.failures.len()
    );

    KernelHandle {
        registry,
        platform,
        config,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DriverBinding;
    use edgeos_hal::{BoardId, DeviceAddress, DriverError, PlatformFeatures};

    fn sim() -> PlatformDescriptor {
        PlatformDescriptor::for_board(BoardId::Simulator)
    }

    #[test]
    fn test_failed_binding_falls_back() {
        let catalog = DriverCatalog::empty().with_binding(DriverBinding::new(
            "broken-axis",
            DeviceClass::Motion,
            PlatformFeatures::MOTION,
            DeviceAddress::Virtual,
            |_| Err(DriverError::Init("no encoder".into())),
        ));
        let config = BootConfig {
            classes: vec![DeviceClass::Motion],
            ..BootConfig::default()
        };

        let kernel = bring_up(config, sim(), &catalog);
        let report = kernel.report();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "broken-axis");
        assert!(matches!(
            report.failures[0].error,
            RegistryError::Construction { class: DeviceClass::Motion, .. }
        ));

        let bound: Vec<_> = report.bound_for(DeviceClass::Motion).collect();
        assert_eq!(bound.len(), 1);
        assert!(bound[0].dummy);
        assert_eq!(bound[0].name, "null-motion");
    }

    #[test]
    fn test_no_fallback_leaves_class_empty() {
        let config = BootConfig {
            classes: vec![DeviceClass::Motion],
            fallback_to_dummy: false,
            ..BootConfig::default()
        };

        let kernel = bring_up(config, sim(), &DriverCatalog::empty());
        assert!(kernel.registry().is_empty());
        assert!(kernel.report().is_clean());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let kernel = bring_up(BootConfig::default(), sim(), &DriverCatalog::standard());
        let count = kernel.registry().len();

        assert!(count > 0);
        assert_eq!(kernel.shutdown(), count);
        assert_eq!(kernel.shutdown(), 0);
    }
}
