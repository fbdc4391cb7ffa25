//! Driver Registry
//!
//! The central table of live drivers. The registry exclusively owns every
//! [`DriverHandle`]; callers only ever get a scoped guard ([`HandleRef`],
//! [`ClassView`]) or a closure-scoped reference via `invoke`, so no handle can
//! outlive a deregistration.
//!
//! # Locking
//! State sits behind a readers-writer lock. Registration, deregistration and
//! shutdown take the write lock; lookups, views and invocations share the
//! read lock. Factories, `start` and `shutdown` run with no lock held.
//!
//! A guard holds the read lock until it is dropped. Do not register or
//! deregister on the same thread while a guard is alive.

use std::collections::BTreeSet;

use spin::{RwLock, RwLockReadGuard};
use static_assertions::assert_impl_all;

use crate::capability::{AnalogIo, DigitalBus, Driver, MotionControl, SensorFusion, SerialBus};
use crate::device::{DeviceClass, DeviceId};
use crate::error::{DriverResult, RegistryError, Result};
use crate::handle::{DeviceDescriptor, DriverHandle};

/// First id handed out by a fresh registry
const FIRST_DEVICE_ID: u64 = 1;

/// Lock-protected registry contents
struct RegistryState {
    /// Next id to hand out; `None` once the id space is used up
    next_id: Option<u64>,

    /// Handles in registration order
    handles: Vec<DriverHandle>,

    /// Ids that were registered and then removed; never handed out again
    retired: BTreeSet<DeviceId>,
}

impl RegistryState {
    const fn new() -> Self {
        Self {
            next_id: Some(FIRST_DEVICE_ID),
            handles: Vec::new(),
            retired: BTreeSet::new(),
        }
    }

    fn position(&self, id: DeviceId) -> Option<usize> {
        self.handles.iter().position(|h| h.id() == id)
    }

    /// Whether `id` is live or was live at some point
    fn claimed(&self, id: DeviceId) -> bool {
        self.retired.contains(&id) || self.position(id).is_some()
    }

    fn allocate_id(&mut self) -> Result<DeviceId> {
        let raw = self.next_id.ok_or(RegistryError::IdSpaceExhausted)?;
        self.next_id = raw.checked_add(1);
        Ok(DeviceId::new(raw))
    }

    /// Keep generated ids clear of a caller-supplied one
    fn reserve(&mut self, id: DeviceId) {
        if let Some(next) = self.next_id {
            if id.raw() >= next {
                self.next_id = id.raw().checked_add(1);
            }
        }
    }

    fn remove(&mut self, index: usize) -> DriverHandle {
        let handle = self.handles.remove(index);
        self.retired.insert(handle.id());
        handle
    }
}

/// Registry of live drivers
pub struct DriverRegistry {
    state: RwLock<RegistryState>,
}

assert_impl_all!(DriverRegistry: Send, Sync);

impl DriverRegistry {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
        }
    }

    /// Register a driver of `class` built by `factory`
    ///
    /// The id is generated and the device is named after its class.
    pub fn register<F>(&self, class: DeviceClass, factory: F) -> Result<DeviceId>
    where
        F: FnOnce() -> DriverResult<Driver>,
    {
        self.register_with(DeviceDescriptor::new(class), factory)
    }

    /// Register a driver described by `descriptor`
    ///
    /// # Errors
    /// - `DuplicateRegistration` if `descriptor.fixed_id` is registered now
    ///   or was registered before and has since been removed
    /// - `IdSpaceExhausted` if no id is left to generate, or the fixed id is
    ///   `u64::MAX` (which would leave none)
    /// - `Construction` if the factory or the driver's `start` fails
    /// - `WrongDriverClass` if the factory built a driver of another class
    pub fn register_with<F>(&self, descriptor: DeviceDescriptor, factory: F) -> Result<DeviceId>
    where
        F: FnOnce() -> DriverResult<Driver>,
    {
        let DeviceDescriptor { class, name, address, fixed_id } = descriptor;

        // Fail fast before running a potentially slow factory
        if let Some(id) = fixed_id {
            if id.raw() == u64::MAX {
                return Err(RegistryError::IdSpaceExhausted);
            }
            if self.state.read().claimed(id) {
                return Err(RegistryError::DuplicateRegistration { id });
            }
        }

        let driver = factory().map_err(|source| RegistryError::Construction { class, source })?;
        if driver.class() != class {
            return Err(RegistryError::WrongDriverClass {
                expected: class,
                actual: driver.class(),
            });
        }
        driver
            .start()
            .map_err(|source| RegistryError::Construction { class, source })?;

        let mut state = self.state.write();
        let allocated = match fixed_id {
            // Another writer may have claimed the id while the factory ran
            Some(id) if state.claimed(id) => Err(RegistryError::DuplicateRegistration { id }),
            Some(id) => {
                state.reserve(id);
                Ok(id)
            }
            None => state.allocate_id(),
        };
        let id = match allocated {
            Ok(id) => id,
            Err(err) => {
                drop(state);
                if let Err(shutdown) = driver.shutdown() {
                    log::warn!("Shutdown of rejected {} driver failed: {}", class, shutdown);
                }
                return Err(err);
            }
        };

        log::debug!("Registered {} '{}' as {} at {}", class, name, id, address);
        state.handles.push(DriverHandle::new(id, name, address, driver));
        Ok(id)
    }

    /// Look up a device by id
    ///
    /// Returns `None` for unknown ids; a miss is never an error.
    pub fn lookup(&self, id: DeviceId) -> Option<HandleRef<'_>> {
        let guard = self.state.read();
        let index = guard.position(id)?;
        Some(HandleRef { guard, index })
    }

    /// Devices of one class, in registration order
    pub fn lookup_by_class(&self, class: DeviceClass) -> ClassView<'_> {
        ClassView {
            guard: self.state.read(),
            class: Some(class),
        }
    }

    /// Every device, in registration order
    pub fn devices(&self) -> ClassView<'_> {
        ClassView {
            guard: self.state.read(),
            class: None,
        }
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: DeviceId) -> bool {
        self.state.read().position(id).is_some()
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.state.read().handles.len()
    }

    /// Whether the registry holds no devices
    pub fn is_empty(&self) -> bool {
        self.state.read().handles.is_empty()
    }

    /// Registered ids, in registration order
    pub fn ids(&self) -> Vec<DeviceId> {
        self.state.read().handles.iter().map(DriverHandle::id).collect()
    }

    /// Remove a device, shut its driver down and drop it
    ///
    /// # Errors
    /// `NotFound` if `id` is not registered (including a repeated call).
    pub fn deregister(&self, id: DeviceId) -> Result<()> {
        let handle = {
            let mut state = self.state.write();
            let index = state.position(id).ok_or(RegistryError::NotFound { id })?;
            state.remove(index)
        };

        Self::release(id, handle.driver());
        log::debug!("Deregistered {} '{}'", id, handle.name());
        Ok(())
    }

    /// Deregister every device, most recently registered first
    ///
    /// Returns the number of devices removed.
    pub fn shutdown_all(&self) -> usize {
        let handles = {
            let mut state = self.state.write();
            let handles = core::mem::take(&mut state.handles);
            state.retired.extend(handles.iter().map(DriverHandle::id));
            handles
        };
        let count = handles.len();

        for handle in handles.into_iter().rev() {
            Self::release(handle.id(), handle.driver());
        }

        if count > 0 {
            log::debug!("Shut down {} devices", count);
        }
        count
    }

    /// Run `f` against a device for the duration of the call
    ///
    /// # Errors
    /// `NotFound` if `id` is not registered. Whatever `f` returns is handed
    /// back untouched.
    pub fn invoke<R>(&self, id: DeviceId, f: impl FnOnce(&DriverHandle) -> R) -> Result<R> {
        let handle = self.lookup(id).ok_or(RegistryError::NotFound { id })?;
        Ok(f(&handle))
    }

    /// Run `f` against a motion device
    pub fn with_motion<R>(&self, id: DeviceId, f: impl FnOnce(&dyn MotionControl) -> R) -> Result<R> {
        let handle = self.lookup(id).ok_or(RegistryError::NotFound { id })?;
        match handle.as_motion() {
            Some(motion) => Ok(f(motion)),
            None => Err(mismatch(&handle, DeviceClass::Motion)),
        }
    }

    /// Run `f` against a digital bus device
    pub fn with_digital_bus<R>(&self, id: DeviceId, f: impl FnOnce(&dyn DigitalBus) -> R) -> Result<R> {
        let handle = self.lookup(id).ok_or(RegistryError::NotFound { id })?;
        match handle.as_digital_bus() {
            Some(bus) => Ok(f(bus)),
            None => Err(mismatch(&handle, DeviceClass::DigitalBus)),
        }
    }

    /// Run `f` against an analog I/O device
    pub fn with_analog<R>(&self, id: DeviceId, f: impl FnOnce(&dyn AnalogIo) -> R) -> Result<R> {
        let handle = self.lookup(id).ok_or(RegistryError::NotFound { id })?;
        match handle.as_analog() {
            Some(analog) => Ok(f(analog)),
            None => Err(mismatch(&handle, DeviceClass::AnalogIo)),
        }
    }

    /// Run `f` against a serial bus device
    pub fn with_serial<R>(&self, id: DeviceId, f: impl FnOnce(&dyn SerialBus) -> R) -> Result<R> {
        let handle = self.lookup(id).ok_or(RegistryError::NotFound { id })?;
        match handle.as_serial() {
            Some(serial) => Ok(f(serial)),
            None => Err(mismatch(&handle, DeviceClass::SerialBus)),
        }
    }

    /// Run `f` against a sensor fusion device
    pub fn with_fusion<R>(&self, id: DeviceId, f: impl FnOnce(&dyn SensorFusion) -> R) -> Result<R> {
        let handle = self.lookup(id).ok_or(RegistryError::NotFound { id })?;
        match handle.as_fusion() {
            Some(fusion) => Ok(f(fusion)),
            None => Err(mismatch(&handle, DeviceClass::SensorFusion)),
        }
    }

    fn release(id: DeviceId, driver: &Driver) {
        if let Err(err) = driver.shutdown() {
            log::warn!("Shutdown of {} ({}) failed: {}", id, driver.class(), err);
        }
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DriverRegistry")
            .field("devices", &state.handles.len())
            .field("next_id", &state.next_id)
            .finish()
    }
}

fn mismatch(handle: &DriverHandle, expected: DeviceClass) -> RegistryError {
    RegistryError::ClassMismatch {
        id: handle.id(),
        expected,
        actual: handle.class(),
    }
}

/// Scoped reference to a registered handle
///
/// Holds the registry's read lock until dropped.
pub struct HandleRef<'a> {
    guard: RwLockReadGuard<'a, RegistryState>,
    index: usize,
}

impl core::ops::Deref for HandleRef<'_> {
    type Target = DriverHandle;

    fn deref(&self) -> &DriverHandle {
        &self.guard.handles[self.index]
    }
}

impl core::fmt::Debug for HandleRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&**self, f)
    }
}

/// Lazy view over registered handles, optionally filtered by class
///
/// `iter` may be called any number of times; each call restarts from the
/// first matching handle. Holds the registry's read lock until dropped.
pub struct ClassView<'a> {
    guard: RwLockReadGuard<'a, RegistryState>,
    class: Option<DeviceClass>,
}

impl<'a> ClassView<'a> {
    /// Iterate matching handles in registration order
    pub fn iter(&self) -> impl Iterator<Item = &DriverHandle> + '_ {
        let class = self.class;
        self.guard
            .handles
            .iter()
            .filter(move |h| class.map_or(true, |c| h.class() == c))
    }

    /// Ids of matching handles
    pub fn ids(&self) -> Vec<DeviceId> {
        self.iter().map(DriverHandle::id).collect()
    }

    /// Number of matching handles
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no handle matches
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'v, 'a> IntoIterator for &'v ClassView<'a> {
    type Item = &'v DriverHandle;
    type IntoIter = Box<dyn Iterator<Item = &'v DriverHandle> + 'v>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::DriverLifecycle;
    use crate::device::DeviceAddress;
    use crate::error::DriverError;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Probe {
        shutdowns: Arc<AtomicUsize>,
    }

    impl DriverLifecycle for Probe {
        fn shutdown(&self) -> DriverResult<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl SensorFusion for Probe {
        fn input_len(&self) -> usize {
            1
        }

        fn output_len(&self) -> usize {
            1
        }

        fn process(&self, input: &[f32]) -> DriverResult<Vec<f32>> {
            Ok(input.to_vec())
        }
    }

    struct FailingStart;

    impl DriverLifecycle for FailingStart {
        fn start(&self) -> DriverResult<()> {
            Err(DriverError::Init("no clock".into()))
        }
    }

    impl SensorFusion for FailingStart {
        fn input_len(&self) -> usize {
            0
        }

        fn output_len(&self) -> usize {
            0
        }

        fn process(&self, _input: &[f32]) -> DriverResult<Vec<f32>> {
            Ok(Vec::new())
        }
    }

    fn probe(shutdowns: &Arc<AtomicUsize>) -> DriverResult<Driver> {
        Ok(Driver::sensor_fusion(Probe { shutdowns: shutdowns.clone() }))
    }

    #[test]
    fn test_ids_start_at_one_and_grow() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let first = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();
        let second = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();

        assert_eq!(first, DeviceId::new(1));
        assert_eq!(second, DeviceId::new(2));
    }

    #[test]
    fn test_ids_not_reused_after_deregister() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let first = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();
        registry.deregister(first).unwrap();
        let second = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_fixed_id_duplicate() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let descriptor = DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(DeviceId::new(40));

        let id = registry.register_with(descriptor.clone(), || probe(&count)).unwrap();
        assert_eq!(id, DeviceId::new(40));

        let mut factory_ran = false;
        let result = registry.register_with(descriptor, || {
            factory_ran = true;
            probe(&count)
        });
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateRegistration { id }) if id == DeviceId::new(40)
        ));
        assert!(!factory_ran);

        // Generated ids skip past the fixed one
        let next = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();
        assert_eq!(next, DeviceId::new(41));
    }

    #[test]
    fn test_factory_error_is_construction() {
        let registry = DriverRegistry::new();
        let result = registry.register(DeviceClass::Motion, || {
            Err(DriverError::Transport("bus offline".into()))
        });

        match result {
            Err(RegistryError::Construction { class, source }) => {
                assert_eq!(class, DeviceClass::Motion);
                assert_eq!(source, DriverError::Transport("bus offline".into()));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_factory_wrong_class() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let result = registry.register(DeviceClass::Motion, || probe(&count));
        assert!(matches!(
            result,
            Err(RegistryError::WrongDriverClass {
                expected: DeviceClass::Motion,
                actual: DeviceClass::SensorFusion,
            })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_start_not_registered() {
        let registry = DriverRegistry::new();
        let result = registry.register(DeviceClass::SensorFusion, || {
            Ok(Driver::sensor_fusion(FailingStart))
        });

        assert!(matches!(result, Err(RegistryError::Construction { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_deregister_calls_shutdown_once() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();

        registry.deregister(id).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(matches!(registry.deregister(id), Err(RegistryError::NotFound { .. })));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_all() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();
        }

        assert_eq!(registry.shutdown_all(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.shutdown_all(), 0);
    }

    #[test]
    fn test_descriptor_metadata_kept() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let descriptor = DeviceDescriptor::new(DeviceClass::SensorFusion)
            .named("imu-fusion")
            .at(DeviceAddress::Bus { bus: 1, address: 0x68 });

        let id = registry.register_with(descriptor, || probe(&count)).unwrap();
        let handle = registry.lookup(id).unwrap();
        assert_eq!(handle.name(), "imu-fusion");
        assert_eq!(handle.address(), DeviceAddress::Bus { bus: 1, address: 0x68 });
        assert_eq!(handle.class(), DeviceClass::SensorFusion);
    }

    #[test]
    fn test_typed_invoke_class_mismatch() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();

        let output = registry.with_fusion(id, |f| f.process(&[0.5])).unwrap();
        assert_eq!(output, Ok(vec![0.5]));

        let result = registry.with_motion(id, |m| m.position());
        assert!(matches!(
            result,
            Err(RegistryError::ClassMismatch {
                expected: DeviceClass::Motion,
                actual: DeviceClass::SensorFusion,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = DriverRegistry::default();
        assert!(registry.lookup(DeviceId::new(1)).is_none());
        assert!(registry.devices().is_empty());
        assert!(registry.lookup_by_class(DeviceClass::Motion).is_empty());
        assert!(matches!(
            registry.invoke(DeviceId::new(1), |h| h.id()),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_id_space_exhaustion_is_an_error() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        // u64::MAX would leave nothing to generate
        let top = DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(DeviceId::new(u64::MAX));
        assert_eq!(
            registry.register_with(top, || probe(&count)),
            Err(RegistryError::IdSpaceExhausted)
        );

        let near_top =
            DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(DeviceId::new(u64::MAX - 1));
        registry.register_with(near_top, || probe(&count)).unwrap();

        let last = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();
        assert_eq!(last, DeviceId::new(u64::MAX));

        let result = registry.register(DeviceClass::SensorFusion, || probe(&count));
        assert_eq!(result, Err(RegistryError::IdSpaceExhausted));

        // The rejected driver was started, so it gets shut down
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec![DeviceId::new(u64::MAX - 1), DeviceId::new(u64::MAX)]);
    }

    #[test]
    fn test_removed_id_cannot_be_claimed_again() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let generated = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();
        registry.deregister(generated).unwrap();

        let reclaim = DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(generated);
        assert_eq!(
            registry.register_with(reclaim, || probe(&count)),
            Err(RegistryError::DuplicateRegistration { id: generated })
        );

        let fixed = DeviceId::new(10);
        let descriptor = DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(fixed);
        registry.register_with(descriptor.clone(), || probe(&count)).unwrap();
        registry.shutdown_all();
        assert_eq!(
            registry.register_with(descriptor, || probe(&count)),
            Err(RegistryError::DuplicateRegistration { id: fixed })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unissued_id_below_counter_can_be_claimed() {
        let registry = DriverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let high = DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(DeviceId::new(50));
        registry.register_with(high, || probe(&count)).unwrap();

        let low = DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(DeviceId::new(7));
        assert_eq!(registry.register_with(low, || probe(&count)), Ok(DeviceId::new(7)));

        let next = registry.register(DeviceClass::SensorFusion, || probe(&count)).unwrap();
        assert_eq!(next, DeviceId::new(51));
    }

    #[test]
    fn test_fixed_id_taken_while_factory_runs() {
        let registry = DriverRegistry::new();
        let winner = Arc::new(AtomicUsize::new(0));
        let loser = Arc::new(AtomicUsize::new(0));
        let id = DeviceId::new(5);
        let descriptor = DeviceDescriptor::new(DeviceClass::SensorFusion).with_id(id);

        let result = registry.register_with(descriptor.clone(), || {
            // No lock is held here, so another writer can take the id first
            registry.register_with(descriptor.clone(), || probe(&winner)).unwrap();
            probe(&loser)
        });

        assert_eq!(result, Err(RegistryError::DuplicateRegistration { id }));
        assert_eq!(loser.load(Ordering::SeqCst), 1);
        assert_eq!(winner.load(Ordering::SeqCst), 0);
        assert_eq!(registry.ids(), vec![id]);
    }
}
