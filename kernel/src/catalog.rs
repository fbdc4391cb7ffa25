//! Driver catalog
//!
//! The table of drivers the bootstrap may bind. Each [`DriverBinding`] names
//! the device class it provides, the board features it needs, and a factory
//! that builds the driver. Adding a binding is the only way to plug a new
//! driver into boot.

use edgeos_drivers::{
    ComplementaryFilter, LoopbackBus, LoopbackSerial, SimulatedAdc, SimulatedAxis, Workspace,
};
use edgeos_hal::{
    BusProtocol, DeviceAddress, DeviceClass, DeviceDescriptor, Driver, DriverResult,
    PlatformDescriptor, PlatformFeatures,
};

/// Builds a driver for the detected platform
pub type DriverFactory = Box<dyn Fn(&PlatformDescriptor) -> DriverResult<Driver> + Send + Sync>;

/// One bindable driver
pub struct DriverBinding {
    /// Device name used at registration
    pub name: &'static str,

    /// Class the factory produces
    pub class: DeviceClass,

    /// Board features the driver needs
    pub required: PlatformFeatures,

    /// Platform address of the device
    pub address: DeviceAddress,

    factory: DriverFactory,
}

impl DriverBinding {
    /// Create a binding
    pub fn new<F>(
        name: &'static str,
        class: DeviceClass,
        required: PlatformFeatures,
        address: DeviceAddress,
        factory: F,
    ) -> Self
    where
        F: Fn(&PlatformDescriptor) -> DriverResult<Driver> + Send + Sync + 'static,
    {
        Self {
            name,
            class,
            required,
            address,
            factory: Box::new(factory),
        }
    }

    /// Whether `platform` offers everything this driver needs
    pub fn matches(&self, platform: &PlatformDescriptor) -> bool {
        platform.supports(self.required)
    }

    /// Registration descriptor for this binding
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor::new(self.class)
            .named(self.name)
            .at(self.address)
    }

    /// Run the factory
    pub fn build(&self, platform: &PlatformDescriptor) -> DriverResult<Driver> {
        (self.factory)(platform)
    }
}

impl core::fmt::Debug for DriverBinding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriverBinding")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("required", &self.required)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Ordered set of driver bindings
#[derive(Debug, Default)]
pub struct DriverCatalog {
    bindings: Vec<DriverBinding>,
}

impl DriverCatalog {
    /// Catalog with no bindings (every class falls back to null drivers)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Simulated drivers shipped with EdgeOS
    pub fn standard() -> Self {
        Self::empty()
            .with_binding(DriverBinding::new(
                "sim-axis",
                DeviceClass::Motion,
                PlatformFeatures::MOTION,
                DeviceAddress::Virtual,
                |_| Ok(Driver::motion(SimulatedAxis::new(Workspace::cube(1000.0)))),
            ))
            .with_binding(DriverBinding::new(
                "can0",
                DeviceClass::DigitalBus,
                PlatformFeatures::CAN,
                DeviceAddress::Bus { bus: 0, address: 0 },
                |_| Ok(Driver::digital_bus(LoopbackBus::new(BusProtocol::Can))),
            ))
            .with_binding(DriverBinding::new(
                "modbus0",
                DeviceClass::DigitalBus,
                PlatformFeatures::MODBUS,
                DeviceAddress::Bus { bus: 1, address: 0 },
                |_| Ok(Driver::digital_bus(LoopbackBus::new(BusProtocol::Modbus))),
            ))
            .with_binding(DriverBinding::new(
                "ecat0",
                DeviceClass::DigitalBus,
                PlatformFeatures::ETHERCAT,
                DeviceAddress::Bus { bus: 2, address: 0 },
                |_| Ok(Driver::digital_bus(LoopbackBus::new(BusProtocol::EtherCat))),
            ))
            .with_binding(DriverBinding::new(
                "adc0",
                DeviceClass::AnalogIo,
                PlatformFeatures::ADC | PlatformFeatures::DAC,
                DeviceAddress::Virtual,
                |_| Ok(Driver::analog_io(SimulatedAdc::new(8))),
            ))
            .with_binding(DriverBinding::new(
                "uart0",
                DeviceClass::SerialBus,
                PlatformFeatures::UART,
                // QEMU virt PL011 UART base address
                DeviceAddress::Mmio { base: 0x0900_0000, size: 0x1000 },
                |_| Ok(Driver::serial_bus(LoopbackSerial::new())),
            ))
            .with_binding(DriverBinding::new(
                "imu-fusion",
                DeviceClass::SensorFusion,
                PlatformFeatures::IMU,
                DeviceAddress::Virtual,
                |_| ComplementaryFilter::new(0.98, 0.01).map(Driver::sensor_fusion),
            ))
    }

    /// Append a binding
    pub fn with_binding(mut self, binding: DriverBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Bindings for `class` that `platform` can host, in catalog order
    pub fn matching<'a>(
        &'a self,
        class: DeviceClass,
        platform: &'a PlatformDescriptor,
    ) -> impl Iterator<Item = &'a DriverBinding> + 'a {
        self.bindings
            .iter()
            .filter(move |b| b.class == class && b.matches(platform))
    }

    /// Every binding, in catalog order
    pub fn bindings(&self) -> &[DriverBinding] {
        &self.bindings
    }
}
