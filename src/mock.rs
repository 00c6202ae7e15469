//! Mock implementations for testing
//!
//! Provides a scriptable NVML backend and a fake dynamic library so the
//! loader, resolver and façade can be tested without real hardware.

use crate::domain::{ClockDomain, ClockSpeed, FanSpeed, PciInfo, Power, Temperature};
use crate::error::NvmlError;
use crate::nvml::ffi::ReturnCode;
use crate::nvml::loader::{DynamicLibrary, LibraryOpener};
use crate::nvml::symbols::{Operation, RawSymbol};
use crate::nvml::NvmlApi;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, OsStr};
use std::path::PathBuf;
use std::rc::Rc;

/// Mock GPU device for testing
#[derive(Debug, Clone)]
pub struct MockDevice {
    bus: u32,
    name: String,
    temperature: Temperature,
    fan: FanSpeed,
    clocks: HashMap<ClockDomain, ClockSpeed>,
    default_clocks: HashMap<ClockDomain, ClockSpeed>,
    power_usage: Power,
    power_limit: Power,
    pci_device_id: u32,
    pci_subsystem_id: u32,
    relocated_bus: Option<u32>,
    pci_reads: Cell<u32>,
    failing: HashSet<Operation>,
}

impl MockDevice {
    /// Create a new mock device on a PCI bus with default readings
    pub fn new(bus: u32) -> Self {
        let clocks = HashMap::from([
            (ClockDomain::Graphics, ClockSpeed::new(1755)),
            (ClockDomain::Sm, ClockSpeed::new(1740)),
            (ClockDomain::Memory, ClockSpeed::new(9501)),
        ]);
        let default_clocks = HashMap::from([
            (ClockDomain::Graphics, ClockSpeed::new(1410)),
            (ClockDomain::Memory, ClockSpeed::new(9501)),
        ]);

        Self {
            bus,
            name: format!("Mock GPU {}", bus),
            temperature: Temperature::from_celsius(45),
            fan: FanSpeed::from_percent_clamped(50),
            clocks,
            default_clocks,
            power_usage: Power::from_milliwatts(150_000),
            power_limit: Power::from_watts(300),
            pci_device_id: 0x2684_10DE,
            pci_subsystem_id: 0x1671_10DE,
            relocated_bus: None,
            pci_reads: Cell::new(0),
            failing: HashSet::new(),
        }
    }

    /// Builder: set name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: set temperature
    pub fn with_temperature(mut self, temp: Temperature) -> Self {
        self.temperature = temp;
        self
    }

    /// Builder: set fan speed
    pub fn with_fan(mut self, percent: u32) -> Self {
        self.fan = FanSpeed::from_percent_clamped(percent);
        self
    }

    /// Builder: set a current clock
    pub fn with_clock(mut self, domain: ClockDomain, mhz: u32) -> Self {
        self.clocks.insert(domain, ClockSpeed::new(mhz));
        self
    }

    /// Builder: set power draw and limit in milliwatts
    pub fn with_power(mut self, usage_mw: u32, limit_mw: u32) -> Self {
        self.power_usage = Power::from_milliwatts(usage_mw);
        self.power_limit = Power::from_milliwatts(limit_mw);
        self
    }

    /// Builder: set the raw PCI id words
    pub fn with_pci_ids(mut self, device_id: u32, subsystem_id: u32) -> Self {
        self.pci_device_id = device_id;
        self.pci_subsystem_id = subsystem_id;
        self
    }

    /// Builder: report a different bus after the first PCI read
    pub fn relocating_to(mut self, bus: u32) -> Self {
        self.relocated_bus = Some(bus);
        self
    }

    /// Builder: make an operation fail for this device
    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing.insert(operation);
        self
    }

    fn pci(&self) -> PciInfo {
        let reads = self.pci_reads.get();
        self.pci_reads.set(reads + 1);
        let bus = match self.relocated_bus {
            Some(moved) if reads > 0 => moved,
            _ => self.bus,
        };
        PciInfo {
            bus_id: format!("00000000:{:02X}:00.0", bus),
            domain: 0,
            bus,
            device: 0,
            pci_device_id: self.pci_device_id,
            pci_subsystem_id: self.pci_subsystem_id,
        }
    }
}

/// Handle into a [`MockNvml`] device list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockHandle(pub usize);

/// Mock NVML backend for testing
///
/// Devices can be swapped between calls to simulate renumbering, and
/// every call is counted per operation.
pub struct MockNvml {
    devices: RefCell<Vec<MockDevice>>,
    count_error: Option<NvmlError>,
    default_clocks: bool,
    calls: RefCell<HashMap<Operation, usize>>,
}

fn injected(operation: Operation) -> NvmlError {
    NvmlError::Call {
        operation: operation.label(),
        code: ReturnCode::UNKNOWN,
        message: ReturnCode::UNKNOWN.describe().to_string(),
    }
}

impl MockNvml {
    /// Create a mock backend with the given devices
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices: RefCell::new(devices),
            count_error: None,
            default_clocks: true,
            calls: RefCell::new(HashMap::new()),
        }
    }

    /// Create a mock backend with devices on buses `0..count`
    pub fn with_buses(count: u32) -> Self {
        Self::new((0..count).map(MockDevice::new).collect())
    }

    /// Builder: make the device count query fail
    pub fn with_count_error(mut self, error: NvmlError) -> Self {
        self.count_error = Some(error);
        self
    }

    /// Builder: drop the default applications clock entry point
    pub fn without_default_clocks(mut self) -> Self {
        self.default_clocks = false;
        self
    }

    /// Replace the device list, renumbering every index
    pub fn set_devices(&self, devices: Vec<MockDevice>) {
        *self.devices.borrow_mut() = devices;
    }

    /// Number of calls made for an operation
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.borrow().get(&operation).copied().unwrap_or(0)
    }

    /// Number of calls made across all operations
    pub fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }

    fn with_device<T>(
        &self,
        operation: Operation,
        handle: MockHandle,
        read: impl FnOnce(&MockDevice) -> T,
    ) -> Result<T, NvmlError> {
        *self.calls.borrow_mut().entry(operation).or_insert(0) += 1;
        let devices = self.devices.borrow();
        let device = devices.get(handle.0).ok_or(NvmlError::Call {
            operation: operation.label(),
            code: ReturnCode::INVALID_ARGUMENT,
            message: ReturnCode::INVALID_ARGUMENT.describe().to_string(),
        })?;
        if device.failing.contains(&operation) {
            return Err(injected(operation));
        }
        Ok(read(device))
    }
}

impl NvmlApi for MockNvml {
    type Handle = MockHandle;

    fn device_count(&self) -> Result<u32, NvmlError> {
        *self
            .calls
            .borrow_mut()
            .entry(Operation::DeviceCount)
            .or_insert(0) += 1;
        match &self.count_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.devices.borrow().len() as u32),
        }
    }

    fn handle_by_index(&self, index: u32) -> Result<MockHandle, NvmlError> {
        let handle = MockHandle(index as usize);
        self.with_device(Operation::HandleByIndex, handle, |_| handle)
    }

    fn pci_info(&self, device: MockHandle) -> Result<PciInfo, NvmlError> {
        self.with_device(Operation::PciInfo, device, MockDevice::pci)
    }

    fn name(&self, device: MockHandle) -> Result<String, NvmlError> {
        self.with_device(Operation::Name, device, |d| d.name.clone())
    }

    fn temperature(&self, device: MockHandle) -> Result<Temperature, NvmlError> {
        self.with_device(Operation::Temperature, device, |d| d.temperature)
    }

    fn fan_speed(&self, device: MockHandle) -> Result<FanSpeed, NvmlError> {
        self.with_device(Operation::FanSpeed, device, |d| d.fan)
    }

    fn clock(&self, device: MockHandle, domain: ClockDomain) -> Result<ClockSpeed, NvmlError> {
        self.with_device(Operation::ClockInfo, device, |d| {
            d.clocks.get(&domain).copied().unwrap_or_default()
        })
    }

    fn supports_default_clocks(&self) -> bool {
        self.default_clocks
    }

    fn default_clock(
        &self,
        device: MockHandle,
        domain: ClockDomain,
    ) -> Result<ClockSpeed, NvmlError> {
        if !self.default_clocks {
            return Err(NvmlError::NotSupported(Operation::DefaultClock.label()));
        }
        self.with_device(Operation::DefaultClock, device, |d| {
            d.default_clocks.get(&domain).copied().unwrap_or_default()
        })
    }

    fn power_usage(&self, device: MockHandle) -> Result<Power, NvmlError> {
        self.with_device(Operation::PowerUsage, device, |d| d.power_usage)
    }

    fn power_limit(&self, device: MockHandle) -> Result<Power, NvmlError> {
        self.with_device(Operation::PowerLimit, device, |d| d.power_limit)
    }
}

/// Wrap a test function as a resolved symbol
pub fn fake_entry(f: *const ()) -> RawSymbol {
    RawSymbol::new(f as *mut c_void).expect("function pointers are never null")
}

/// In-memory library with a fixed symbol set
#[derive(Debug, Clone, Default)]
pub struct FakeLibrary {
    symbols: HashMap<String, RawSymbol>,
    lookups: Rc<Cell<usize>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: export a symbol
    pub fn with(mut self, name: &str, symbol: RawSymbol) -> Self {
        self.symbols.insert(name.to_string(), symbol);
        self
    }
}

impl DynamicLibrary for FakeLibrary {
    fn symbol(&self, name: &str) -> Option<RawSymbol> {
        self.lookups.set(self.lookups.get() + 1);
        self.symbols.get(name).copied()
    }
}

/// Opener handing out a [`FakeLibrary`] and counting attempts
#[derive(Debug)]
pub struct CountingOpener {
    library: Option<FakeLibrary>,
    only_at: Option<PathBuf>,
    opens: Cell<usize>,
}

impl CountingOpener {
    /// Opener that succeeds on every path
    pub fn new(library: FakeLibrary) -> Self {
        Self {
            library: Some(library),
            only_at: None,
            opens: Cell::new(0),
        }
    }

    /// Opener that fails on every path
    pub fn failing() -> Self {
        Self {
            library: None,
            only_at: None,
            opens: Cell::new(0),
        }
    }

    /// Builder: only open the library at this path
    pub fn available_at(mut self, path: impl Into<PathBuf>) -> Self {
        self.only_at = Some(path.into());
        self
    }

    /// Number of open attempts
    pub fn opens(&self) -> usize {
        self.opens.get()
    }

    /// Number of symbol lookups made against the library
    pub fn lookups(&self) -> usize {
        self.library.as_ref().map_or(0, |lib| lib.lookups.get())
    }
}

impl LibraryOpener for CountingOpener {
    type Library = FakeLibrary;

    fn open(&self, path: &OsStr) -> Option<FakeLibrary> {
        self.opens.set(self.opens.get() + 1);
        if let Some(only) = &self.only_at {
            if only.as_os_str() != path {
                return None;
            }
        }
        self.library.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_counts_calls() {
        let nvml = MockNvml::with_buses(2);
        assert_eq!(nvml.device_count().unwrap(), 2);

        let handle = nvml.handle_by_index(1).unwrap();
        assert_eq!(nvml.pci_info(handle).unwrap().bus, 1);
        assert_eq!(nvml.calls(Operation::HandleByIndex), 1);
        assert_eq!(nvml.total_calls(), 3);
    }

    #[test]
    fn test_mock_out_of_range_handle() {
        let nvml = MockNvml::with_buses(1);
        assert!(nvml.handle_by_index(1).is_err());
    }

    #[test]
    fn test_mock_injected_failure() {
        let nvml = MockNvml::new(vec![MockDevice::new(3).failing(Operation::FanSpeed)]);
        let handle = nvml.handle_by_index(0).unwrap();
        assert!(nvml.fan_speed(handle).is_err());
        assert!(nvml.temperature(handle).is_ok());
    }

    #[test]
    fn test_counting_opener_path_filter() {
        let opener = CountingOpener::new(FakeLibrary::new()).available_at("/lib/a.so");
        assert!(opener.open(OsStr::new("/lib/b.so")).is_none());
        assert!(opener.open(OsStr::new("/lib/a.so")).is_some());
        assert_eq!(opener.opens(), 2);
    }
}
