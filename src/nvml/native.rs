//! NvmlApi over a loaded capability
//!
//! Calls the entry points bound by the loader. Every call checks the
//! capability first, so a disabled capability never touches the library.

use crate::domain::{ClockDomain, ClockSpeed, FanSpeed, PciInfo, Power, Temperature};
use crate::error::NvmlError;
use crate::nvml::ffi::{c_chars_to_string, RawPciInfo, ReturnCode, DEVICE_NAME_BUFFER_SIZE};
use crate::nvml::loader::{Capability, LoadedLibrary};
use crate::nvml::symbols::Operation;
use crate::nvml::traits::NvmlApi;

use nvml_wrapper_sys::bindings::{
    nvmlClockType_enum_NVML_CLOCK_GRAPHICS, nvmlClockType_enum_NVML_CLOCK_MEM,
    nvmlClockType_enum_NVML_CLOCK_SM, nvmlClockType_t, nvmlDevice_t,
    nvmlTemperatureSensors_enum_NVML_TEMPERATURE_GPU,
};
use std::os::raw::{c_char, c_uint};

/// Raw NVML device handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHandle(nvmlDevice_t);

/// NVML queries through a capability snapshot
pub struct NativeNvml<'a, L = libloading::Library> {
    capability: &'a Capability<L>,
}

impl<'a, L> NativeNvml<'a, L> {
    pub fn new(capability: &'a Capability<L>) -> Self {
        Self { capability }
    }

    fn loaded(&self) -> Result<&'a LoadedLibrary<L>, NvmlError> {
        self.capability.library().ok_or(NvmlError::Unavailable)
    }

    /// Read one unsigned value through an out-pointer entry point
    fn read_u32(
        &self,
        operation: Operation,
        call: impl FnOnce(&LoadedLibrary<L>, *mut c_uint) -> Result<ReturnCode, NvmlError>,
    ) -> Result<u32, NvmlError> {
        let lib = self.loaded()?;
        let mut value: c_uint = 0;
        let code = call(lib, &mut value as *mut c_uint)?;
        lib.check(operation, code)?;
        Ok(value)
    }
}

fn clock_type(domain: ClockDomain) -> nvmlClockType_t {
    match domain {
        ClockDomain::Graphics => nvmlClockType_enum_NVML_CLOCK_GRAPHICS,
        ClockDomain::Sm => nvmlClockType_enum_NVML_CLOCK_SM,
        ClockDomain::Memory => nvmlClockType_enum_NVML_CLOCK_MEM,
    }
}

// SAFETY (all calls below): each entry point was bound under the C
// signature of its `Entrypoints` field, the device handle came from
// nvmlDeviceGetHandleByIndex, and every out-pointer refers to a live
// local of the expected size.
impl<L> NvmlApi for NativeNvml<'_, L> {
    type Handle = NativeHandle;

    fn device_count(&self) -> Result<u32, NvmlError> {
        self.read_u32(Operation::DeviceCount, |lib, out| {
            let f = lib.entry(Operation::DeviceCount, |e| e.device_count)?;
            Ok(ReturnCode(unsafe { f(out) }))
        })
    }

    fn handle_by_index(&self, index: u32) -> Result<NativeHandle, NvmlError> {
        let lib = self.loaded()?;
        let f = lib.entry(Operation::HandleByIndex, |e| e.handle_by_index)?;
        let mut device: nvmlDevice_t = std::ptr::null_mut();
        lib.check(
            Operation::HandleByIndex,
            ReturnCode(unsafe { f(index, &mut device) }),
        )?;
        if device.is_null() {
            return Err(NvmlError::Call {
                operation: Operation::HandleByIndex.label(),
                code: ReturnCode::UNKNOWN,
                message: "null device handle".to_string(),
            });
        }
        Ok(NativeHandle(device))
    }

    fn pci_info(&self, device: NativeHandle) -> Result<PciInfo, NvmlError> {
        let lib = self.loaded()?;
        let f = lib.entry(Operation::PciInfo, |e| e.pci_info)?;
        let mut raw = RawPciInfo::zeroed();
        lib.check(
            Operation::PciInfo,
            ReturnCode(unsafe { f(device.0, &mut raw) }),
        )?;
        Ok(PciInfo {
            bus_id: raw.bus_id_string(),
            domain: raw.domain,
            bus: raw.bus,
            device: raw.device,
            pci_device_id: raw.pci_device_id,
            pci_subsystem_id: raw.pci_sub_system_id,
        })
    }

    fn name(&self, device: NativeHandle) -> Result<String, NvmlError> {
        let lib = self.loaded()?;
        let f = lib.entry(Operation::Name, |e| e.name)?;
        let mut buf: [c_char; DEVICE_NAME_BUFFER_SIZE] = [0; DEVICE_NAME_BUFFER_SIZE];
        lib.check(
            Operation::Name,
            ReturnCode(unsafe { f(device.0, buf.as_mut_ptr(), buf.len() as c_uint) }),
        )?;
        Ok(c_chars_to_string(&buf))
    }

    fn temperature(&self, device: NativeHandle) -> Result<Temperature, NvmlError> {
        self.read_u32(Operation::Temperature, |lib, out| {
            let f = lib.entry(Operation::Temperature, |e| e.temperature)?;
            Ok(ReturnCode(unsafe {
                f(device.0, nvmlTemperatureSensors_enum_NVML_TEMPERATURE_GPU, out)
            }))
        })
        .map(Temperature::from)
    }

    fn fan_speed(&self, device: NativeHandle) -> Result<FanSpeed, NvmlError> {
        self.read_u32(Operation::FanSpeed, |lib, out| {
            let f = lib.entry(Operation::FanSpeed, |e| e.fan_speed)?;
            Ok(ReturnCode(unsafe { f(device.0, out) }))
        })
        .map(FanSpeed::from_percent_clamped)
    }

    fn clock(&self, device: NativeHandle, domain: ClockDomain) -> Result<ClockSpeed, NvmlError> {
        self.read_u32(Operation::ClockInfo, |lib, out| {
            let f = lib.entry(Operation::ClockInfo, |e| e.clock_info)?;
            Ok(ReturnCode(unsafe { f(device.0, clock_type(domain), out) }))
        })
        .map(ClockSpeed::new)
    }

    fn supports_default_clocks(&self) -> bool {
        self.loaded()
            .map(|lib| lib.entrypoints().default_clock.is_some())
            .unwrap_or(false)
    }

    fn default_clock(
        &self,
        device: NativeHandle,
        domain: ClockDomain,
    ) -> Result<ClockSpeed, NvmlError> {
        self.read_u32(Operation::DefaultClock, |lib, out| {
            let f = lib.entry(Operation::DefaultClock, |e| e.default_clock)?;
            Ok(ReturnCode(unsafe { f(device.0, clock_type(domain), out) }))
        })
        .map(ClockSpeed::new)
    }

    fn power_usage(&self, device: NativeHandle) -> Result<Power, NvmlError> {
        self.read_u32(Operation::PowerUsage, |lib, out| {
            let f = lib.entry(Operation::PowerUsage, |e| e.power_usage)?;
            Ok(ReturnCode(unsafe { f(device.0, out) }))
        })
        .map(Power::from_milliwatts)
    }

    fn power_limit(&self, device: NativeHandle) -> Result<Power, NvmlError> {
        self.read_u32(Operation::PowerLimit, |lib, out| {
            let f = lib.entry(Operation::PowerLimit, |e| e.power_limit)?;
            Ok(ReturnCode(unsafe { f(device.0, out) }))
        })
        .map(Power::from_milliwatts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{fake_entry, CountingOpener, FakeLibrary};
    use crate::nvml::loader::Loader;
    use nvml_wrapper_sys::bindings::{nvmlReturn_t, nvmlTemperatureSensors_t};
    use std::path::PathBuf;

    // Two fake devices: handle = index + 1, bus = index + 3.
    const DEVICES: c_uint = 2;

    extern "C" fn init() -> nvmlReturn_t {
        0
    }

    unsafe extern "C" fn device_count(count: *mut c_uint) -> nvmlReturn_t {
        *count = DEVICES;
        0
    }

    unsafe extern "C" fn handle_by_index(index: c_uint, device: *mut nvmlDevice_t) -> nvmlReturn_t {
        if index >= DEVICES {
            return ReturnCode::INVALID_ARGUMENT.0;
        }
        *device = (index as usize + 1) as nvmlDevice_t;
        0
    }

    unsafe extern "C" fn pci_info(device: nvmlDevice_t, pci: *mut RawPciInfo) -> nvmlReturn_t {
        let index = device as usize - 1;
        let pci = &mut *pci;
        pci.bus = index as c_uint + 3;
        pci.pci_device_id = 0x2684_10DE;
        for (dst, src) in pci.bus_id.iter_mut().zip(b"0000:03:00.0") {
            *dst = *src as c_char;
        }
        0
    }

    unsafe extern "C" fn temperature(
        _device: nvmlDevice_t,
        sensor: nvmlTemperatureSensors_t,
        temp: *mut c_uint,
    ) -> nvmlReturn_t {
        if sensor != nvmlTemperatureSensors_enum_NVML_TEMPERATURE_GPU {
            return ReturnCode::INVALID_ARGUMENT.0;
        }
        *temp = 61;
        0
    }

    unsafe extern "C" fn fan_speed(device: nvmlDevice_t, speed: *mut c_uint) -> nvmlReturn_t {
        if device as usize == 2 {
            return ReturnCode::NOT_SUPPORTED.0;
        }
        *speed = 47;
        0
    }

    unsafe extern "C" fn power_usage(_device: nvmlDevice_t, mw: *mut c_uint) -> nvmlReturn_t {
        *mw = 999;
        0
    }

    fn loader() -> Loader<CountingOpener> {
        let library = FakeLibrary::new()
            .with("nvmlInit_v2", fake_entry(init as *const ()))
            .with("nvmlDeviceGetCount_v2", fake_entry(device_count as *const ()))
            .with(
                "nvmlDeviceGetHandleByIndex_v2",
                fake_entry(handle_by_index as *const ()),
            )
            .with("nvmlDeviceGetPciInfo_v2", fake_entry(pci_info as *const ()))
            .with("nvmlDeviceGetTemperature", fake_entry(temperature as *const ()))
            .with("nvmlDeviceGetFanSpeed", fake_entry(fan_speed as *const ()))
            .with("nvmlDeviceGetPowerUsage", fake_entry(power_usage as *const ()));
        Loader::with_opener(CountingOpener::new(library), vec![PathBuf::from("nvml")])
    }

    #[test]
    fn test_enumerates_through_bound_entry_points() {
        let loader = loader();
        let nvml = NativeNvml::new(loader.initialize());

        assert_eq!(nvml.device_count().unwrap(), 2);
        let handle = nvml.handle_by_index(1).unwrap();
        let pci = nvml.pci_info(handle).unwrap();
        assert_eq!(pci.bus, 4);
        assert_eq!(pci.bus_id, "0000:03:00.0");
        assert!(nvml.handle_by_index(2).is_err());
    }

    #[test]
    fn test_reads_convert_units() {
        let loader = loader();
        let nvml = NativeNvml::new(loader.initialize());
        let handle = nvml.handle_by_index(0).unwrap();

        assert_eq!(nvml.temperature(handle).unwrap(), Temperature::from_celsius(61));
        assert_eq!(nvml.fan_speed(handle).unwrap().as_percentage(), 47);
        assert_eq!(nvml.power_usage(handle).unwrap().as_watts(), 0);
    }

    #[test]
    fn test_failed_call_reports_code() {
        let loader = loader();
        let nvml = NativeNvml::new(loader.initialize());
        let handle = nvml.handle_by_index(1).unwrap();

        match nvml.fan_speed(handle) {
            Err(NvmlError::Call { operation, code, message }) => {
                assert_eq!(operation, "nvmlDeviceGetFanSpeed");
                assert_eq!(code, ReturnCode::NOT_SUPPORTED);
                assert_eq!(message, "Not Supported");
            }
            other => panic!("expected call error, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_entry_point_is_not_supported() {
        let loader = loader();
        let nvml = NativeNvml::new(loader.initialize());
        let handle = nvml.handle_by_index(0).unwrap();

        assert!(!nvml.supports_default_clocks());
        assert!(matches!(
            nvml.clock(handle, ClockDomain::Sm),
            Err(NvmlError::NotSupported("nvmlDeviceGetClockInfo"))
        ));
        assert!(nvml.power_limit(handle).is_err());
    }

    #[test]
    fn test_disabled_capability_short_circuits() {
        let capability: Capability<FakeLibrary> = Capability::Unavailable(NvmlError::LibraryNotFound);
        let nvml = NativeNvml::new(&capability);

        assert!(matches!(nvml.device_count(), Err(NvmlError::Unavailable)));
        assert!(matches!(nvml.handle_by_index(0), Err(NvmlError::Unavailable)));
        assert!(!nvml.supports_default_clocks());
    }
}
