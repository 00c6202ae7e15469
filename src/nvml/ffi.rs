//! Raw NVML C interface
//!
//! Function signatures for every entry point this crate binds, the PCI
//! info buffer they fill, and a wrapper for NVML return codes.

use nvml_wrapper_sys::bindings::{
    nvmlClockType_t, nvmlDevice_t, nvmlReturn_enum_NVML_ERROR_DRIVER_NOT_LOADED,
    nvmlReturn_enum_NVML_ERROR_GPU_IS_LOST, nvmlReturn_enum_NVML_ERROR_INSUFFICIENT_SIZE,
    nvmlReturn_enum_NVML_ERROR_INVALID_ARGUMENT, nvmlReturn_enum_NVML_ERROR_NOT_FOUND,
    nvmlReturn_enum_NVML_ERROR_NOT_SUPPORTED, nvmlReturn_enum_NVML_ERROR_NO_PERMISSION,
    nvmlReturn_enum_NVML_ERROR_UNINITIALIZED, nvmlReturn_enum_NVML_ERROR_UNKNOWN,
    nvmlReturn_enum_NVML_SUCCESS, nvmlReturn_t, nvmlTemperatureSensors_t,
};
use serde::Serialize;
use std::ffi::CStr;
use std::fmt;
use std::os::raw::{c_char, c_uint};

pub type InitFn = unsafe extern "C" fn() -> nvmlReturn_t;
pub type ShutdownFn = unsafe extern "C" fn() -> nvmlReturn_t;
pub type ErrorStringFn = unsafe extern "C" fn(nvmlReturn_t) -> *const c_char;
pub type DeviceCountFn = unsafe extern "C" fn(*mut c_uint) -> nvmlReturn_t;
pub type HandleByIndexFn = unsafe extern "C" fn(c_uint, *mut nvmlDevice_t) -> nvmlReturn_t;
pub type PciInfoFn = unsafe extern "C" fn(nvmlDevice_t, *mut RawPciInfo) -> nvmlReturn_t;
pub type NameFn = unsafe extern "C" fn(nvmlDevice_t, *mut c_char, c_uint) -> nvmlReturn_t;
pub type TemperatureFn =
    unsafe extern "C" fn(nvmlDevice_t, nvmlTemperatureSensors_t, *mut c_uint) -> nvmlReturn_t;
pub type FanSpeedFn = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint) -> nvmlReturn_t;
pub type ClockFn = unsafe extern "C" fn(nvmlDevice_t, nvmlClockType_t, *mut c_uint) -> nvmlReturn_t;
pub type PowerFn = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint) -> nvmlReturn_t;

/// Length of the leading bus id string shared by every PCI info layout
pub const PCI_BUS_ID_LEGACY_LEN: usize = 16;

/// Buffer size `nvmlDeviceGetName` expects at minimum
pub const DEVICE_NAME_BUFFER_SIZE: usize = 64;

/// PCI info buffer handed to `nvmlDeviceGetPciInfo*`
///
/// The legacy, v2 and v3 layouts differ only after `pci_sub_system_id`
/// (reserved words, or a 32-byte bus id string). The buffer is sized for
/// the widest of them and only the shared prefix is read back.
#[repr(C)]
pub struct RawPciInfo {
    pub bus_id: [c_char; PCI_BUS_ID_LEGACY_LEN],
    pub domain: c_uint,
    pub bus: c_uint,
    pub device: c_uint,
    pub pci_device_id: c_uint,
    pub pci_sub_system_id: c_uint,
    tail: [c_char; 32],
}

impl RawPciInfo {
    pub fn zeroed() -> Self {
        Self {
            bus_id: [0; PCI_BUS_ID_LEGACY_LEN],
            domain: 0,
            bus: 0,
            device: 0,
            pci_device_id: 0,
            pci_sub_system_id: 0,
            tail: [0; 32],
        }
    }

    /// Bus id string, stopping at the first NUL or the end of the field
    pub fn bus_id_string(&self) -> String {
        c_chars_to_string(&self.bus_id)
    }
}

/// Convert a fixed-size C character buffer to a String
///
/// Reads up to the first NUL; a buffer without one is read in full.
pub fn c_chars_to_string(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Read a NUL-terminated C string owned by the library
///
/// # Safety
/// `ptr` must be null or point to a valid NUL-terminated string.
pub unsafe fn c_str_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// NVML return code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReturnCode(pub nvmlReturn_t);

impl ReturnCode {
    pub const SUCCESS: Self = Self(nvmlReturn_enum_NVML_SUCCESS);
    pub const UNINITIALIZED: Self = Self(nvmlReturn_enum_NVML_ERROR_UNINITIALIZED);
    pub const INVALID_ARGUMENT: Self = Self(nvmlReturn_enum_NVML_ERROR_INVALID_ARGUMENT);
    pub const NOT_SUPPORTED: Self = Self(nvmlReturn_enum_NVML_ERROR_NOT_SUPPORTED);
    pub const NO_PERMISSION: Self = Self(nvmlReturn_enum_NVML_ERROR_NO_PERMISSION);
    pub const NOT_FOUND: Self = Self(nvmlReturn_enum_NVML_ERROR_NOT_FOUND);
    pub const INSUFFICIENT_SIZE: Self = Self(nvmlReturn_enum_NVML_ERROR_INSUFFICIENT_SIZE);
    pub const DRIVER_NOT_LOADED: Self = Self(nvmlReturn_enum_NVML_ERROR_DRIVER_NOT_LOADED);
    pub const GPU_IS_LOST: Self = Self(nvmlReturn_enum_NVML_ERROR_GPU_IS_LOST);
    pub const UNKNOWN: Self = Self(nvmlReturn_enum_NVML_ERROR_UNKNOWN);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    /// Human-readable name for well-known codes
    ///
    /// Used when `nvmlErrorString` did not resolve.
    pub fn describe(&self) -> &'static str {
        match *self {
            Self::SUCCESS => "Success",
            Self::UNINITIALIZED => "Uninitialized",
            Self::INVALID_ARGUMENT => "Invalid Argument",
            Self::NOT_SUPPORTED => "Not Supported",
            Self::NO_PERMISSION => "Insufficient Permissions",
            Self::NOT_FOUND => "Not Found",
            Self::INSUFFICIENT_SIZE => "Insufficient Size",
            Self::DRIVER_NOT_LOADED => "Driver Not Loaded",
            Self::GPU_IS_LOST => "GPU is lost",
            _ => "Unknown Error",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {} ({})", self.0, self.describe())
    }
}
