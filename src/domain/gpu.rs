//! GPU identity domain types
//!
//! Provides the PCI bus key, the PCI info block read from NVML, the
//! vendor/device identity derived from it, and the GpuInfo row used by
//! the enumeration report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical PCI bus number of a device
///
/// The sole external key into this crate. Backend-assigned indices are
/// never exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(u32);

impl BusId {
    /// Create a bus id from the raw bus number
    pub const fn new(bus: u32) -> Self {
        Self(bus)
    }

    /// Get the raw bus number
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BusId {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// PCI information reported by the backend for one device
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PciInfo {
    /// Bus id string, e.g. "0000:01:00.0"
    pub bus_id: String,
    /// PCI domain
    pub domain: u32,
    /// PCI bus number
    pub bus: u32,
    /// PCI device (slot) number
    pub device: u32,
    /// Combined device id: vendor in the low 16 bits, device in the high 16
    pub pci_device_id: u32,
    /// Combined subsystem id: vendor in the low 16 bits, device in the high 16
    pub pci_subsystem_id: u32,
}

impl PciInfo {
    /// The bus this device sits on
    pub fn bus(&self) -> BusId {
        BusId::new(self.bus)
    }
}

/// PCI vendor/device identity of a GPU
///
/// All-zero when the device could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceIds {
    pub vendor_id: u16,
    pub device_id: u16,
    pub subsystem_vendor_id: u16,
    pub subsystem_device_id: u16,
}

impl DeviceIds {
    /// Identity of an unresolved device
    pub const UNKNOWN: Self = Self {
        vendor_id: 0,
        device_id: 0,
        subsystem_vendor_id: 0,
        subsystem_device_id: 0,
    };

    /// Split the combined PCI id fields into their 16-bit halves
    pub fn from_pci(pci: &PciInfo) -> Self {
        Self {
            vendor_id: (pci.pci_device_id & 0xFFFF) as u16,
            device_id: (pci.pci_device_id >> 16) as u16,
            subsystem_vendor_id: (pci.pci_subsystem_id & 0xFFFF) as u16,
            subsystem_device_id: (pci.pci_subsystem_id >> 16) as u16,
        }
    }

    /// Whether any identity was read
    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }
}

impl fmt::Display for DeviceIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (subsystem {:04x}:{:04x})",
            self.vendor_id, self.device_id, self.subsystem_vendor_id, self.subsystem_device_id
        )
    }
}

/// One row of the device enumeration report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    /// Backend-local index at the time of enumeration
    pub index: u32,
    /// GPU name (e.g., "NVIDIA GeForce RTX 4090")
    pub name: String,
    /// PCI bus id string
    pub pci_bus_id: String,
    /// PCI bus number
    pub bus: BusId,
}

impl GpuInfo {
    /// Create a report row from a name and the device's PCI info
    pub fn new(index: u32, name: String, pci: &PciInfo) -> Self {
        Self {
            index,
            name,
            pci_bus_id: pci.bus_id.clone(),
            bus: pci.bus(),
        }
    }

    /// Get a short display name
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("NVIDIA ").unwrap_or(&self.name)
    }
}

impl fmt::Display for GpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPU {}: {} [{}]", self.index, self.name, self.pci_bus_id)
    }
}
