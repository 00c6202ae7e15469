//! Trait definitions for NVML device queries
//!
//! This trait abstracts the raw entry points so the resolver, the
//! telemetry façade and the enumeration report can run against mocks.

use crate::domain::{ClockDomain, ClockSpeed, FanSpeed, PciInfo, Power, Temperature};
use crate::error::NvmlError;

use std::fmt::Debug;

/// Per-call NVML operations
///
/// Every method maps to one entry point call. Handles are backend-local
/// and may be renumbered between calls, so callers re-resolve them from
/// a bus id on every query instead of holding on to them.
pub trait NvmlApi {
    /// Opaque backend-local device reference
    type Handle: Copy + PartialEq + Debug;

    /// Get the number of devices the library currently sees
    fn device_count(&self) -> Result<u32, NvmlError>;

    /// Get a handle for a backend-local index
    fn handle_by_index(&self, index: u32) -> Result<Self::Handle, NvmlError>;

    /// Get the PCI info block for a device
    fn pci_info(&self, device: Self::Handle) -> Result<PciInfo, NvmlError>;

    /// Get the marketing name of a device
    fn name(&self, device: Self::Handle) -> Result<String, NvmlError>;

    /// Get the GPU die temperature
    fn temperature(&self, device: Self::Handle) -> Result<Temperature, NvmlError>;

    /// Get the fan speed as a percentage
    fn fan_speed(&self, device: Self::Handle) -> Result<FanSpeed, NvmlError>;

    /// Get the current clock for a domain
    fn clock(&self, device: Self::Handle, domain: ClockDomain) -> Result<ClockSpeed, NvmlError>;

    /// Whether the default applications clock entry point is present
    fn supports_default_clocks(&self) -> bool;

    /// Get the default applications clock for a domain
    fn default_clock(
        &self,
        device: Self::Handle,
        domain: ClockDomain,
    ) -> Result<ClockSpeed, NvmlError>;

    /// Get the current board power draw
    fn power_usage(&self, device: Self::Handle) -> Result<Power, NvmlError>;

    /// Get the power management limit
    fn power_limit(&self, device: Self::Handle) -> Result<Power, NvmlError>;
}
