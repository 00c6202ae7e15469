//! Backend selection
//!
//! The NVML façade, the hwmon reader and a disabled stub all sit behind
//! [`GpuMonitor`]. One of them is picked at startup from the configured
//! vendor and what the machine actually offers.

use crate::domain::{BusId, ClockSample, DeviceIds, PowerSample, ThermalSample};
use crate::hwmon::HwmonMonitor;
use crate::nvml::{Capability, NativeNvml, NvmlApi};
use crate::services::Telemetry;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How a caller addresses one GPU
///
/// NVML looks devices up by PCI bus; hwmon only knows the ordinal of a
/// chip in probe order. Callers pass both and each backend uses its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GpuAddress {
    pub bus: BusId,
    pub ordinal: u32,
}

impl GpuAddress {
    pub fn new(bus: u32, ordinal: u32) -> Self {
        Self {
            bus: BusId::new(bus),
            ordinal,
        }
    }
}

/// Which vendor family to monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// NVML if it loads, else hwmon, else nothing
    #[default]
    Auto,
    /// NVIDIA through NVML
    Nvidia,
    /// AMD through hwmon
    Amd,
    /// Monitoring disabled
    None,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Auto => write!(f, "auto"),
            Vendor::Nvidia => write!(f, "nvidia"),
            Vendor::Amd => write!(f, "amd"),
            Vendor::None => write!(f, "none"),
        }
    }
}

/// Backend variant behind a [`GpuMonitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Nvml,
    Hwmon,
    Disabled,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Nvml => write!(f, "NVML"),
            BackendKind::Hwmon => write!(f, "hwmon"),
            BackendKind::Disabled => write!(f, "disabled"),
        }
    }
}

/// Uniform telemetry surface over every backend
///
/// Readings a backend cannot provide report their "unknown" value.
pub trait GpuMonitor {
    fn kind(&self) -> BackendKind;

    fn thermal(&self, _gpu: GpuAddress) -> ThermalSample {
        ThermalSample::UNKNOWN
    }

    fn clocks(&self, _gpu: GpuAddress) -> ClockSample {
        ClockSample::UNKNOWN
    }

    fn default_clocks(&self, _gpu: GpuAddress) -> ClockSample {
        ClockSample::UNKNOWN
    }

    fn power(&self, _gpu: GpuAddress) -> PowerSample {
        PowerSample::UNKNOWN
    }

    fn device_ids(&self, _gpu: GpuAddress) -> DeviceIds {
        DeviceIds::UNKNOWN
    }
}

impl<A: NvmlApi> GpuMonitor for Telemetry<A> {
    fn kind(&self) -> BackendKind {
        BackendKind::Nvml
    }

    fn thermal(&self, gpu: GpuAddress) -> ThermalSample {
        Telemetry::thermal(self, gpu.bus)
    }

    fn clocks(&self, gpu: GpuAddress) -> ClockSample {
        Telemetry::clocks(self, gpu.bus)
    }

    fn default_clocks(&self, gpu: GpuAddress) -> ClockSample {
        Telemetry::default_clocks(self, gpu.bus)
    }

    fn power(&self, gpu: GpuAddress) -> PowerSample {
        Telemetry::power(self, gpu.bus)
    }

    fn device_ids(&self, gpu: GpuAddress) -> DeviceIds {
        Telemetry::device_ids(self, gpu.bus)
    }
}

impl GpuMonitor for HwmonMonitor {
    fn kind(&self) -> BackendKind {
        BackendKind::Hwmon
    }

    fn thermal(&self, gpu: GpuAddress) -> ThermalSample {
        self.query(gpu.ordinal)
    }
}

/// Backend that reports nothing
#[derive(Debug, Clone, Default)]
pub struct DisabledMonitor {
    reason: String,
}

impl DisabledMonitor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl GpuMonitor for DisabledMonitor {
    fn kind(&self) -> BackendKind {
        BackendKind::Disabled
    }
}

/// Whether NVML loaded and its init call succeeded
pub fn nvml_ready<L>(capability: &Capability<L>) -> bool {
    capability
        .library()
        .is_some_and(|lib| lib.init_status().is_ok())
}

fn nvml_disabled_reason<L>(capability: &Capability<L>) -> String {
    capability
        .error()
        .map_or_else(|| "NVML is not available".to_string(), |e| e.to_string())
}

/// Pick the backend for this process
///
/// `capability` must come from a loader that has already run; it is
/// only read here.
pub fn select_monitor<'a, L>(
    vendor: Vendor,
    capability: &'a Capability<L>,
    hwmon_root: &Path,
) -> Box<dyn GpuMonitor + 'a> {
    let nvml = || -> Box<dyn GpuMonitor + 'a> {
        Box::new(Telemetry::new(NativeNvml::new(capability)))
    };
    let hwmon = || -> Box<dyn GpuMonitor + 'a> { Box::new(HwmonMonitor::new(hwmon_root)) };

    let monitor: Box<dyn GpuMonitor + 'a> = match vendor {
        Vendor::None => Box::new(DisabledMonitor::new("monitoring disabled by configuration")),
        Vendor::Nvidia if nvml_ready(capability) => nvml(),
        Vendor::Nvidia => Box::new(DisabledMonitor::new(nvml_disabled_reason(capability))),
        Vendor::Amd => hwmon(),
        Vendor::Auto if nvml_ready(capability) => nvml(),
        Vendor::Auto if cfg!(target_os = "linux") && hwmon_root.is_dir() => hwmon(),
        Vendor::Auto => Box::new(DisabledMonitor::new("no GPU monitoring backend found")),
    };

    log::debug!("Monitoring backend: {} (vendor {vendor})", monitor.kind());
    monitor
}
