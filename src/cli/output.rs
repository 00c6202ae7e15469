//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::backend::{BackendKind, GpuAddress};
use crate::cli::args::OutputFormat;
use crate::domain::{ClockSample, DeviceIds, GpuInfo, PowerSample, ThermalSample};
use crate::hwmon::HwmonSource;
use crate::services::DeviceReport;

use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

impl TableDisplay for GpuInfo {
    fn to_table(&self) -> String {
        format!("[{}] {} (Bus: {}, PCI: {})", self.index, self.name, self.bus, self.pci_bus_id)
    }

    fn to_compact(&self) -> String {
        format!("{}:{}", self.index, self.short_name())
    }
}

impl TableDisplay for DeviceReport {
    fn to_table(&self) -> String {
        let mut output = format!("GPUs Found: {}\n\n", self.device_count);

        for gpu in &self.devices {
            output.push_str(&gpu.to_table());
            output.push('\n');
        }

        if let Some(failure) = &self.failure {
            output.push_str(&format!("\n✗ {}\n", failure));
            let unreached = self.unreached();
            if !unreached.is_empty() {
                output.push_str(&format!(
                    "  Not reached: {} more GPU(s)\n",
                    unreached.end - unreached.start
                ));
            }
        }

        output
    }

    fn to_compact(&self) -> String {
        self.devices
            .iter()
            .map(|g| g.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Every telemetry reading for one GPU
///
/// Unknown readings are shown with the host sentinels: `-1` for
/// temperature and fan, `0` for clocks, power and ids.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub backend: BackendKind,
    pub bus: u32,
    pub ordinal: u32,
    pub temperature_celsius: f32,
    pub fan_percent: i32,
    pub core_clock_mhz: u32,
    pub memory_clock_mhz: u32,
    pub default_core_clock_mhz: u32,
    pub default_memory_clock_mhz: u32,
    pub power_watts: u32,
    pub power_limit_watts: u32,
    pub vendor_id: u16,
    pub device_id: u16,
    pub subsystem_vendor_id: u16,
    pub subsystem_device_id: u16,
}

impl QueryOutput {
    pub fn new(
        backend: BackendKind,
        gpu: GpuAddress,
        thermal: ThermalSample,
        clocks: ClockSample,
        default_clocks: ClockSample,
        power: PowerSample,
        ids: DeviceIds,
    ) -> Self {
        Self {
            backend,
            bus: gpu.bus.as_u32(),
            ordinal: gpu.ordinal,
            temperature_celsius: thermal.temperature_or_sentinel(),
            fan_percent: thermal.fan_or_sentinel(),
            core_clock_mhz: clocks.core.as_mhz(),
            memory_clock_mhz: clocks.memory.as_mhz(),
            default_core_clock_mhz: default_clocks.core.as_mhz(),
            default_memory_clock_mhz: default_clocks.memory.as_mhz(),
            power_watts: power.usage_watts(),
            power_limit_watts: power.limit_watts(),
            vendor_id: ids.vendor_id,
            device_id: ids.device_id,
            subsystem_vendor_id: ids.subsystem_vendor_id,
            subsystem_device_id: ids.subsystem_device_id,
        }
    }
}

impl TableDisplay for QueryOutput {
    fn to_table(&self) -> String {
        format!(
            "Bus {} ({})\n  Temperature: {}\n  Fan: {}\n  Clocks: {} / {} MHz (default {} / {} MHz)\n  Power: {}W / {}W\n  IDs: {:04x}:{:04x} ({:04x}:{:04x})",
            self.bus,
            self.backend,
            if self.temperature_celsius < 0.0 {
                "unknown".to_string()
            } else {
                format!("{}°C", self.temperature_celsius)
            },
            if self.fan_percent < 0 {
                "unknown".to_string()
            } else {
                format!("{}%", self.fan_percent)
            },
            self.core_clock_mhz,
            self.memory_clock_mhz,
            self.default_core_clock_mhz,
            self.default_memory_clock_mhz,
            self.power_watts,
            self.power_limit_watts,
            self.vendor_id,
            self.device_id,
            self.subsystem_vendor_id,
            self.subsystem_device_id
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.bus,
            self.temperature_celsius,
            self.fan_percent,
            self.core_clock_mhz,
            self.memory_clock_mhz,
            self.power_watts
        )
    }
}

/// One hwmon source with its current reading
#[derive(Debug, Clone, Serialize)]
pub struct HwmonEntry {
    pub ordinal: u32,
    pub path: PathBuf,
    pub temperature_celsius: f32,
    pub fan_percent: i32,
}

impl From<&HwmonSource> for HwmonEntry {
    fn from(source: &HwmonSource) -> Self {
        let sample = source.sample();
        Self {
            ordinal: source.ordinal,
            path: source.path.clone(),
            temperature_celsius: sample.temperature_or_sentinel(),
            fan_percent: sample.fan_or_sentinel(),
        }
    }
}

/// hwmon sources for display
#[derive(Debug, Clone, Serialize)]
pub struct HwmonList {
    pub root: PathBuf,
    pub sources: Vec<HwmonEntry>,
}

impl TableDisplay for HwmonList {
    fn to_table(&self) -> String {
        let mut output = format!(
            "hwmon root: {}\nGPUs Found: {}\n\n",
            self.root.display(),
            self.sources.len()
        );

        for s in &self.sources {
            output.push_str(&format!(
                "[{}] {}: {}°C, fan {}%\n",
                s.ordinal,
                s.path.display(),
                s.temperature_celsius,
                s.fan_percent
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        self.sources
            .iter()
            .map(|s| format!("{}:{}/{}", s.ordinal, s.temperature_celsius, s.fan_percent))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
