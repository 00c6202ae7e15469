//! Domain models for gpumon
//!
//! Value types for the bus key and for each telemetry reading. Every
//! sample type has an `UNKNOWN` value standing in for "no reading".

pub mod fan;
pub mod gpu;
pub mod performance;
pub mod power;
pub mod thermal;

pub use fan::FanSpeed;
pub use gpu::{BusId, DeviceIds, GpuInfo, PciInfo};
pub use performance::{ClockDomain, ClockSample, ClockSpeed};
pub use power::{Power, PowerSample};
pub use thermal::{Temperature, ThermalSample};
