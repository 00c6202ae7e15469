//! Service layer for GPU telemetry
//!
//! Services sit on top of the [`NvmlApi`](crate::nvml::NvmlApi) seam:
//! bus-addressed telemetry reads and the device enumeration report.

pub mod report;
pub mod telemetry;

pub use report::{enumerate, DeviceReport, ReportFailure, ReportStage};
pub use telemetry::Telemetry;
