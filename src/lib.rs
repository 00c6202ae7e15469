//! gpumon - GPU telemetry layer
//!
//! Uniform, bus-addressed temperature, fan, clock, power and identity
//! queries over a dynamically loaded NVML or the Linux hwmon interface.
//! Queries never fail: anything that cannot be read comes back as an
//! "unknown" value.
//!
//! # Modules
//!
//! - [`backend`]: Backend trait and one-time selection
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Telemetry value types
//! - [`error`]: Error types
//! - [`hwmon`]: Linux hwmon polling backend
//! - [`nvml`]: NVML loader, bindings and device resolution
//! - [`services`]: Telemetry façade and enumeration report

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod hwmon;
pub mod nvml;
pub mod services;

#[cfg(test)]
pub mod mock;

pub use backend::{select_monitor, GpuAddress, GpuMonitor, Vendor};
pub use error::{AppError, Result};
pub use nvml::{Capability, Loader};
pub use services::Telemetry;
