//! List command implementation
//!
//! Lists every GPU NVML can see, stopping at the first one that fails.

use crate::backend::Vendor;
use crate::cli::args::OutputFormat;
use crate::cli::output::print_output;
use crate::commands::release;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::nvml::{Loader, NativeNvml};
use crate::services::enumerate;

/// Execute the list command
pub fn run_list(config: &Config, format: OutputFormat) -> Result<()> {
    if matches!(config.general.vendor, Vendor::Amd | Vendor::None) {
        return Err(AppError::MonitoringDisabled(format!(
            "listing needs NVML, but vendor is set to '{}'",
            config.general.vendor
        )));
    }

    let loader = Loader::new(config.nvml.library_paths.iter().cloned());
    let capability = loader.initialize();
    if let Some(err) = capability.error() {
        return Err(err.clone().into());
    }

    let report = enumerate(&NativeNvml::new(capability));
    let printed = match &report {
        Ok(report) => print_output(report, format).map_err(AppError::from),
        Err(_) => Ok(()),
    };

    release(loader);
    report?;
    printed
}
