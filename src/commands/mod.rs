//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod hwmon;
pub mod list;
pub mod query;

pub use hwmon::run_hwmon;
pub use list::run_list;
pub use query::run_query;

use crate::backend::{select_monitor, GpuMonitor, Vendor};
use crate::config::Config;
use crate::error::{NvmlError, Result};
use crate::nvml::loader::LibraryOpener;
use crate::nvml::{Capability, Loader};

/// Run `f` against the backend selected by `config`
///
/// NVML is only loaded when the vendor allows it, and is shut down
/// after `f` returns.
pub fn with_monitor<T>(config: &Config, f: impl FnOnce(&dyn GpuMonitor) -> Result<T>) -> Result<T> {
    let loader = Loader::new(config.nvml.library_paths.iter().cloned());
    monitor_with_loader(loader, config, f)
}

fn monitor_with_loader<O: LibraryOpener, T>(
    loader: Loader<O>,
    config: &Config,
    f: impl FnOnce(&dyn GpuMonitor) -> Result<T>,
) -> Result<T> {
    let result = {
        let skipped = Capability::Unavailable(NvmlError::Unavailable);
        let capability = match config.general.vendor {
            Vendor::Auto | Vendor::Nvidia => loader.initialize(),
            Vendor::Amd | Vendor::None => &skipped,
        };
        let monitor = select_monitor(config.general.vendor, capability, &config.hwmon.root);
        f(monitor.as_ref())
    };

    release(loader);
    result
}

/// Shut NVML down; a failure is logged and never changes the outcome
pub(crate) fn release<O: LibraryOpener>(loader: Loader<O>) {
    if let Err(e) = loader.shutdown() {
        log::warn!("NVML: Unable to shut down: {e}");
    }
}
