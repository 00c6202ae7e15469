//! Query command implementation
//!
//! Runs every telemetry read against one GPU on the selected backend.

use crate::backend::{BackendKind, GpuAddress, GpuMonitor};
use crate::cli::args::{OutputFormat, QueryArgs};
use crate::cli::output::{print_output, QueryOutput};
use crate::commands::with_monitor;
use crate::config::Config;
use crate::error::{NvmlError, Result};

/// Read every telemetry value for one GPU
pub fn query(monitor: &dyn GpuMonitor, gpu: GpuAddress) -> QueryOutput {
    let ids = monitor.device_ids(gpu);
    if monitor.kind() == BackendKind::Nvml && !ids.is_known() {
        log::warn!("{}", NvmlError::DeviceNotFound(gpu.bus));
    }

    QueryOutput::new(
        monitor.kind(),
        gpu,
        monitor.thermal(gpu),
        monitor.clocks(gpu),
        monitor.default_clocks(gpu),
        monitor.power(gpu),
        ids,
    )
}

/// Execute the query command
pub fn run_query(config: &Config, args: &QueryArgs, format: OutputFormat) -> Result<()> {
    let gpu = GpuAddress::new(args.bus, args.ordinal);

    with_monitor(config, |monitor| {
        if monitor.kind() == BackendKind::Disabled {
            log::warn!("GPU monitoring is disabled; every reading is unknown");
        }
        print_output(&query(monitor, gpu), format)?;
        Ok(())
    })
}
