//! hwmon command implementation
//!
//! Shows the GPUs the hwmon backend discovers and their readings.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, HwmonEntry, HwmonList};
use crate::config::Config;
use crate::error::Result;
use crate::hwmon::HwmonMonitor;

/// Collect hwmon sources, optionally a single ordinal
pub fn hwmon_list(monitor: &HwmonMonitor, ordinal: Option<u32>) -> HwmonList {
    let sources = monitor
        .discover()
        .iter()
        .filter(|s| ordinal.map_or(true, |o| o == s.ordinal))
        .map(HwmonEntry::from)
        .collect();

    HwmonList {
        root: monitor.root().to_path_buf(),
        sources,
    }
}

/// Execute the hwmon command
pub fn run_hwmon(config: &Config, ordinal: Option<u32>, format: OutputFormat) -> Result<()> {
    let monitor = HwmonMonitor::new(&config.hwmon.root);
    if !monitor.is_present() {
        log::warn!("{} does not exist", monitor.root().display());
    }

    print_output(&hwmon_list(&monitor, ordinal), format)?;
    Ok(())
}
