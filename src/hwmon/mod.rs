//! Kernel hwmon polling backend
//!
//! Reads temperature and fan duty cycle for GPUs that expose a hwmon
//! chip under sysfs. Chips are found by probing `hwmon0`, `hwmon1`, ...
//! and the scan ends at the first missing number, so a gap truncates
//! discovery. Only chips with a `pwm1` file count as GPUs; each one
//! takes the next ordinal in probe order.
//!
//! Nothing is cached: ordinals are recomputed on every query.

use crate::domain::{FanSpeed, Temperature, ThermalSample};

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default sysfs hwmon class directory
pub const DEFAULT_ROOT: &str = "/sys/class/hwmon";

const PWM_FILE: &str = "pwm1";
const TEMP_FILE: &str = "temp1_input";

/// A hwmon directory assigned a GPU ordinal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HwmonSource {
    pub ordinal: u32,
    pub path: PathBuf,
}

impl HwmonSource {
    /// Read this source's temperature and fan speed
    pub fn sample(&self) -> ThermalSample {
        ThermalSample {
            temperature: read_value::<i32>(&self.path.join(TEMP_FILE))
                .map(Temperature::from_millicelsius),
            fan: read_value::<u32>(&self.path.join(PWM_FILE)).map(FanSpeed::from_pwm),
        }
    }
}

/// hwmon backend rooted at a class directory
#[derive(Debug, Clone)]
pub struct HwmonMonitor {
    root: PathBuf,
}

impl Default for HwmonMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl HwmonMonitor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the class directory exists at all
    pub fn is_present(&self) -> bool {
        self.root.is_dir()
    }

    /// Walk `hwmon{n}` until the first gap, yielding GPU sources in order
    fn sources(&self) -> impl Iterator<Item = HwmonSource> + '_ {
        (0u32..)
            .map(|n| self.root.join(format!("hwmon{n}")))
            .take_while(|dir| dir.exists())
            .filter(|dir| dir.join(PWM_FILE).exists())
            .zip(0u32..)
            .map(|(path, ordinal)| HwmonSource { ordinal, path })
    }

    /// All GPU sources in ordinal order
    pub fn discover(&self) -> Vec<HwmonSource> {
        self.sources().collect()
    }

    /// Temperature and fan for the GPU at `ordinal`
    ///
    /// Unknown ordinals and unreadable files yield unknown fields; this
    /// never fails.
    pub fn query(&self, ordinal: u32) -> ThermalSample {
        match self.sources().find(|s| s.ordinal == ordinal) {
            Some(source) => {
                let sample = source.sample();
                log::trace!("hwmon: ordinal {ordinal} at {}: {sample}", source.path.display());
                sample
            }
            None => {
                log::trace!("hwmon: no source for ordinal {ordinal}");
                ThermalSample::UNKNOWN
            }
        }
    }
}

fn read_value<T: std::str::FromStr>(path: &Path) -> Option<T> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
