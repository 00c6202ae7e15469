//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::backend::Vendor;
use crate::hwmon::DEFAULT_ROOT;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// NVML library settings
    pub nvml: NvmlConfig,
    /// hwmon backend settings
    pub hwmon: HwmonConfig,
}

/// General configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
    /// Vendor family to monitor
    pub vendor: Vendor,
}

/// NVML library configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NvmlConfig {
    /// Extra library locations, tried after the platform defaults
    pub library_paths: Vec<PathBuf>,
}

/// hwmon backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HwmonConfig {
    /// hwmon class directory
    pub root: PathBuf,
}

impl Default for HwmonConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
        }
    }
}
