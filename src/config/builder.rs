//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::backend::Vendor;
use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

use std::path::{Path, PathBuf};

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file
    ///
    /// An explicit path must load; without one the default locations are
    /// searched and a missing file keeps the defaults.
    pub fn with_file(mut self, path: Option<&Path>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with CLI vendor
    pub fn with_vendor(mut self, vendor: Option<Vendor>) -> Self {
        if let Some(v) = vendor {
            self.config.general.vendor = v;
        }
        self
    }

    /// Append CLI library paths after the configured ones
    pub fn with_library_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.nvml.library_paths.extend(paths);
        self
    }

    /// Override with CLI hwmon root
    pub fn with_hwmon_root(mut self, root: Option<PathBuf>) -> Self {
        if let Some(r) = root {
            self.config.hwmon.root = r;
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
