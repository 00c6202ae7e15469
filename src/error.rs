//! Unified error types for gpumon
//!
//! This module defines all error types used throughout the crate.
//! Uses thiserror for ergonomic error definitions.
//!
//! Query functions in [`crate::services`] never surface these; they fold
//! every failure into a sentinel reading. Errors only escape from setup
//! (configuration, library loading) and from the enumeration report.

use crate::domain::BusId;
use crate::nvml::ffi::ReturnCode;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from NVML operations
    #[error("NVML error: {0}")]
    Nvml(#[from] NvmlError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Monitoring is disabled for the selected vendor
    #[error("GPU monitoring is not available: {0}")]
    MonitoringDisabled(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the NVML capability and its entry points
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvmlError {
    /// No candidate library path could be opened
    #[error("NVML library not found. Is the NVIDIA driver installed?")]
    LibraryNotFound,

    /// A required entry point is missing from the loaded library
    #[error("NVML entry point not found: {0}")]
    SymbolMissing(&'static str),

    /// The init entry point returned a non-success code
    #[error("Failed to initialize NVML: {0}")]
    InitializationFailed(String),

    /// The capability was marked unavailable at startup
    #[error("NVML monitoring is disabled for this process")]
    Unavailable,

    /// The operation's entry point did not resolve at load time
    #[error("Operation not supported: {0}")]
    NotSupported(&'static str),

    /// An entry point returned a non-success code
    #[error("{operation} failed: {message} [{code}]")]
    Call {
        operation: &'static str,
        code: ReturnCode,
        message: String,
    },

    /// No device is attached at the requested PCI bus
    #[error("No GPU found on PCI bus {0}")]
    DeviceNotFound(BusId),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
