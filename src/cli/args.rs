//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use crate::backend::Vendor;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// GPU telemetry diagnostics
///
/// Read temperature, fan, clock, power and identity data through NVML
/// or the Linux hwmon interface.
#[derive(Parser, Debug)]
#[command(name = "gpumon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GPUMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vendor backend to use
    #[arg(long, global = true, value_enum)]
    pub vendor: Option<Vendor>,

    /// Extra NVML library location (repeatable)
    #[arg(long = "library", global = true, value_name = "PATH")]
    pub library: Vec<PathBuf>,

    /// hwmon class directory
    #[arg(long, global = true, value_name = "DIR")]
    pub hwmon_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all GPUs visible to NVML
    List,

    /// Query telemetry for one GPU
    Query(QueryArgs),

    /// Show GPUs found through hwmon
    Hwmon {
        /// Only show this ordinal
        #[arg(short, long)]
        ordinal: Option<u32>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the query command
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// PCI bus number (decimal, or hex with 0x prefix)
    #[arg(short, long, value_parser = parse_bus)]
    pub bus: u32,

    /// hwmon ordinal, used when the hwmon backend is active
    #[arg(short, long, default_value = "0")]
    pub ordinal: u32,
}

fn parse_bus(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid bus number '{s}': {e}"))
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
