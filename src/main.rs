//! gpumon - GPU telemetry diagnostics
//!
//! A command-line front end for the gpumon library: lists NVML devices,
//! queries telemetry by PCI bus and inspects the hwmon backend.

use clap::Parser;
use gpumon::cli::args::{generate_completions, Cli, Commands};
use gpumon::commands::{run_hwmon, run_list, run_query};
use gpumon::config::{Config, ConfigBuilder};
use gpumon::error::{AppError, NvmlError};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| {
        if config.general.verbose {
            log::set_max_level(log::LevelFilter::Debug);
        }
        run(&cli, &config)
    });

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    Ok(ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_verbose(cli.verbose.then_some(true))
        .with_vendor(cli.vendor)
        .with_library_paths(cli.library.clone())
        .with_hwmon_root(cli.hwmon_root.clone())
        .build())
}

fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    match &cli.command {
        Commands::List => run_list(config, cli.format),

        Commands::Query(args) => run_query(config, args, cli.format),

        Commands::Hwmon { ordinal } => run_hwmon(config, *ordinal, cli.format),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Nvml(NvmlError::LibraryNotFound) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      Extra library locations can be given with --library.");
        }
        AppError::Nvml(NvmlError::SymbolMissing(_)) => {
            eprintln!();
            eprintln!("Hint: The NVML library found is too old or not NVML at all.");
        }
        AppError::Nvml(NvmlError::InitializationFailed(_)) => {
            eprintln!();
            eprintln!("Hint: Check that the NVIDIA kernel module is loaded ('nvidia-smi').");
        }
        AppError::MonitoringDisabled(_) => {
            eprintln!();
            eprintln!("Hint: Use --vendor nvidia or --vendor auto.");
        }
        _ => {}
    }
}
