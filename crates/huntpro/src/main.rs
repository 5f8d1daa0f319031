// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hunt Pro - field device manager.
//!
//! This is the binary entry point: it loads configuration, builds the
//! device manager, and dispatches to the subcommands in [`commands`].

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod plugins;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use huntpro_core::DeviceType;
use huntpro_pairing::{DeviceManager, ManagerOptions};

use crate::commands::PairArgs;

/// Hunt Pro - pair and manage field devices.
#[derive(Parser, Debug)]
#[command(name = "huntpro", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the active adapter for each device type.
    Adapters,
    /// Run plugin discovery and report diagnostics.
    Plugins,
    /// Pair a Bluetooth device.
    Pair {
        /// Device type (rangefinder, weather_meter, shot_timer, gps, chronograph).
        device_type: DeviceType,
        #[arg(long)]
        manufacturer: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        serial: String,
        #[arg(long)]
        firmware: Option<String>,
        /// Bluetooth address.
        #[arg(long)]
        address: String,
        /// Received signal strength in dBm.
        #[arg(long, allow_hyphen_values = true)]
        rssi: Option<i32>,
        /// Advertised service (repeatable).
        #[arg(long = "service")]
        services: Vec<String>,
        /// Metadata entry as key=value; values are parsed as JSON when possible (repeatable).
        #[arg(long = "meta")]
        metadata: Vec<String>,
        /// Override the configured pairing timeout.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Pair the simulated diagnostic devices and list them.
    Simulate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => huntpro_config::load_and_validate_path(path),
        None => huntpro_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            huntpro_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let Some(command) = cli.command else {
        println!("huntpro: use --help for available commands");
        return;
    };

    let source = Arc::new(plugins::link_all(DeviceManager::manifest_source(&config)));
    let mut options = ManagerOptions::from_config(&config.devices);
    // `plugins` runs discovery itself.
    if matches!(command, Commands::Plugins) {
        options.auto_load_plugins = false;
    }
    let manager = DeviceManager::new(options, huntpro_adapters::builtin_adapters(&config.adapters), source);

    let result = match command {
        Commands::Adapters => commands::run_adapters(&manager, cli.json),
        Commands::Plugins => commands::run_plugins(&manager, cli.json),
        Commands::Pair {
            device_type,
            manufacturer,
            model,
            serial,
            firmware,
            address,
            rssi,
            services,
            metadata,
            timeout_ms,
        } => {
            let args = PairArgs {
                device_type,
                manufacturer,
                model,
                serial,
                firmware,
                address,
                rssi,
                services,
                metadata,
                timeout_ms,
            };
            commands::run_pair(&manager, args, cli.json).await
        }
        Commands::Simulate => commands::run_simulate(&manager, cli.json).await,
    };

    if let Err(e) = result {
        eprintln!("huntpro: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("huntpro={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = huntpro_config::load_and_validate_str("").expect("default config should be valid");
        assert!(config.devices.auto_load_plugins);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn pair_arguments_parse() {
        let cli = Cli::try_parse_from([
            "huntpro",
            "pair",
            "shot_timer",
            "--manufacturer",
            "ShotSense",
            "--model",
            "Echo",
            "--serial",
            "ST-1",
            "--address",
            "AA:BB",
            "--rssi",
            "-70",
            "--service",
            "huntpro.shot_timer",
            "--meta",
            "min_split_ms=60",
            "--meta",
            "sensitivity_db=95",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Pair {
                device_type,
                rssi,
                metadata,
                ..
            }) => {
                assert_eq!(device_type, DeviceType::ShotTimer);
                assert_eq!(rssi, Some(-70));
                assert_eq!(metadata.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_device_type_is_a_usage_error() {
        assert!(Cli::try_parse_from(["huntpro", "pair", "thermal_scope"]).is_err());
    }
}
