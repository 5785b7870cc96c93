//! # AltInput
//!
//! Fly with joysticks, throttles and gamepads.
//!
//! Binds the game controllers described in the configuration file and
//! drives a vehicle control state from them at a fixed tick rate.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load runtime settings and device bindings from one TOML file
//!    - Set up logging with tracing subscriber (and a rolling file if configured)
//!    - Bind and acquire every matching controller through evdev
//!
//! 2. **Main Loop**
//!    - Every tick: poll devices, merge, commit to the vehicle
//!    - Switch modes on `Flight`, `AltFlight` or `Ground` read from stdin
//!    - Record sampled telemetry when enabled
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Release every controller
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```
//!
//! Expected output:
//! ```text
//! INFO alt_input: AltInput v0.1.0 starting...
//! INFO alt_input::controller::device_list: AltInput: Added controller 'Thrustmaster T.16000M'
//! INFO alt_input: Starting input loop at 50Hz in Flight mode
//! ```

use anyhow::{Context, Result};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use alt_input::bindings::SectionStore;
use alt_input::config::{Config, LoggingConfig};
use alt_input::controller::{DeviceList, EvdevBackend};
use alt_input::flight::sink::SimulatedVehicle;
use alt_input::flight::{InputContext, Mode};
use alt_input::telemetry::{TelemetryLogger, TelemetryRecord};

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Ticks between status log messages
const STATUS_INTERVAL_TICKS: u64 = 500;

/// Installs the tracing subscriber.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    guard
}

/// Forwards mode names typed on stdin to the input loop.
async fn read_mode_commands(tx: mpsc::Sender<Mode>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match line.parse::<Mode>() {
                Ok(mode) => {
                    if tx.send(mode).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            },
            Ok(None) => break,
            Err(e) => {
                debug!("stdin closed: {}", e);
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path))?;
    let config = Config::parse(&contents).with_context(|| format!("Invalid configuration in {}", config_path))?;

    let _log_guard = init_logging(&config.logging);
    info!("AltInput v{} starting...", env!("CARGO_PKG_VERSION"));

    let bindings = SectionStore::from_toml_str(&contents)?;
    let mut backend = EvdevBackend::new();
    let (devices, report) = DeviceList::load(&bindings, &mut backend)?;
    if !report.is_empty() {
        warn!("{} configuration issue(s) in {}", report.len(), config_path);
    }

    let mut context = InputContext::new(devices, config.autopilot.control_detection_threshold);
    let opened = context.devices_mut().open_all();
    info!("{} of {} controller(s) acquired", opened, context.devices().len());

    let mut telemetry = if config.telemetry.enabled {
        match TelemetryLogger::from_config(&config.telemetry) {
            Ok(logger) => Some(logger),
            Err(e) => {
                warn!("Telemetry disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let (mode_tx, mut mode_rx) = mpsc::channel(8);
    tokio::spawn(read_mode_commands(mode_tx));

    let mut vehicle = SimulatedVehicle::new();
    let mut tick_interval = interval(config.tick_period());
    let mut tick_count: u64 = 0;

    info!(
        "Starting input loop at {}Hz in {} mode",
        config.runtime.tick_rate_hz,
        context.mode()
    );
    info!("Type Flight, AltFlight or Ground to switch modes, Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                vehicle.begin_frame();
                let manual = context.tick(&mut vehicle);
                tick_count += 1;

                if let Some(logger) = telemetry.as_mut() {
                    let record = TelemetryRecord::now(context.mode(), *vehicle.state(), manual);
                    if let Err(e) = logger.log_sampled(&record, Instant::now()) {
                        warn!("Telemetry write failed, disabling: {}", e);
                        telemetry = None;
                    }
                }

                if tick_count % STATUS_INTERVAL_TICKS == 0 {
                    debug!("{} ticks, state: {:?}", tick_count, vehicle.state());
                }
            }

            Some(mode) = mode_rx.recv() => {
                context.set_mode(mode);
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    context.devices_mut().close_all();
    info!("Total ticks: {}", tick_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alt_input::bindings::ConfigSource;
    use alt_input::controller::device_list::SUPPORTED_VERSION;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let contents = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")).unwrap();
        assert!(Config::parse(&contents).is_ok());
        let bindings = SectionStore::from_toml_str(&contents).unwrap();
        let version: f32 = bindings.get("global", "version").parse().unwrap();
        assert_eq!(version, SUPPORTED_VERSION);
    }
}
