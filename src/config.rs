//! # Configuration Module
//!
//! Handles loading and validating runtime settings from TOML files.
//!
//! The same file also carries the `[global]` version and the `[inputN]`
//! device binding tables. Those are ignored here and read through
//! [`SectionStore`](crate::bindings::SectionStore) when devices are loaded.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{AltInputError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub autopilot: AutopilotConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
}

/// Autopilot interaction
#[derive(Debug, Deserialize, Clone)]
pub struct AutopilotConfig {
    /// Pitch/yaw/roll magnitude above which the pilot is steering
    #[serde(default = "default_control_detection_threshold")]
    pub control_detection_threshold: f32,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_telemetry_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

// Default value functions
fn default_tick_rate_hz() -> u32 { 50 }

fn default_control_detection_threshold() -> f32 { 0.05 }

fn default_telemetry_enabled() -> bool { false }
fn default_telemetry_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }

fn default_log_file_prefix() -> String { "alt-input.log".to_string() }

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick_rate_hz: default_tick_rate_hz() }
    }
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            control_detection_threshold: default_control_detection_threshold(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_telemetry_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

fn invalid(message: &str) -> AltInputError {
    AltInputError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use alt_input::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing or validation fails
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.runtime.tick_rate_hz == 0 || self.runtime.tick_rate_hz > 1000 {
            return Err(invalid("tick_rate_hz must be between 1 and 1000"));
        }

        let threshold = self.autopilot.control_detection_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid("control_detection_threshold must be between 0.0 and 1.0"));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        // Validate telemetry file limits
        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging log_dir cannot be empty when set"));
        }

        if self.logging.file_prefix.is_empty() {
            return Err(invalid("logging file_prefix cannot be empty"));
        }

        Ok(())
    }

    /// Tick period derived from `tick_rate_hz`
    #[must_use]
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / u64::from(self.runtime.tick_rate_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.runtime.tick_rate_hz, 50);
        assert_eq!(config.autopilot.control_detection_threshold, 0.05);
        assert!(!config.telemetry.enabled);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.runtime.tick_rate_hz, default_tick_rate_hz());
        assert_eq!(config.telemetry.max_records_per_file, 10000);
    }

    #[test]
    fn test_binding_tables_ignored() {
        let config = Config::parse(
            r#"
[global]
version = 1.3

[runtime]
tick_rate_hz = 60

[input1]
Interface = "evdev"
AxisX = "roll"

[input1.Ground]
AxisX = "wheelSteer"
"#,
        )
        .unwrap();
        assert_eq!(config.runtime.tick_rate_hz, 60);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[global]
version = 1.3

[runtime]
tick_rate_hz = 100

[autopilot]
control_detection_threshold = 0.1

[telemetry]
enabled = true
log_dir = "/tmp/alt-input"
max_records_per_file = 500
max_files_to_keep = 3
log_interval_ms = 250

[logging]
log_dir = "/var/log/alt-input"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.runtime.tick_rate_hz, 100);
        assert_eq!(config.autopilot.control_detection_threshold, 0.1);
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.log_dir, "/tmp/alt-input");
        assert_eq!(config.telemetry.max_records_per_file, 500);
        assert_eq!(config.telemetry.max_files_to_keep, 3);
        assert_eq!(config.telemetry.log_interval_ms, 250);
        assert_eq!(config.logging.log_dir.as_deref(), Some("/var/log/alt-input"));
        assert_eq!(config.logging.file_prefix, "alt-input.log");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/alt-input.toml");
        assert!(matches!(result, Err(AltInputError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::parse("[runtime\ntick_rate_hz = 50");
        assert!(matches!(result, Err(AltInputError::Config(_))));
    }

    #[test]
    fn test_wrong_type() {
        assert!(Config::parse("[runtime]\ntick_rate_hz = \"fast\"").is_err());
    }

    #[test]
    fn test_tick_rate_zero() {
        let mut config = Config::default();
        config.runtime.tick_rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_rate_too_high() {
        let mut config = Config::default();
        config.runtime.tick_rate_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = Config::default();
        config.autopilot.control_detection_threshold = -0.1;
        assert!(config.validate().is_err());

        config.autopilot.control_detection_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_interval_zero() {
        let mut config = Config::default();
        config.telemetry.log_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_interval_too_high() {
        let mut config = Config::default();
        config.telemetry.log_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_logging_dir() {
        let mut config = Config::default();
        config.logging.log_dir = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_period() {
        let mut config = Config::default();
        assert_eq!(config.tick_period(), std::time::Duration::from_millis(20));
        config.runtime.tick_rate_hz = 250;
        assert_eq!(config.tick_period(), std::time::Duration::from_millis(4));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_tick_rate_hz(), 50);
        assert_eq!(default_control_detection_threshold(), 0.05);
        assert!(!default_telemetry_enabled());
        assert_eq!(default_telemetry_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_interval_ms(), 100);
        assert_eq!(default_log_file_prefix(), "alt-input.log");
    }
}
