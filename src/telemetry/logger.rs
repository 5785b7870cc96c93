//! # Telemetry Logger
//!
//! Appends [`TelemetryRecord`]s to JSONL files.
//!
//! A new file is started after `max_records_per_file` records and only the
//! newest `max_files_to_keep` files are kept. Files are named
//! `telemetry_<UTC timestamp>_<sequence>.jsonl` so lexical order is
//! creation order.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::TelemetryRecord;
use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = ".jsonl";

/// Rotating JSONL writer.
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    interval: Duration,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    sequence: u32,
    last_logged: Option<Instant>,
}

impl TelemetryLogger {
    /// Creates a logger writing into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            interval: Duration::ZERO,
            writer: None,
            records_in_file: 0,
            sequence: 0,
            last_logged: None,
        })
    }

    /// Creates a logger from the `[telemetry]` settings.
    ///
    /// # Errors
    ///
    /// Returns error if the log directory cannot be created.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        let mut logger = Self::new(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)?;
        logger.interval = Duration::from_millis(config.log_interval_ms);
        info!("Telemetry logging to {}", logger.dir.display());
        Ok(logger)
    }

    /// Whether the sampling interval has elapsed since the last record.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_logged
            .map_or(true, |last| now.duration_since(last) >= self.interval)
    }

    /// Writes `record` if the sampling interval has elapsed.
    ///
    /// # Returns
    ///
    /// Whether the record was written
    ///
    /// # Errors
    ///
    /// Returns error if writing fails.
    pub fn log_sampled(&mut self, record: &TelemetryRecord, now: Instant) -> Result<bool> {
        if !self.is_due(now) {
            return Ok(false);
        }
        self.log(record)?;
        self.last_logged = Some(now);
        Ok(true)
    }

    /// Appends one record, rotating first if the current file is full.
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be created or written.
    pub fn log(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }
        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Log files currently in the directory, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be read.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_log = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION));
            if is_log {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.sequence += 1;
        let name = format!(
            "{}{}_{:04}{}",
            FILE_PREFIX,
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            self.sequence,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        let file = File::create(&path)?;
        debug!("Telemetry file {}", path.display());
        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;

        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let files = self.files()?;
        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for old in files.iter().take(excess) {
            debug!("Removing old telemetry file {}", old.display());
            fs::remove_file(old)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::{Channel, ControlState, Mode};
    use tempfile::TempDir;

    fn record(pitch: f32) -> TelemetryRecord {
        let mut controls = ControlState::new();
        controls.set(Channel::Pitch, pitch);
        TelemetryRecord::now(Mode::Flight, controls, pitch.abs() > 0.05)
    }

    fn lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 10, 3).unwrap();
        logger.log(&record(0.5)).unwrap();
        logger.log(&record(0.0)).unwrap();

        let files = logger.files().unwrap();
        assert_eq!(files.len(), 1);
        let records = lines(&files[0]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["controls"]["pitch"], 0.5);
        assert_eq!(records[1]["autopilot_override"], false);
    }

    #[test]
    fn test_rotates_after_max_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 2, 10).unwrap();
        for _ in 0..5 {
            logger.log(&record(0.1)).unwrap();
        }

        let files = logger.files().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(lines(&files[0]).len(), 2);
        assert_eq!(lines(&files[2]).len(), 1);
    }

    #[test]
    fn test_keeps_only_newest_files() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 1, 2).unwrap();
        for i in 0..4 {
            logger.log(&record(i as f32 / 10.0)).unwrap();
        }

        let files = logger.files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(lines(&files[0])[0]["controls"]["pitch"], 0.2);
        assert_eq!(lines(&files[1])[0]["controls"]["pitch"], 0.3);
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        let mut logger = TelemetryLogger::new(dir.path(), 1, 1).unwrap();
        logger.log(&record(0.0)).unwrap();
        logger.log(&record(0.0)).unwrap();

        assert_eq!(logger.files().unwrap().len(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut logger = TelemetryLogger::new(&nested, 10, 1).unwrap();
        logger.log(&record(0.0)).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_sampling_interval() {
        let dir = TempDir::new().unwrap();
        let config = TelemetryConfig {
            enabled: true,
            log_dir: dir.path().display().to_string(),
            max_records_per_file: 100,
            max_files_to_keep: 1,
            log_interval_ms: 100,
        };
        let mut logger = TelemetryLogger::from_config(&config).unwrap();
        let start = Instant::now();

        assert!(logger.log_sampled(&record(0.0), start).unwrap());
        assert!(!logger.log_sampled(&record(0.0), start + Duration::from_millis(50)).unwrap());
        assert!(logger.log_sampled(&record(0.0), start + Duration::from_millis(100)).unwrap());

        let files = logger.files().unwrap();
        assert_eq!(lines(&files[0]).len(), 2);
    }
}
