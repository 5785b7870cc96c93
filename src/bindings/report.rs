//! # Validation Report
//!
//! Configuration problems found while loading bindings. None of them are
//! fatal: the offending item is skipped or zeroed and loading continues.
//! The report is produced once, at load time.

use thiserror::Error;
use tracing::warn;

/// A single recoverable configuration problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigIssue {
    /// Config file version does not match the supported one
    #[error("config version '{found}' is not supported (expected {expected})")]
    VersionMismatch { found: String, expected: String },

    /// `Interface` names a backend that is not available
    #[error("[{section}] only '{expected}' is supported for Interface type, got '{found}'")]
    UnsupportedInterface {
        section: String,
        expected: String,
        found: String,
    },

    /// `Class` is set to something other than `GameControl`
    #[error("[{section}] '{class}' is not an allowed Class value")]
    DisallowedClass { section: String, class: String },

    /// A mapping names a channel that does not exist
    #[error("[{section}] {key}: '{name}' is not a valid axis name")]
    UnknownChannel {
        section: String,
        key: String,
        name: String,
    },

    /// A numeric attribute could not be parsed
    #[error("[{section}] {key}: '{value}' is not a number")]
    InvalidNumber {
        section: String,
        key: String,
        value: String,
    },

    /// A boolean attribute could not be parsed
    #[error("[{section}] {key}: '{value}' is not 'true' or 'false'")]
    InvalidBoolean {
        section: String,
        key: String,
        value: String,
    },

    /// A mapping type is not Absolute, Delta or Range
    #[error("[{section}] {key}: '{value}' is not a mapping type (Absolute, Delta, Range)")]
    InvalidMappingType {
        section: String,
        key: String,
        value: String,
    },
}

/// Collected configuration problems.
///
/// Identical issues are only recorded once, so a bad baseline value that is
/// inherited by several modes shows up a single time.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    issues: Vec<ConfigIssue>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an issue and logs it.
    pub fn push(&mut self, issue: ConfigIssue) {
        if self.issues.contains(&issue) {
            return;
        }
        warn!("AltInput: {}", issue);
        self.issues.push(issue);
    }

    /// All recorded issues, in discovery order.
    #[must_use]
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    /// Number of recorded issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether the configuration loaded cleanly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}
