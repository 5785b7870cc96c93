//! # Bindings Module
//!
//! Device binding configuration.
//!
//! This module handles:
//! - Section/key storage of the `[inputN]` binding tables
//! - Per-mode attribute resolution with baseline inheritance and overrides
//! - Collecting recoverable configuration problems into a report

pub mod report;
pub mod resolver;
pub mod source;

pub use report::{ConfigIssue, ValidationReport};
pub use resolver::{Resolved, Resolver};
pub use source::{ConfigSource, SectionStore};
