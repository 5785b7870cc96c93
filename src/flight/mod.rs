//! # Flight Module
//!
//! The vehicle side of the bridge.
//!
//! This module handles:
//! - The enumerated control channels and bounded control-state vector
//! - Input modes and per-mode value tables
//! - Merging candidate updates from every device into one control state
//! - The per-tick input context and the host sink it writes to

pub mod aggregator;
pub mod channel;
pub mod context;
pub mod mode;
pub mod sink;

pub use aggregator::{Aggregator, SourceId};
pub use channel::{Channel, ControlState, UnknownChannel};
pub use context::InputContext;
pub use mode::{EnabledModes, Mode, PerMode, UnknownMode};
pub use sink::ControlSink;
