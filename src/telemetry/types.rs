//! Telemetry record types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::flight::{ControlState, Mode};

/// One line of the telemetry log.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub mode: Mode,
    pub controls: ControlState,
    pub autopilot_override: bool,
}

impl TelemetryRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn now(mode: Mode, controls: ControlState, autopilot_override: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            mode,
            controls,
            autopilot_override,
        }
    }
}
