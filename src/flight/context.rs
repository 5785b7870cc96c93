//! # Input Context
//!
//! Owns the bound devices, the current mode and the aggregator, and runs
//! one tick of the input pipeline:
//!
//! ```text
//! poll every device → normalize → map → aggregate → commit to sink
//! ```
//!
//! The context is meant to be driven from a single task. Mode changes are
//! applied between ticks.

use tracing::info;

use super::aggregator::Aggregator;
use super::mode::Mode;
use super::sink::ControlSink;
use crate::controller::DeviceList;

/// Per-session input state.
#[derive(Debug)]
pub struct InputContext {
    devices: DeviceList,
    mode: Mode,
    aggregator: Aggregator,
}

impl InputContext {
    /// Creates a context in the default mode.
    ///
    /// # Arguments
    ///
    /// * `devices` - Bound controllers
    /// * `threshold` - Autopilot override detection threshold
    #[must_use]
    pub fn new(devices: DeviceList, threshold: f32) -> Self {
        Self {
            devices,
            mode: Mode::DEFAULT,
            aggregator: Aggregator::new(threshold),
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut DeviceList {
        &mut self.devices
    }

    #[must_use]
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Runs one tick: polls every device, merges the candidates and commits
    /// them to `sink`.
    ///
    /// # Returns
    ///
    /// Whether the autopilot override was signalled
    pub fn tick(&mut self, sink: &mut dyn ControlSink) -> bool {
        for (index, device) in self.devices.iter_mut().enumerate() {
            device.process_input(index, self.mode, &mut self.aggregator);
        }
        self.aggregator.commit(sink)
    }

    /// Switches mode, first driving every non-throttle axis target of the
    /// previous and the new mode back to zero so nothing stays stuck.
    ///
    /// Throttles keep their value across the switch.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        let previous = self.mode;

        for (index, device) in self.devices.iter().enumerate() {
            device.reset(index, previous, &mut self.aggregator);
            device.reset(index, mode, &mut self.aggregator);
        }
        self.aggregator.settle();

        self.mode = mode;
        info!("Input mode changed: {} -> {}", previous, mode);
    }
}
