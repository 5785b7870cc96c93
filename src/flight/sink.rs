//! # Control Sink
//!
//! The host side of a tick: the vehicle control state AltInput writes into,
//! plus the two side channels the commit step drives.

use tracing::info;

use super::channel::{Channel, ControlState};

/// Host vehicle controller the aggregated state is committed to.
pub trait ControlSink {
    /// Incoming control state for this tick.
    fn control_state(&self) -> &ControlState;

    /// Mutable access to the outgoing control state.
    fn control_state_mut(&mut self) -> &mut ControlState;

    /// Forces the host's own throttle input for `channel` to zero.
    ///
    /// Called whenever AltInput overrides a throttle channel, otherwise the
    /// host would apply its own throttle input on top of ours.
    fn zero_companion_throttle(&mut self, channel: Channel);

    /// Tells the autopilot whether the pilot is actively steering.
    fn set_autopilot_override(&mut self, active: bool);
}

/// Stand-alone vehicle used when no simulator is attached.
///
/// Each frame starts from the vehicle's own input path (only its throttles
/// persist, like a keyboard-driven throttle would), AltInput then commits
/// on top of it.
///
/// # Examples
///
/// ```
/// use alt_input::flight::{Channel, ControlSink};
/// use alt_input::flight::sink::SimulatedVehicle;
///
/// let mut vehicle = SimulatedVehicle::new();
/// vehicle.begin_frame();
/// vehicle.control_state_mut().set(Channel::Pitch, 0.4);
/// assert_eq!(vehicle.state()[Channel::Pitch], 0.4);
///
/// vehicle.begin_frame();
/// assert_eq!(vehicle.state()[Channel::Pitch], 0.0);
/// ```
#[derive(Debug, Default)]
pub struct SimulatedVehicle {
    /// Values set by the vehicle's own input handling.
    own_input: ControlState,
    /// State seen by the vehicle this frame.
    state: ControlState,
    autopilot_override: bool,
}

impl SimulatedVehicle {
    /// Creates an idle vehicle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame from the vehicle's own input.
    pub fn begin_frame(&mut self) {
        self.state = ControlState::new();
        for channel in Channel::ALL.into_iter().filter(|c| c.is_throttle()) {
            self.state.set(channel, self.own_input.get(channel));
        }
    }

    /// Sets the vehicle's own throttle input (e.g. from a keyboard).
    pub fn set_own_throttle(&mut self, channel: Channel, value: f32) {
        self.own_input.set(channel, value);
    }

    /// The vehicle's own input path.
    #[must_use]
    pub fn own_input(&self) -> &ControlState {
        &self.own_input
    }

    /// Control state after the last commit.
    #[must_use]
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Whether manual override is currently signalled.
    #[must_use]
    pub fn autopilot_override(&self) -> bool {
        self.autopilot_override
    }
}

impl ControlSink for SimulatedVehicle {
    fn control_state(&self) -> &ControlState {
        &self.state
    }

    fn control_state_mut(&mut self) -> &mut ControlState {
        &mut self.state
    }

    fn zero_companion_throttle(&mut self, channel: Channel) {
        self.own_input.set(channel, 0.0);
    }

    fn set_autopilot_override(&mut self, active: bool) {
        if active != self.autopilot_override {
            info!(
                "Autopilot manual override {}",
                if active { "engaged" } else { "released" }
            );
        }
        self.autopilot_override = active;
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;

    /// Sink that records every side-channel call.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub state: ControlState,
        pub zeroed_throttles: Vec<Channel>,
        pub overrides: Vec<bool>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_state(state: ControlState) -> Self {
            Self {
                state,
                ..Self::default()
            }
        }

        pub fn last_override(&self) -> Option<bool> {
            self.overrides.last().copied()
        }
    }

    impl ControlSink for RecordingSink {
        fn control_state(&self) -> &ControlState {
            &self.state
        }

        fn control_state_mut(&mut self) -> &mut ControlState {
            &mut self.state
        }

        fn zero_companion_throttle(&mut self, channel: Channel) {
            self.zeroed_throttles.push(channel);
        }

        fn set_autopilot_override(&mut self, active: bool) {
            self.overrides.push(active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_frame_keeps_only_own_throttles() {
        let mut vehicle = SimulatedVehicle::new();
        vehicle.set_own_throttle(Channel::MainThrottle, 0.6);
        vehicle.control_state_mut().set(Channel::Yaw, 0.3);

        vehicle.begin_frame();
        assert_eq!(vehicle.state()[Channel::MainThrottle], 0.6);
        assert_eq!(vehicle.state()[Channel::Yaw], 0.0);
    }

    #[test]
    fn test_zero_companion_throttle() {
        let mut vehicle = SimulatedVehicle::new();
        vehicle.set_own_throttle(Channel::WheelThrottle, 0.8);
        vehicle.zero_companion_throttle(Channel::WheelThrottle);
        assert_eq!(vehicle.own_input()[Channel::WheelThrottle], 0.0);
    }

    #[test]
    fn test_autopilot_override_flag() {
        let mut vehicle = SimulatedVehicle::new();
        assert!(!vehicle.autopilot_override());
        vehicle.set_autopilot_override(true);
        assert!(vehicle.autopilot_override());
        vehicle.set_autopilot_override(false);
        assert!(!vehicle.autopilot_override());
    }
}
