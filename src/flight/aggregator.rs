//! # Aggregator
//!
//! Merges candidate updates from every device into one control state.
//!
//! ## Loudest Wins
//!
//! Every control (axis, button, POV position) keeps the last value it
//! proposed for a channel until it proposes again. Devices only report
//! changes, so a control that stays put keeps its claim while it is silent.
//! Each channel resolves to the largest magnitude among all claims, ties
//! going to the control that reported most recently. Proposing zero
//! withdraws a claim.
//!
//! ## Commit
//!
//! The held values are then written to the [`ControlSink`] wherever they are
//! louder than what the host already has. Overriding a throttle also zeroes
//! the host's own throttle input. Finally the autopilot is told whether
//! pitch, yaw or roll is being actively used.

use super::channel::{Channel, ControlState};
use super::sink::ControlSink;
use crate::controller::mapper::Candidate;

/// Default magnitude above which the pilot is considered to be steering.
pub const DEFAULT_CONTROL_DETECTION_THRESHOLD: f32 = 0.05;

/// A control on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Axis index.
    Axis(usize),
    /// Button index.
    Button(usize),
    /// POV index and position index.
    Pov(usize, usize),
}

/// Origin of a candidate: which control on which device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId {
    pub device: usize,
    pub control: Control,
}

impl SourceId {
    #[must_use]
    pub fn axis(device: usize, axis: usize) -> Self {
        Self { device, control: Control::Axis(axis) }
    }

    #[must_use]
    pub fn button(device: usize, button: usize) -> Self {
        Self { device, control: Control::Button(button) }
    }

    #[must_use]
    pub fn pov(device: usize, pov: usize, position: usize) -> Self {
        Self { device, control: Control::Pov(pov, position) }
    }
}

/// Merges the standing claims of every control into one control state.
///
/// # Examples
///
/// ```
/// use alt_input::controller::mapper::Candidate;
/// use alt_input::flight::{Aggregator, Channel, SourceId};
///
/// let mut aggregator = Aggregator::new(0.05);
/// aggregator.propose(SourceId::axis(0, 0), Candidate { channel: Channel::Pitch, value: 0.3 });
/// aggregator.propose(SourceId::axis(1, 0), Candidate { channel: Channel::Pitch, value: -0.6 });
/// aggregator.settle();
///
/// assert_eq!(aggregator.held()[Channel::Pitch], -0.6);
/// ```
#[derive(Debug)]
pub struct Aggregator {
    held: ControlState,
    claims: [Vec<(SourceId, f32)>; Channel::COUNT],
    threshold: f32,
}

impl Aggregator {
    /// Creates an aggregator.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Pitch/yaw/roll magnitude above which the autopilot
    ///   override is signalled
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            held: ControlState::new(),
            claims: Default::default(),
            threshold,
        }
    }

    /// Replaces the claim `source` holds on the candidate's channel.
    pub fn propose(&mut self, source: SourceId, candidate: Candidate) {
        let value = candidate.channel.clamp(candidate.value);
        let slot = &mut self.claims[candidate.channel.index()];
        slot.retain(|(existing, _)| *existing != source);
        if value != 0.0 {
            slot.push((source, value));
        }
    }

    /// Loudest standing claim on `channel`, or zero when unclaimed.
    #[must_use]
    pub fn current(&self, channel: Channel) -> f32 {
        Self::winner(&self.claims[channel.index()]).unwrap_or(0.0)
    }

    /// Resolves every channel into the held values.
    pub fn settle(&mut self) {
        for channel in Channel::ALL {
            let value = self.current(channel);
            self.held.set(channel, value);
        }
    }

    /// Settles the tick and writes the result to `sink`.
    ///
    /// # Returns
    ///
    /// Whether the autopilot override was signalled
    pub fn commit(&mut self, sink: &mut dyn ControlSink) -> bool {
        self.settle();

        for (channel, value) in self.held.iter() {
            let incoming = sink.control_state().get(channel);
            if incoming.abs() < value.abs() {
                sink.control_state_mut().set(channel, value);
                if channel.is_throttle() {
                    sink.zero_companion_throttle(channel);
                }
            }
        }

        let state = sink.control_state();
        let active = [Channel::Pitch, Channel::Yaw, Channel::Roll]
            .into_iter()
            .any(|channel| state.get(channel).abs() > self.threshold);
        sink.set_autopilot_override(active);
        active
    }

    /// Values held after the last settle.
    #[must_use]
    pub fn held(&self) -> &ControlState {
        &self.held
    }

    /// Override detection threshold.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    fn winner(slot: &[(SourceId, f32)]) -> Option<f32> {
        slot.iter()
            .map(|(_, value)| *value)
            .reduce(|best, value| if value.abs() >= best.abs() { value } else { best })
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_DETECTION_THRESHOLD)
    }
}
