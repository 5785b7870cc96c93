//! # Control Channels
//!
//! The vehicle control-state vector, addressed by an enumerated [`Channel`]
//! instead of by field name.
//!
//! ## Channel Table
//!
//! | Channel | Config name | Range |
//! |---------|-------------|-------|
//! | Pitch | `pitch` | -1.0 to 1.0 |
//! | Yaw | `yaw` | -1.0 to 1.0 |
//! | Roll | `roll` | -1.0 to 1.0 |
//! | Translate X | `X` | -1.0 to 1.0 |
//! | Translate Y | `Y` | -1.0 to 1.0 |
//! | Translate Z | `Z` | -1.0 to 1.0 |
//! | Main throttle | `mainThrottle` | 0.0 to 1.0 |
//! | Wheel throttle | `wheelThrottle` | 0.0 to 1.0 |
//! | Wheel steering | `wheelSteer` | -1.0 to 1.0 |
//!
//! Channel names are validated when bindings are loaded, so nothing on the
//! per-tick path ever looks a channel up by string.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;
use thiserror::Error;

/// A single scalar in the vehicle's control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Pitch,
    Yaw,
    Roll,
    X,
    Y,
    Z,
    MainThrottle,
    WheelThrottle,
    WheelSteer,
}

/// Returned when a binding names a channel that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid axis name")]
pub struct UnknownChannel(pub String);

impl Channel {
    /// Number of channels in a [`ControlState`].
    pub const COUNT: usize = 9;

    /// All channels, in control-state order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Pitch,
        Channel::Yaw,
        Channel::Roll,
        Channel::X,
        Channel::Y,
        Channel::Z,
        Channel::MainThrottle,
        Channel::WheelThrottle,
        Channel::WheelSteer,
    ];

    /// Name used for this channel in binding files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Channel::Pitch => "pitch",
            Channel::Yaw => "yaw",
            Channel::Roll => "roll",
            Channel::X => "X",
            Channel::Y => "Y",
            Channel::Z => "Z",
            Channel::MainThrottle => "mainThrottle",
            Channel::WheelThrottle => "wheelThrottle",
            Channel::WheelSteer => "wheelSteer",
        }
    }

    /// Throttle-like channels live in [0, 1] and get special treatment
    /// when mapped and committed.
    #[must_use]
    pub fn is_throttle(self) -> bool {
        matches!(self, Channel::MainThrottle | Channel::WheelThrottle)
    }

    /// Lower and upper bound for values on this channel.
    #[must_use]
    pub fn bounds(self) -> (f32, f32) {
        if self.is_throttle() {
            (0.0, 1.0)
        } else {
            (-1.0, 1.0)
        }
    }

    /// Clamps a value into this channel's bounds.
    #[must_use]
    pub fn clamp(self, value: f32) -> f32 {
        let (min, max) = self.bounds();
        value.clamp(min, max)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// Bounded control-state vector, one value per [`Channel`].
///
/// # Examples
///
/// ```
/// use alt_input::flight::{Channel, ControlState};
///
/// let mut state = ControlState::default();
/// state.set(Channel::MainThrottle, -0.5);
/// assert_eq!(state[Channel::MainThrottle], 0.0); // clamped to [0, 1]
///
/// state.set(Channel::Pitch, -0.5);
/// assert_eq!(state[Channel::Pitch], -0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlState {
    values: [f32; Channel::COUNT],
}

impl ControlState {
    /// Creates a control state with every channel at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> f32 {
        self.values[channel.index()]
    }

    /// Sets a channel, clamping to the channel's bounds.
    pub fn set(&mut self, channel: Channel, value: f32) {
        self.values[channel.index()] = channel.clamp(value);
    }

    /// Iterates over `(channel, value)` pairs in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f32)> + '_ {
        Channel::ALL.into_iter().map(|channel| (channel, self.get(channel)))
    }
}

impl Index<Channel> for ControlState {
    type Output = f32;

    fn index(&self, channel: Channel) -> &f32 {
        &self.values[channel.index()]
    }
}

impl Serialize for ControlState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Channel::COUNT))?;
        for (channel, value) in self.iter() {
            map.serialize_entry(channel.name(), &value)?;
        }
        map.end()
    }
}
