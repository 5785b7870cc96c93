//! # Mapping Engine
//!
//! Turns a normalized control value into a candidate update for one
//! [`Channel`]. The engine is pure: it never writes to the control state,
//! merging candidates is the [`Aggregator`](crate::flight::Aggregator)'s job.
//!
//! ## Mapping Types
//!
//! | Type | Candidate |
//! |------|-----------|
//! | Absolute | `normalized × factor` |
//! | Delta | `(normalized + current) × factor` |
//! | Range | Absolute, on the primary mapping below the threshold and the secondary at or above it |
//!
//! ## Throttles
//!
//! Throttle channels live in [0, 1]. For Absolute and Range mappings the
//! value is first remapped with `(v + 1) / 2` so a full stick travel covers
//! the full throttle travel. Every candidate is clamped to its channel's
//! bounds.
//!
//! ## Usage
//!
//! ```
//! use alt_input::controller::mapper::{map_value, Mapping, MappingType};
//! use alt_input::flight::Channel;
//!
//! let mapping = Mapping::new(Channel::MainThrottle, MappingType::Absolute, 0.0);
//!
//! // Stick fully down is zero throttle, centred is half throttle
//! assert_eq!(map_value(&mapping, -1.0, 1.0, 0.0).value, 0.0);
//! assert_eq!(map_value(&mapping, 0.0, 1.0, 0.0).value, 0.5);
//! ```

use std::str::FromStr;
use thiserror::Error;

use crate::flight::{Channel, UnknownChannel};

/// Separators accepted between a button's channel and value.
const BUTTON_SEPARATORS: &[char] = &['[', ']', ' ', '\t'];

/// How a normalized value is combined with a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingType {
    /// Replace the channel value.
    #[default]
    Absolute,
    /// Add to the channel's current value.
    Delta,
    /// Split across a primary and secondary mapping at a threshold.
    Range,
}

impl FromStr for MappingType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(MappingType::Absolute),
            "delta" => Ok(MappingType::Delta),
            "range" => Ok(MappingType::Range),
            _ => Err(()),
        }
    }
}

/// Target of an axis: a channel, how to apply to it, and for Range
/// mappings the threshold between the primary and secondary targets.
///
/// Immutable once built from the bindings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    channel: Channel,
    kind: MappingType,
    value: f32,
}

impl Mapping {
    /// Creates a mapping.
    #[must_use]
    pub fn new(channel: Channel, kind: MappingType, value: f32) -> Self {
        Self { channel, kind, value }
    }

    /// Creates an absolute mapping.
    #[must_use]
    pub fn absolute(channel: Channel) -> Self {
        Self::new(channel, MappingType::Absolute, 0.0)
    }

    /// Target channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Mapping type.
    #[must_use]
    pub fn kind(&self) -> MappingType {
        self.kind
    }

    /// Associated scalar (Range threshold).
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// The same target, applied as an absolute mapping.
    #[must_use]
    pub fn as_absolute(&self) -> Self {
        Self::absolute(self.channel)
    }
}

/// Primary and secondary mappings of an axis in one mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisBinding {
    /// Regular mapping, or the below-threshold mapping of a Range.
    pub primary: Option<Mapping>,
    /// At-or-above-threshold mapping of a Range.
    pub secondary: Option<Mapping>,
}

impl AxisBinding {
    /// Whether anything is mapped.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Picks the mapping a normalized value applies to.
    ///
    /// Range mappings send values strictly below the threshold to the
    /// primary target and the rest to the secondary one. Without a secondary
    /// target the primary takes the whole range.
    #[must_use]
    pub fn route(&self, normalized: f32) -> Option<&Mapping> {
        let primary = self.primary.as_ref()?;
        match primary.kind() {
            MappingType::Range if normalized >= primary.value() => {
                Some(self.secondary.as_ref().unwrap_or(primary))
            }
            _ => Some(primary),
        }
    }

    /// Every target this binding can drive.
    pub fn targets(&self) -> impl Iterator<Item = &Mapping> {
        self.primary.iter().chain(self.secondary.iter())
    }
}

/// A proposed value for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub channel: Channel,
    pub value: f32,
}

/// Applies a mapping to a normalized value.
///
/// # Arguments
///
/// * `mapping` - Target and mapping type
/// * `normalized` - Calibrated input in -1.0 to 1.0
/// * `factor` - Sensitivity multiplier
/// * `current` - The channel's current accumulated value (used by Delta)
///
/// # Returns
///
/// Candidate clamped to the channel's bounds
///
/// # Examples
///
/// ```
/// use alt_input::controller::mapper::{map_value, Mapping, MappingType};
/// use alt_input::flight::Channel;
///
/// let delta = Mapping::new(Channel::Pitch, MappingType::Delta, 0.0);
/// let candidate = map_value(&delta, 0.25, 1.0, 0.5);
/// assert_eq!(candidate.value, 0.75);
/// ```
#[must_use]
pub fn map_value(mapping: &Mapping, normalized: f32, factor: f32, current: f32) -> Candidate {
    let channel = mapping.channel();
    let value = match mapping.kind() {
        MappingType::Delta => normalized + current,
        MappingType::Absolute | MappingType::Range if channel.is_throttle() => {
            (normalized + 1.0) / 2.0
        }
        MappingType::Absolute | MappingType::Range => normalized,
    };

    Candidate {
        channel,
        value: channel.clamp(value * factor),
    }
}

/// Routes a normalized value through an axis binding and maps it.
///
/// `current` is only consulted for Delta mappings.
pub fn map_axis<F>(binding: &AxisBinding, normalized: f32, factor: f32, current: F) -> Option<Candidate>
where
    F: FnOnce(Channel) -> f32,
{
    let mapping = binding.route(normalized)?;
    let current = match mapping.kind() {
        MappingType::Delta => current(mapping.channel()),
        _ => 0.0,
    };
    Some(map_value(mapping, normalized, factor, current))
}

/// Channel and held value of a button or POV position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonMapping {
    channel: Channel,
    value: f32,
}

/// Why a button binding could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ButtonParseError {
    #[error(transparent)]
    UnknownChannel(#[from] UnknownChannel),
    #[error("'{0}' is not a number")]
    InvalidValue(String),
}

impl ButtonMapping {
    /// Creates a button mapping.
    #[must_use]
    pub fn new(channel: Channel, value: f32) -> Self {
        Self { channel, value }
    }

    /// Parses `"<channel> <value>"`. The value may be bracketed
    /// (`"pitch [-1.0]"`) and defaults to 0.0 when missing.
    ///
    /// # Errors
    ///
    /// Returns error if the channel is unknown or the value is not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use alt_input::controller::mapper::ButtonMapping;
    /// use alt_input::flight::Channel;
    ///
    /// let mapping = ButtonMapping::parse("mainThrottle [1.0]")?;
    /// assert_eq!(mapping.channel(), Channel::MainThrottle);
    /// assert_eq!(mapping.value(), 1.0);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn parse(binding: &str) -> Result<Self, ButtonParseError> {
        let mut tokens = binding.split(BUTTON_SEPARATORS).filter(|t| !t.is_empty());
        let channel: Channel = tokens.next().unwrap_or("").parse()?;
        let value = match tokens.next() {
            Some(raw) => raw
                .parse::<f32>()
                .map_err(|_| ButtonParseError::InvalidValue(raw.to_string()))?,
            None => 0.0,
        };
        Ok(Self { channel, value })
    }

    /// Target channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Value the channel takes while pressed.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Candidate for a pressed or released button. Released buttons drive
    /// their channel back to 0.
    #[must_use]
    pub fn candidate(&self, pressed: bool) -> Candidate {
        let value = if pressed { self.value } else { 0.0 };
        Candidate {
            channel: self.channel,
            value: self.channel.clamp(value),
        }
    }
}
