//! # Calibration Module
//!
//! Converts raw device samples into normalized values in [-1.0, 1.0].
//!
//! ## Normalization
//!
//! A raw sample `v` from an axis with physical range `[min, max]` is mapped
//! linearly so that `min` becomes -1.0 and `max` becomes 1.0:
//!
//! `normalized = (v - min) / (0.5 * (max - min)) - 1.0`
//!
//! ## Inversion
//!
//! Inverted axes negate the normalized value before the dead zone applies.
//!
//! ## Dead Zone
//!
//! The dead zone is a fraction of the half-range (0.0 to 1.0), and its
//! meaning depends on the kind of axis:
//!
//! - **Rotational axes** (sticks, twist): values with `|v| < deadzone` snap
//!   to the centre (0.0).
//! - **Sliders** (throttle levers): values within `deadzone` of either end
//!   snap to that end (-1.0 or 1.0), since a slider rarely rests at a true
//!   centre but should reach its extremes reliably.
//!
//! ## Usage
//!
//! ```
//! use alt_input::controller::calibration::{normalize_sample, AxisKind, AxisRange, Calibration};
//!
//! let range = AxisRange::new(0, 10000);
//! let cal = Calibration::new(0.1, 1.0, false);
//!
//! // Near centre on a stick
//! assert_eq!(normalize_sample(5200, range, &cal, AxisKind::Rotational), 0.0);
//!
//! // Near the top of a slider
//! assert_eq!(normalize_sample(9700, range, &cal, AxisKind::Slider), 1.0);
//! ```

/// Whether an axis is a rotational axis or a slider.
///
/// The distinction only matters for dead-zone shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    /// Centred axis (stick, twist, rotation). Dead zone applies at centre.
    Rotational,
    /// Uncentred axis (throttle lever, slider). Dead zone applies at the edges.
    Slider,
}

/// Physical range reported by a device for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    /// Raw value at one end of travel.
    pub min: i32,
    /// Raw value at the other end of travel.
    pub max: i32,
}

impl AxisRange {
    /// Creates a new range.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Width of the range. Zero for a degenerate range.
    #[must_use]
    pub fn span(&self) -> f32 {
        (i64::from(self.max) - i64::from(self.min)) as f32
    }

    /// A range is usable iff it is non-degenerate.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.max != self.min
    }
}

/// Per-mode calibration of an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Dead zone as a fraction of the half-range (0.0 to 1.0).
    deadzone: f32,
    /// Multiplier applied by the mapping engine.
    factor: f32,
    /// Whether the axis direction is reversed.
    inverted: bool,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            deadzone: 0.0,
            factor: 1.0,
            inverted: false,
        }
    }
}

impl Calibration {
    /// Creates a calibration.
    ///
    /// # Arguments
    ///
    /// * `deadzone` - Dead zone fraction (0.0 to 1.0). Values outside this range are clamped.
    /// * `factor` - Sensitivity multiplier applied when mapping
    /// * `inverted` - Reverse the axis direction
    ///
    /// # Examples
    ///
    /// ```
    /// use alt_input::controller::calibration::Calibration;
    ///
    /// let cal = Calibration::new(1.5, 0.5, true);
    /// assert_eq!(cal.deadzone(), 1.0);
    /// ```
    #[must_use]
    pub fn new(deadzone: f32, factor: f32, inverted: bool) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 1.0),
            factor,
            inverted,
        }
    }

    /// Returns the configured dead zone.
    #[must_use]
    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    /// Returns the configured factor.
    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Returns whether the axis is inverted.
    #[must_use]
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    /// Applies inversion and dead-zone shaping to a normalized value.
    ///
    /// # Arguments
    ///
    /// * `normalized` - Value in -1.0 to 1.0
    /// * `kind` - Decides where the dead zone applies
    ///
    /// # Returns
    ///
    /// Shaped value, always within -1.0 to 1.0
    #[must_use]
    pub fn apply(&self, normalized: f32, kind: AxisKind) -> f32 {
        let mut value = if self.inverted { -normalized } else { normalized };

        match kind {
            AxisKind::Slider => {
                if value < -1.0 + self.deadzone {
                    value = -1.0;
                }
                if value > 1.0 - self.deadzone {
                    value = 1.0;
                }
            }
            AxisKind::Rotational => {
                if value.abs() < self.deadzone {
                    value = 0.0;
                }
            }
        }

        value.clamp(-1.0, 1.0)
    }
}

/// Maps a raw sample linearly from `range` onto -1.0 to 1.0.
///
/// The range must be usable; callers never read axes whose range is
/// degenerate.
///
/// # Examples
///
/// ```
/// use alt_input::controller::calibration::{normalize, AxisRange};
///
/// let range = AxisRange::new(0, 10000);
/// assert_eq!(normalize(0, range), -1.0);
/// assert_eq!(normalize(5000, range), 0.0);
/// assert_eq!(normalize(10000, range), 1.0);
/// ```
#[must_use]
pub fn normalize(raw: i32, range: AxisRange) -> f32 {
    let offset = (i64::from(raw) - i64::from(range.min)) as f32;
    offset / (0.5 * range.span()) - 1.0
}

/// Full normalizer: linear mapping, inversion and dead zone.
///
/// Samples outside the probed range are clamped to -1.0 to 1.0.
#[must_use]
pub fn normalize_sample(raw: i32, range: AxisRange, calibration: &Calibration, kind: AxisKind) -> f32 {
    calibration.apply(normalize(raw, range), kind)
}
