//! # Input Modes
//!
//! A mode selects which binding overlay is active. [`Mode::Flight`] is the
//! default mode: its bindings are the baseline every other mode inherits.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The input modes AltInput supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Mode {
    #[default]
    Flight,
    AltFlight,
    Ground,
}

/// One value per [`Mode`], indexed by [`Mode::index`].
pub type PerMode<T> = [T; Mode::COUNT];

/// Returned when a mode name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode '{0}' (expected Flight, AltFlight or Ground)")]
pub struct UnknownMode(pub String);

impl Mode {
    /// Number of modes.
    pub const COUNT: usize = 3;

    /// All modes, default first.
    pub const ALL: [Mode; Mode::COUNT] = [Mode::Flight, Mode::AltFlight, Mode::Ground];

    /// The baseline mode other modes inherit from.
    pub const DEFAULT: Mode = Mode::Flight;

    /// Position of this mode in a [`PerMode`] array.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Section suffix used for this mode in binding files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Mode::Flight => "Flight",
            Mode::AltFlight => "AltFlight",
            Mode::Ground => "Ground",
        }
    }

    /// Whether this is the default mode.
    #[must_use]
    pub fn is_default(self) -> bool {
        self == Mode::DEFAULT
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    /// Parses a mode name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownMode(trimmed.to_string()))
    }
}

/// The set of modes a device has bindings for.
///
/// The default mode is always enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledModes([bool; Mode::COUNT]);

impl Default for EnabledModes {
    fn default() -> Self {
        let mut enabled = [false; Mode::COUNT];
        enabled[Mode::DEFAULT.index()] = true;
        Self(enabled)
    }
}

impl EnabledModes {
    /// Enables a mode. The default mode cannot be disabled.
    pub fn enable(&mut self, mode: Mode) {
        self.0[mode.index()] = true;
    }

    /// Whether bindings exist for `mode`.
    #[must_use]
    pub fn contains(&self, mode: Mode) -> bool {
        self.0[mode.index()]
    }

    /// Iterates over enabled modes in mode order.
    pub fn iter(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::ALL.into_iter().filter(|mode| self.contains(*mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_flight() {
        assert_eq!(Mode::default(), Mode::Flight);
        assert_eq!(Mode::DEFAULT.index(), 0);
        assert!(Mode::Flight.is_default());
        assert!(!Mode::Ground.is_default());
    }

    #[test]
    fn test_mode_indices_are_dense() {
        for (i, mode) in Mode::ALL.into_iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Ground".parse::<Mode>(), Ok(Mode::Ground));
        assert_eq!("altflight".parse::<Mode>(), Ok(Mode::AltFlight));
        assert_eq!("  FLIGHT\n".parse::<Mode>(), Ok(Mode::Flight));
        assert!("orbit".parse::<Mode>().is_err());
    }

    #[test]
    fn test_enabled_modes_default_only() {
        let modes = EnabledModes::default();
        assert!(modes.contains(Mode::Flight));
        assert!(!modes.contains(Mode::AltFlight));
        assert_eq!(modes.iter().collect::<Vec<_>>(), vec![Mode::Flight]);
    }

    #[test]
    fn test_enabled_modes_enable() {
        let mut modes = EnabledModes::default();
        modes.enable(Mode::Ground);
        assert_eq!(modes.iter().collect::<Vec<_>>(), vec![Mode::Flight, Mode::Ground]);
    }
}
