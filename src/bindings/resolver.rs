//! # Binding Resolver
//!
//! Resolves one attribute of a device section into one value per mode.
//!
//! ## Precedence
//!
//! For a device section `input1` and a mode `M`, highest wins:
//!
//! 1. `[input1.M]`, the mode-specific override
//! 2. `[input1.Flight]`, only when `M` is not the default mode and the
//!    baseline has no value
//! 3. `[input1]`, the common baseline
//!
//! A mode is enabled for a device iff its `[input1.M]` section exists, even
//! if empty. Disabled modes and missing attributes resolve to the zero value
//! of the attribute type (empty string, `0.0`, `false`). Values that fail to
//! parse also resolve to zero and are recorded in the [`ValidationReport`].

use std::array;

use super::report::{ConfigIssue, ValidationReport};
use super::source::ConfigSource;
use crate::flight::{EnabledModes, Mode, PerMode};

/// A raw attribute value together with the section it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<'a> {
    /// Section the value came from, e.g. `input1.AltFlight`.
    pub section: String,
    /// The raw, non-empty value.
    pub value: &'a str,
}

/// Per-mode attribute resolver for one device section.
///
/// # Examples
///
/// ```
/// use alt_input::bindings::{Resolver, SectionStore};
/// use alt_input::flight::Mode;
///
/// let mut store = SectionStore::new();
/// store.insert("input1", "AxisX", "roll");
/// store.insert("input1.Ground", "AxisX", "wheelSteer");
///
/// let resolver = Resolver::new(&store, "input1");
/// let mappings = resolver.string("AxisX");
///
/// assert_eq!(mappings[Mode::Flight.index()], "roll");
/// assert_eq!(mappings[Mode::AltFlight.index()], ""); // no [input1.AltFlight]
/// assert_eq!(mappings[Mode::Ground.index()], "wheelSteer");
/// ```
pub struct Resolver<'a, S: ConfigSource + ?Sized> {
    source: &'a S,
    section: &'a str,
    modes: EnabledModes,
}

impl<'a, S: ConfigSource + ?Sized> Resolver<'a, S> {
    /// Creates a resolver for `section`, detecting its enabled modes.
    pub fn new(source: &'a S, section: &'a str) -> Self {
        let modes = Self::enabled_modes(source, section);
        Self {
            source,
            section,
            modes,
        }
    }

    /// Modes that have a mode-specific section for `section`.
    pub fn enabled_modes(source: &S, section: &str) -> EnabledModes {
        let mut modes = EnabledModes::default();
        for mode in Mode::ALL.into_iter().filter(|m| !m.is_default()) {
            if source.has_section(&mode_section(section, mode)) {
                modes.enable(mode);
            }
        }
        modes
    }

    /// Modes this resolver produces values for.
    #[must_use]
    pub fn modes(&self) -> EnabledModes {
        self.modes
    }

    /// Baseline section name.
    #[must_use]
    pub fn section(&self) -> &str {
        self.section
    }

    /// Looks up the raw value of `key` for `mode`, applying precedence.
    ///
    /// Returns `None` when the mode is disabled or no section has a
    /// non-empty value.
    pub fn lookup(&self, mode: Mode, key: &str) -> Option<Resolved<'a>> {
        if !self.modes.contains(mode) {
            return None;
        }

        let mut resolved = self.read(self.section.to_string(), key);
        if !mode.is_default() && resolved.is_none() {
            resolved = self.read(mode_section(self.section, Mode::DEFAULT), key);
        }
        if let Some(over) = self.read(mode_section(self.section, mode), key) {
            resolved = Some(over);
        }
        resolved
    }

    /// Looks up `key` for every mode.
    pub fn lookup_all(&self, key: &str) -> PerMode<Option<Resolved<'a>>> {
        array::from_fn(|i| self.lookup(Mode::ALL[i], key))
    }

    /// Resolves a string attribute.
    pub fn string(&self, key: &str) -> PerMode<String> {
        array::from_fn(|i| {
            self.lookup(Mode::ALL[i], key)
                .map(|r| r.value.trim().to_string())
                .unwrap_or_default()
        })
    }

    /// Resolves a numeric attribute, reporting unparsable values.
    pub fn number(&self, key: &str, report: &mut ValidationReport) -> PerMode<f32> {
        self.parsed(key, report, |r| {
            r.value.trim().parse::<f32>().map_err(|_| ConfigIssue::InvalidNumber {
                section: r.section.clone(),
                key: key.to_string(),
                value: r.value.to_string(),
            })
        })
    }

    /// Resolves a boolean attribute (case-insensitive), reporting
    /// unparsable values.
    pub fn boolean(&self, key: &str, report: &mut ValidationReport) -> PerMode<bool> {
        self.parsed(key, report, |r| {
            parse_bool(r.value).ok_or_else(|| ConfigIssue::InvalidBoolean {
                section: r.section.clone(),
                key: key.to_string(),
                value: r.value.to_string(),
            })
        })
    }

    /// Resolves an attribute with a custom parser. Failures are reported and
    /// resolve to `T::default()`.
    pub fn parsed<T, F>(&self, key: &str, report: &mut ValidationReport, parse: F) -> PerMode<T>
    where
        T: Default,
        F: Fn(&Resolved<'a>) -> Result<T, ConfigIssue>,
    {
        array::from_fn(|i| match self.lookup(Mode::ALL[i], key) {
            None => T::default(),
            Some(resolved) => parse(&resolved).unwrap_or_else(|issue| {
                report.push(issue);
                T::default()
            }),
        })
    }

    fn read(&self, section: String, key: &str) -> Option<Resolved<'a>> {
        let source: &'a S = self.source;
        match source.value(&section, key) {
            Some(value) if !value.trim().is_empty() => Some(Resolved { section, value }),
            _ => None,
        }
    }
}

/// Name of the mode-specific section for `section`.
#[must_use]
pub fn mode_section(section: &str, mode: Mode) -> String {
    format!("{}.{}", section, mode.name())
}

/// Parses `true`/`false` ignoring case and surrounding whitespace.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
