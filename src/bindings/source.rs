//! # Binding Sources
//!
//! The read-only section/key store bindings are resolved from.
//!
//! [`SectionStore`] is built from the same TOML file as the runtime
//! [`Config`](crate::config::Config). Every table becomes a section named by
//! its dotted path, so `[input1.AltFlight]` is the section
//! `"input1.AltFlight"`. Scalars of any type are exposed as strings. Keys that
//! contain a dot must be quoted:
//!
//! ```toml
//! [input1]
//! Interface = "evdev"
//! AxisX = "roll"
//! "AxisX.Inverted" = true
//!
//! [input1.AltFlight]
//! AxisX = "yaw"
//! ```

use std::collections::BTreeMap;
use toml::{Table, Value};

use crate::error::Result;

/// Read contract the resolver needs from a configuration store.
pub trait ConfigSource {
    /// Raw value of `key` in `section`, if present.
    fn value(&self, section: &str, key: &str) -> Option<&str>;

    /// Whether `section` exists at all, whatever keys it holds.
    fn has_section(&self, section: &str) -> bool;

    /// Value of `key` in `section`, or the empty string when absent.
    fn get(&self, section: &str, key: &str) -> &str {
        self.value(section, key).unwrap_or("")
    }
}

/// In-memory section/key store.
///
/// # Examples
///
/// ```
/// use alt_input::bindings::{ConfigSource, SectionStore};
///
/// let store = SectionStore::from_toml_str(r#"
/// [input1]
/// AxisY = "pitch"
/// "AxisY.Inverted" = true
///
/// [input1.Ground]
/// AxisY = "wheelThrottle"
/// "#)?;
///
/// assert_eq!(store.get("input1", "AxisY"), "pitch");
/// assert_eq!(store.get("input1", "AxisY.Inverted"), "true");
/// assert_eq!(store.get("input1.Ground", "AxisY"), "wheelThrottle");
/// assert_eq!(store.get("input1.AltFlight", "AxisY"), "");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SectionStore {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SectionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses TOML text and flattens its tables into sections.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: Table = contents.parse()?;
        let mut store = Self::new();
        store.collect("", &table);
        Ok(store)
    }

    /// Inserts or replaces a single value, creating the section if needed.
    pub fn insert(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Declares a section without any keys.
    pub fn add_section(&mut self, section: &str) {
        self.sections.entry(section.to_string()).or_default();
    }

    /// Number of sections in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the store has no sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn collect(&mut self, prefix: &str, table: &Table) {
        for (key, value) in table {
            match value {
                Value::Table(inner) => {
                    let section = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    self.add_section(&section);
                    self.collect(&section, inner);
                }
                // Top-level scalars have no section to live in
                _ if prefix.is_empty() => {}
                Value::String(s) => self.insert(prefix, key, s),
                other => self.insert(prefix, key, &other.to_string()),
            }
        }
    }
}

impl ConfigSource for SectionStore {
    fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_tables_become_dotted_sections() {
        let store = SectionStore::from_toml_str(
            r#"
[input1]
Name = "Saitek"

[input1.AltFlight]
AxisX = "yaw"

[input1.Ground]
"#,
        )
        .unwrap();

        assert!(store.has_section("input1"));
        assert!(store.has_section("input1.AltFlight"));
        assert!(store.has_section("input1.Ground"));
        assert!(!store.has_section("input2"));
        assert_eq!(store.get("input1", "Name"), "Saitek");
        assert_eq!(store.get("input1.AltFlight", "AxisX"), "yaw");
    }

    #[test]
    fn test_empty_section_is_present() {
        let store = SectionStore::from_toml_str("[input1.Ground]\n").unwrap();
        assert!(store.has_section("input1.Ground"));
        assert_eq!(store.value("input1.Ground", "AxisX"), None);
    }

    #[test]
    fn test_scalars_are_stringified() {
        let store = SectionStore::from_toml_str(
            r#"
[global]
version = 1.3

[input1]
DeadZone = 0.1
"AxisX.Inverted" = true
Buffer = 128
"#,
        )
        .unwrap();

        assert_eq!(store.get("global", "version"), "1.3");
        assert_eq!(store.get("input1", "DeadZone"), "0.1");
        assert_eq!(store.get("input1", "AxisX.Inverted"), "true");
        assert_eq!(store.get("input1", "Buffer"), "128");
    }

    #[test]
    fn test_missing_values_are_empty() {
        let store = SectionStore::new();
        assert_eq!(store.get("input1", "AxisX"), "");
        assert_eq!(store.value("input1", "AxisX"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_top_level_scalars_ignored() {
        let store = SectionStore::from_toml_str("stray = 1\n[a]\nb = 2\n").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("", "stray"), "");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(SectionStore::from_toml_str("[input1\nAxisX = ").is_err());
    }

    #[test]
    fn test_insert_overrides() {
        let mut store = SectionStore::new();
        store.insert("input1", "AxisX", "pitch");
        store.insert("input1", "AxisX", "roll");
        assert_eq!(store.get("input1", "AxisX"), "roll");
    }
}
