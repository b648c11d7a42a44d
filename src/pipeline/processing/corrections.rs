use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const BUILTIN_CORRECTIONS: &str = include_str!("../../../config/corrections.toml");

/// A versioned lookup table mapping known misspellings and variants to a
/// canonical label. Keys match case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionTable {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

impl CorrectionTable {
    pub fn new(version: &str, entries: &[(&str, &str)]) -> Self {
        Self {
            version: version.to_string(),
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Canonical label for `value`, if the table knows it
    pub fn lookup(&self, value: &str) -> Option<&str> {
        if let Some(hit) = self.entries.get(value) {
            return Some(hit.as_str());
        }
        let lowered = value.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| k.to_lowercase() == lowered)
            .map(|(_, v)| v.as_str())
    }

    /// True when `value` is already one of the canonical labels
    pub fn is_canonical(&self, value: &str) -> bool {
        self.entries.values().any(|v| v == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The correction tables for every categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Corrections {
    pub gender: CorrectionTable,
    pub insurance: CorrectionTable,
    pub city: CorrectionTable,
}

impl Corrections {
    /// Parse correction tables from TOML text
    pub fn from_toml(text: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Shape of the built-in file; every table is required there.
#[derive(Deserialize)]
struct BuiltinCorrections {
    gender: CorrectionTable,
    insurance: CorrectionTable,
    city: CorrectionTable,
}

impl Default for Corrections {
    fn default() -> Self {
        let builtin: BuiltinCorrections =
            toml::from_str(BUILTIN_CORRECTIONS).expect("built-in corrections table is valid TOML");
        Self {
            gender: builtin.gender,
            insurance: builtin.insurance,
            city: builtin.city,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_load() {
        let corrections = Corrections::default();
        assert_eq!(corrections.gender.lookup("male"), Some("Male"));
        assert_eq!(corrections.insurance.lookup("Uninsurred"), Some("Uninsured"));
        assert_eq!(corrections.city.lookup("Lincon"), Some("Lincoln"));
        assert!(!corrections.city.version.is_empty());
    }

    #[test]
    fn lookup_ignores_case() {
        let corrections = Corrections::default();
        assert_eq!(corrections.city.lookup("O Maha"), Some("Omaha"));
        assert_eq!(corrections.insurance.lookup("Medicaid & Medicare"), Some("Medicare & Medicaid"));
        assert_eq!(corrections.insurance.lookup("MEDICARE"), Some("Medicare"));
        assert_eq!(corrections.city.lookup("Denver"), None);
    }

    #[test]
    fn partial_toml_keeps_other_builtin_tables() {
        let corrections = Corrections::from_toml(
            r#"
            [city]
            version = "custom"
            [city.entries]
            "Bellvue" = "Bellevue"
            "#,
        )
        .unwrap();
        assert_eq!(corrections.city.lookup("bellvue"), Some("Bellevue"));
        assert_eq!(corrections.city.lookup("Omha"), None);
        assert_eq!(corrections.gender.lookup("female"), Some("Female"));
    }
}
