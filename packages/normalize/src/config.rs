//! Normalization rule set.
//!
//! The rules are plain data so new corrections can be added to
//! `rules/default.toml` (or a replacement file) without touching the
//! normalization control flow.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::NormalizeError;

/// Rules embedded at compile time.
pub const DEFAULT_RULES: &str = include_str!("../rules/default.toml");

/// Complete rule set consumed by [`crate::Normalizer`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Exact label replacements, matched case-insensitively.
    pub overrides: Vec<OverrideRule>,
    /// Regex replacements applied to the whole label before tokenizing.
    pub expansions: Vec<ExpansionRule>,
    /// Lower-case word → corrected word (diacritics and misspellings).
    pub corrections: BTreeMap<String, String>,
    /// Lower-case word → canonical acronym.
    pub acronyms: BTreeMap<String, String>,
    /// Articles, prepositions and conjunctions kept lower-case unless first.
    pub stop_words: Vec<String>,
    /// Word introducing a branch/site name (e.g., `"Sede"`).
    pub branch_qualifier: String,
}

/// A literal noisy label and its canonical display form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Label as published.
    pub from: String,
    /// Canonical display string.
    pub to: String,
}

/// A regex substitution (uses `regex` replacement syntax, e.g. `${1}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionRule {
    /// Regex pattern.
    pub pattern: String,
    /// Replacement template.
    pub replacement: String,
}

impl NormalizerConfig {
    /// Parses the embedded default rule set.
    ///
    /// # Panics
    ///
    /// Panics if `rules/default.toml` is malformed. The file is embedded at
    /// compile time and covered by tests.
    #[must_use]
    pub fn builtin() -> Self {
        toml::de::from_str(DEFAULT_RULES)
            .unwrap_or_else(|e| panic!("Failed to parse rules/default.toml: {e}"))
    }

    /// Parses a rule set from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Toml`] if the text is not a valid rule set.
    pub fn from_toml(text: &str) -> Result<Self, NormalizeError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Reads a rule set from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, NormalizeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_parse() {
        let config = NormalizerConfig::builtin();
        assert!(!config.overrides.is_empty());
        assert!(!config.stop_words.is_empty());
        assert_eq!(config.branch_qualifier, "Sede");
        assert_eq!(config.corrections.get("tolu").map(String::as_str), Some("Tolú"));
        assert_eq!(config.acronyms.get("cdi").map(String::as_str), Some("CDI"));
    }

    #[test]
    fn builtin_rule_keys_are_lower_case() {
        let config = NormalizerConfig::builtin();
        for key in config.corrections.keys().chain(config.acronyms.keys()) {
            assert_eq!(key, &key.to_lowercase(), "rule key {key} must be lower-case");
        }
        for word in &config.stop_words {
            assert_eq!(word, &word.to_lowercase(), "stop word {word} must be lower-case");
        }
    }

    #[test]
    fn builtin_overrides_have_both_sides() {
        for rule in &NormalizerConfig::builtin().overrides {
            assert!(!rule.from.trim().is_empty(), "override with empty key");
            assert!(!rule.to.trim().is_empty(), "{}: empty replacement", rule.from);
        }
    }

    #[test]
    fn partial_rule_file_uses_defaults() {
        let config = NormalizerConfig::from_toml("stop_words = [\"de\"]").unwrap();
        assert_eq!(config.stop_words, vec!["de".to_string()]);
        assert!(config.overrides.is_empty());
        assert!(config.branch_qualifier.is_empty());
    }
}
