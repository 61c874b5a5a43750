#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Display-name normalization for facility labels.
//!
//! Source systems publish names upper-cased, accent-stripped and
//! inconsistently abbreviated (`"PISTA DE PATNAJE"`,
//! `"Intitucion Educativa ... - SEDE SAN Isidro"`). [`Normalizer`] turns
//! them into canonical display strings:
//!
//! 1. Trim and collapse whitespace
//! 2. Exact override table (raw, upper, lower, title case, then any casing)
//! 3. Lower-case fully upper-case input
//! 4. Abbreviation expansions
//! 5. Per-word acronyms, corrections, stop words and capitalization
//! 6. Wrap a trailing branch qualifier as `(Sede <name>)`
//! 7. Collapse whitespace
//!
//! Every rule lives in a [`NormalizerConfig`]; normalization itself is
//! pure and deterministic.

pub mod config;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

pub use config::{ExpansionRule, NormalizerConfig, OverrideRule};

/// Environment variable naming a replacement rules file.
pub const RULES_ENV_VAR: &str = "DIME_NORMALIZER_RULES";

/// Display string for a record without a zone label.
pub const MISSING_ZONE_LABEL: &str = "Dirección no disponible";

/// Dotted acronyms such as `S.A.S.` or `C.D.I.`.
static DOTTED_ACRONYM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\p{L}\.){2,}\p{L}?$").expect("valid regex"));

/// Errors that can occur while building a [`Normalizer`].
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// Rules file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rules file is not valid TOML for [`NormalizerConfig`].
    #[error("Rules parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// An expansion or branch pattern failed to compile.
    #[error("Invalid rule pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Compiled, immutable rule set.
#[derive(Debug, Clone)]
pub struct Normalizer {
    overrides: HashMap<String, String>,
    folded_overrides: HashMap<String, String>,
    expansions: Vec<(Regex, String)>,
    corrections: HashMap<String, String>,
    acronyms: HashMap<String, String>,
    stop_words: HashSet<String>,
    branch: Option<BranchRule>,
}

#[derive(Debug, Clone)]
struct BranchRule {
    qualifier: String,
    dashed: Regex,
    adjacent: Regex,
}

impl Normalizer {
    /// Compiles a rule set.
    ///
    /// Canonical override values and corrected words are registered as
    /// fixed points so that normalizing an already-normalized label returns
    /// it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Regex`] if an expansion pattern or the
    /// branch qualifier cannot be compiled.
    pub fn new(config: NormalizerConfig) -> Result<Self, NormalizeError> {
        let mut overrides = HashMap::new();
        let mut folded_overrides = HashMap::new();
        for rule in &config.overrides {
            let from = collapse_whitespace(&rule.from);
            let to = collapse_whitespace(&rule.to);
            folded_overrides
                .entry(from.to_lowercase())
                .or_insert_with(|| to.clone());
            overrides.insert(from, to);
        }
        for rule in &config.overrides {
            let to = collapse_whitespace(&rule.to);
            folded_overrides
                .entry(to.to_lowercase())
                .or_insert_with(|| to.clone());
            overrides.entry(to.clone()).or_insert(to);
        }

        let expansions = config
            .expansions
            .iter()
            .map(|rule| Ok((Regex::new(&rule.pattern)?, rule.replacement.clone())))
            .collect::<Result<Vec<_>, NormalizeError>>()?;

        let branch = if config.branch_qualifier.trim().is_empty() {
            None
        } else {
            Some(BranchRule::new(config.branch_qualifier.trim())?)
        };

        log::debug!(
            "Compiled normalizer: {} overrides, {} expansions, {} corrections, {} acronyms",
            config.overrides.len(),
            expansions.len(),
            config.corrections.len(),
            config.acronyms.len(),
        );

        Ok(Self {
            overrides,
            folded_overrides,
            expansions,
            corrections: with_fixed_points(config.corrections),
            acronyms: with_fixed_points(config.acronyms),
            stop_words: config
                .stop_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .collect(),
            branch,
        })
    }

    /// Normalizer over the embedded default rules.
    ///
    /// # Panics
    ///
    /// Panics if the embedded rules do not compile. They are covered by
    /// tests, so this indicates a development error.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(NormalizerConfig::builtin())
            .unwrap_or_else(|e| panic!("Embedded normalizer rules are invalid: {e}"))
    }

    /// Loads rules from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the file cannot be read, parsed or
    /// compiled.
    pub fn from_path(path: &Path) -> Result<Self, NormalizeError> {
        Self::new(NormalizerConfig::from_path(path)?)
    }

    /// Loads rules from `DIME_NORMALIZER_RULES` when set, otherwise the
    /// embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the configured file is unusable.
    pub fn from_env() -> Result<Self, NormalizeError> {
        match std::env::var(RULES_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading normalizer rules from {path}");
                Self::from_path(Path::new(path.trim()))
            }
            _ => Ok(Self::builtin()),
        }
    }

    /// Returns the canonical display form of a raw label.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return collapsed;
        }

        if let Some(canonical) = self.lookup_override(&collapsed) {
            return canonical.to_string();
        }

        let mut text = if collapsed.chars().count() > 1 && collapsed == collapsed.to_uppercase() {
            collapsed.to_lowercase()
        } else {
            collapsed
        };

        for (pattern, replacement) in &self.expansions {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }

        // The word after the branch qualifier starts a name, like the first word.
        let mut after_qualifier = false;
        let words: Vec<String> = text
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| {
                let normalized = self.normalize_word(word, i == 0 || after_qualifier);
                after_qualifier = self.is_branch_qualifier(word);
                normalized
            })
            .collect();
        let mut text = words.join(" ");

        if let Some(branch) = &self.branch {
            text = branch.wrap(&text);
        }

        collapse_whitespace(&text)
    }

    /// Formats a zone label for display: `"Zona: <normalized>"`, or
    /// [`MISSING_ZONE_LABEL`] when absent or blank.
    #[must_use]
    pub fn format_zone(&self, zone: Option<&str>) -> String {
        match zone.map(str::trim) {
            Some(z) if !z.is_empty() => format!("Zona: {}", self.normalize(z)),
            _ => MISSING_ZONE_LABEL.to_string(),
        }
    }

    fn lookup_override(&self, text: &str) -> Option<&str> {
        let upper = text.to_uppercase();
        let lower = text.to_lowercase();
        let title = title_case(text);

        [text, upper.as_str(), lower.as_str(), title.as_str()]
            .into_iter()
            .find_map(|form| self.overrides.get(form))
            .or_else(|| self.folded_overrides.get(&lower))
            .map(String::as_str)
    }

    fn is_branch_qualifier(&self, word: &str) -> bool {
        let (_, core, _) = split_punctuation(word);
        self.branch
            .as_ref()
            .is_some_and(|b| core.to_lowercase() == b.qualifier.to_lowercase())
    }

    /// Normalizes one token. Surrounding brackets, quotes and commas are
    /// kept as-is so `NORTE` and `NORTE)` normalize the same way.
    fn normalize_word(&self, word: &str, first: bool) -> String {
        let (lead, core, trail) = split_punctuation(word);
        if core.is_empty() {
            return word.to_string();
        }
        format!("{lead}{}{trail}", self.normalize_core(core, first))
    }

    fn normalize_core(&self, word: &str, first: bool) -> String {
        let lower = word.to_lowercase();

        if let Some(acronym) = self.acronyms.get(&lower) {
            return acronym.clone();
        }

        if let Some(corrected) = self.corrections.get(&lower) {
            let corrected_lower = corrected.to_lowercase();
            if !first && self.stop_words.contains(&corrected_lower) {
                return corrected_lower;
            }
            return corrected.clone();
        }

        if self.looks_like_acronym(word, &lower) {
            return word.to_uppercase();
        }

        if !first && self.stop_words.contains(&lower) {
            return lower;
        }

        capitalize(word)
    }

    fn looks_like_acronym(&self, word: &str, lower: &str) -> bool {
        if self.stop_words.contains(lower) {
            return false;
        }
        if DOTTED_ACRONYM_RE.is_match(word) {
            return true;
        }

        let len = word.chars().count();
        let upper_alnum = word.chars().all(char::is_alphanumeric)
            && word.chars().any(char::is_alphabetic)
            && word == word.to_uppercase();
        if upper_alnum && (2..=6).contains(&len) {
            return true;
        }

        len <= 6
            && word
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }
}

impl BranchRule {
    fn new(qualifier: &str) -> Result<Self, regex::Error> {
        let q = regex::escape(qualifier);
        Ok(Self {
            qualifier: capitalize(qualifier),
            dashed: Regex::new(&format!(r"(?i)\s+-\s+{q}\s+([^-]+?)(?:\s*-\s*|$)"))?,
            adjacent: Regex::new(&format!(
                r"(?i)\s+{q}\s+([\p{{L}}\p{{N}}\s]+?)(?:\s*-\s*|$)"
            ))?,
        })
    }

    fn wrap(&self, text: &str) -> String {
        let wrap = |caps: &Captures<'_>| format!(" ({} {}) ", self.qualifier, caps[1].trim());
        let text = self.dashed.replace_all(text, wrap);
        self.adjacent.replace_all(&text, wrap).into_owned()
    }
}

/// Splits a token into leading punctuation, core and trailing punctuation.
///
/// Periods stay in the core so `S.A.S.` and `Cra.` keep their meaning.
fn split_punctuation(word: &str) -> (&str, &str, &str) {
    let is_edge = |c: char| !c.is_alphanumeric() && c != '.';
    let rest = word.trim_start_matches(is_edge);
    let lead = &word[..word.len() - rest.len()];
    let core = rest.trim_end_matches(is_edge);
    (lead, core, &rest[core.len()..])
}

/// Registers every value's lower-case form as a key mapping to itself.
fn with_fixed_points(rules: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = rules
        .into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect();
    let values: Vec<String> = map.values().cloned().collect();
    for value in values {
        map.entry(value.to_lowercase()).or_insert(value);
    }
    map
}

/// Trims and collapses internal whitespace runs to one space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-cases the first letter of a word and lower-cases the rest.
///
/// Leading punctuation is kept, so `"(sede"` becomes `"(Sede"`.
#[must_use]
pub fn capitalize(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut seen_letter = false;
    for c in word.chars() {
        if !seen_letter && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            seen_letter = true;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Capitalizes every whitespace-separated word.
#[must_use]
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::builtin()
    }

    #[test]
    fn empty_and_blank_input_stay_empty() {
        let n = normalizer();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   \t "), "");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalizer().normalize("  Parque    Principal "), "Parque Principal");
    }

    #[test]
    fn override_table_fixes_skating_rink_typo() {
        let n = normalizer();
        assert_eq!(n.normalize("PISTA DE PATNAJE"), "Pista de Patinaje");
        assert_eq!(n.normalize("pista de patnaje"), "Pista de Patinaje");
        assert_eq!(n.normalize("  PISTA   DE PATNAJE "), "Pista de Patinaje");
    }

    #[test]
    fn every_override_key_maps_in_any_casing() {
        let n = normalizer();
        for rule in NormalizerConfig::builtin().overrides {
            let expected = collapse_whitespace(&rule.to);
            for form in [
                rule.from.clone(),
                rule.from.to_uppercase(),
                rule.from.to_lowercase(),
                title_case(&rule.from),
            ] {
                assert_eq!(n.normalize(&form), expected, "override input {form:?}");
            }
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = normalizer();
        let mut inputs: Vec<String> = [
            "ALCALDIA MUNICIPAL DE TOLU",
            "cancha de microfutbol barrio la esperanza",
            "INTITUCION EDUCATIVA NUEVA ERA - SEDE LA CANDELARIA",
            "COLEGIO SAN JOSE SEDE PRIMARIA",
            "I.E. Francisco José de Caldas",
            "Hogar Infantil ICBF",
            "cdi mi pequeño mundo",
            "Fundación S.A.S. Tolú",
            "ESTACION DE POLICIA",
            "Muelle Turistico",
            "Instituto Freinet Pre-Escolar y Primaria",
            "Sede 2",
            "Escuela Rural SEDE NORTE",
            "Colegio Mixto - Sede ABC",
            "escuela sede el palmar",
            "\"CASA DEL ADULTO MAYOR\",",
            "a",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        inputs.extend(
            NormalizerConfig::builtin()
                .overrides
                .into_iter()
                .map(|r| r.from),
        );

        for input in inputs {
            let once = n.normalize(&input);
            assert_eq!(n.normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn upper_case_input_is_recapitalized_with_corrections() {
        let n = normalizer();
        assert_eq!(
            n.normalize("ALCALDIA MUNICIPAL DE TOLU"),
            "Alcaldía Municipal de Tolú"
        );
        assert_eq!(n.normalize("ESTACION DE POLICIA"), "Estación de Policía");
        assert_eq!(n.normalize("MUELLE TURISTICO"), "Muelle Turístico");
    }

    #[test]
    fn stop_words_are_lower_case_unless_first() {
        let n = normalizer();
        assert_eq!(
            n.normalize("cancha de microfutbol barrio la esperanza"),
            "Cancha de Microfútbol Barrio la Esperanza"
        );
        assert_eq!(n.normalize("la ceiba"), "La Ceiba");
        assert_eq!(n.normalize("Desarrollo Y Turismo"), "Desarrollo y Turismo");
    }

    #[test]
    fn expands_institution_abbreviation() {
        assert_eq!(
            normalizer().normalize("I.E. Francisco José de Caldas"),
            "Institución Educativa Francisco José de Caldas"
        );
        assert_eq!(
            normalizer().normalize("i.e francisco jose de caldas"),
            "Institución Educativa Francisco José de Caldas"
        );
    }

    #[test]
    fn keeps_and_restores_acronyms() {
        let n = normalizer();
        assert_eq!(n.normalize("Hogar Infantil ICBF"), "Hogar Infantil ICBF");
        assert_eq!(n.normalize("cdi mi pequeño mundo"), "CDI Mi Pequeño Mundo");
        assert_eq!(n.normalize("Fundación S.A.S. Tolú"), "Fundación S.A.S. Tolú");
        assert_eq!(n.normalize("Puesto de Salud ESE"), "Puesto de Salud ESE");
    }

    #[test]
    fn abbreviated_word_is_not_an_acronym() {
        assert_eq!(normalizer().normalize("parque cra. 5"), "Parque Cra. 5");
    }

    #[test]
    fn wraps_dashed_branch_qualifier() {
        assert_eq!(
            normalizer().normalize("INTITUCION EDUCATIVA NUEVA ERA - SEDE LA CANDELARIA"),
            "Institución Educativa Nueva Era (Sede La Candelaria)"
        );
    }

    #[test]
    fn branch_name_starts_capitalized() {
        let n = normalizer();
        assert_eq!(
            n.normalize("ESCUELA NUEVA ERA SEDE EL PALMAR"),
            "Escuela Nueva Era (Sede El Palmar)"
        );
        assert_eq!(
            n.normalize("Escuela Nueva Era (Sede El Palmar)"),
            "Escuela Nueva Era (Sede El Palmar)"
        );
    }

    #[test]
    fn short_upper_case_branch_name_survives_renormalization() {
        let n = normalizer();
        let once = n.normalize("Escuela Rural SEDE NORTE");
        assert_eq!(once, "Escuela Rural (Sede NORTE)");
        assert_eq!(n.normalize(&once), once);

        let once = n.normalize("Colegio Mixto - Sede ABC");
        assert_eq!(once, "Colegio Mixto (Sede ABC)");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn surrounding_punctuation_does_not_change_the_word() {
        let n = normalizer();
        assert_eq!(n.normalize("(ICBF)"), "(ICBF)");
        assert_eq!(n.normalize("Parque \"tolu\""), "Parque \"Tolú\"");
        assert_eq!(split_punctuation("(Sede"), ("(", "Sede", ""));
        assert_eq!(split_punctuation("S.A.S.),"), ("", "S.A.S.", "),"));
        assert_eq!(split_punctuation("-"), ("-", "", ""));
    }

    #[test]
    fn wraps_adjacent_branch_qualifier() {
        assert_eq!(
            normalizer().normalize("COLEGIO SAN JOSE SEDE PRIMARIA"),
            "Colegio San José (Sede Primaria)"
        );
    }

    #[test]
    fn wrapped_branch_is_not_wrapped_again() {
        let n = normalizer();
        let once = n.normalize("Colegio Nueva Era Sede Santa Lucia");
        assert_eq!(once, "Colegio Nueva Era (Sede Santa Lucía)");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn accented_branch_names_are_wrapped() {
        assert_eq!(
            normalizer().normalize("Escuela Rural Sede Alegría"),
            "Escuela Rural (Sede Alegría)"
        );
    }

    #[test]
    fn formats_zone_labels() {
        let n = normalizer();
        assert_eq!(n.format_zone(Some("URBANA")), "Zona: Urbana");
        assert_eq!(n.format_zone(Some("  rural ")), "Zona: Rural");
        assert_eq!(n.format_zone(Some("  ")), MISSING_ZONE_LABEL);
        assert_eq!(n.format_zone(None), MISSING_ZONE_LABEL);
    }

    #[test]
    fn custom_rules_are_honored() {
        let config = NormalizerConfig::from_toml(
            r#"
            branch_qualifier = "Branch"
            stop_words = ["of"]

            [corrections]
            colour = "Color"

            [[overrides]]
            from = "MAIN  LIB"
            to = "Main Library"
            "#,
        )
        .unwrap();
        let n = Normalizer::new(config).unwrap();
        assert_eq!(n.normalize("main lib"), "Main Library");
        assert_eq!(n.normalize("house of colour"), "House of Color");
        assert_eq!(n.normalize("museum branch north"), "Museum (Branch North)");
    }

    #[test]
    fn invalid_expansion_pattern_is_rejected_at_construction() {
        let config = NormalizerConfig {
            expansions: vec![ExpansionRule {
                pattern: "(unclosed".to_string(),
                replacement: String::new(),
            }],
            ..NormalizerConfig::default()
        };
        assert!(matches!(
            Normalizer::new(config),
            Err(NormalizeError::Regex(_))
        ));
    }

    #[test]
    fn capitalize_skips_leading_punctuation() {
        assert_eq!(capitalize("(sede"), "(Sede");
        assert_eq!(capitalize("ÁGUILA"), "Águila");
        assert_eq!(capitalize("2"), "2");
        assert_eq!(title_case("SAN  ANTONIO"), "San Antonio");
    }
}
