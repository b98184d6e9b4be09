//! Replacement of patient identifiers with placeholders

use super::boundary::find_bounded;
use super::config::AnonymizationConfig;
use super::map::AnonymizationMap;
use super::patterns::{PatternRegistry, PlaceholderStyle};
use crate::domain::errors::ScribeError;
use crate::domain::identifiers::PatientIdentifiers;
use crate::domain::result::Result;
use std::collections::BTreeMap;
use std::ops::Range;

/// Full name placeholder
pub const PATIENT_NAME: &str = "[PATIENT_NAME]";
/// Email placeholder
pub const PATIENT_EMAIL: &str = "[PATIENT_EMAIL]";
/// Phone placeholder
pub const PATIENT_PHONE: &str = "[PATIENT_PHONE]";
/// Address placeholder
pub const PATIENT_ADDRESS: &str = "[PATIENT_ADDRESS]";
/// Date of birth placeholder
pub const PATIENT_DOB: &str = "[PATIENT_DOB]";

/// Anonymized text together with the map that reverses it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anonymized {
    pub text: String,
    pub map: AnonymizationMap,
}

/// Replaces known identifiers and pattern-matched PHI with placeholders
///
/// Passes run in a fixed order and later passes never touch text already
/// replaced by an earlier one:
///
/// 1. full name, then each name token of at least `min_name_token_len`
///    characters as `[PATIENT_NAME_n]`
/// 2. email, phone, address and date of birth as given
/// 3. pattern classes in registry order
///
/// # Examples
///
/// ```
/// use phiscribe::anonymization::Anonymizer;
/// use phiscribe::domain::PatientIdentifiers;
///
/// let anonymizer = Anonymizer::with_defaults().unwrap();
/// let ids = PatientIdentifiers::with_name("Иванов Петр");
/// let out = anonymizer.anonymize("Иванов Петр, 45 лет", &ids);
///
/// assert_eq!(out.text, "[PATIENT_NAME], [AGE] лет");
/// assert_eq!(out.map.get("[AGE]"), Some("45"));
/// ```
#[derive(Debug, Clone)]
pub struct Anonymizer {
    registry: PatternRegistry,
    min_name_token_len: usize,
}

impl Anonymizer {
    /// Compiles the configured pattern classes
    pub fn new(config: &AnonymizationConfig) -> Result<Self> {
        config.validate().map_err(ScribeError::Configuration)?;
        let classes = config
            .pattern_classes()
            .map_err(ScribeError::Configuration)?;

        Ok(Self {
            registry: PatternRegistry::with_classes(&classes)?,
            min_name_token_len: config.min_name_token_len,
        })
    }

    /// Anonymizer with every pattern class enabled
    pub fn with_defaults() -> Result<Self> {
        Self::new(&AnonymizationConfig::default())
    }

    /// Anonymizes `text`; absent identifiers are skipped
    pub fn anonymize(&self, text: &str, identifiers: &PatientIdentifiers) -> Anonymized {
        let mut pass = Pass {
            text: text.to_string(),
            map: AnonymizationMap::new(),
            counts: BTreeMap::new(),
        };

        if let Some(name) = identifiers.name.as_deref() {
            pass.replace_exact(name, PATIENT_NAME, "patient_name");
            for (index, token) in self.name_tokens(name).into_iter().enumerate() {
                let placeholder = PlaceholderStyle::Indexed.placeholder("PATIENT_NAME", index + 1);
                pass.replace_exact(token, &placeholder, "patient_name");
            }
        }

        let exact = [
            (identifiers.email.as_deref(), PATIENT_EMAIL, "patient_email"),
            (identifiers.phone.as_deref(), PATIENT_PHONE, "patient_phone"),
            (identifiers.address.as_deref(), PATIENT_ADDRESS, "patient_address"),
            (identifiers.date_of_birth.as_deref(), PATIENT_DOB, "patient_dob"),
        ];
        for (value, placeholder, label) in exact {
            if let Some(value) = value {
                pass.replace_exact(value, placeholder, label);
            }
        }

        for class in self.registry.classes() {
            let style = class.style();
            let mut next_index = 1;

            for pattern in self.registry.patterns_for_class(class) {
                let taken = pass.placeholder_spans();
                let mut edits = Vec::new();

                for caps in pattern.regex.captures_iter(&pass.text) {
                    let Some(target) = caps.name("phi").or_else(|| caps.get(0)) else {
                        continue;
                    };
                    if target.as_str().trim().is_empty() || overlaps(&taken, &target.range()) {
                        continue;
                    }

                    let placeholder = style.placeholder(class.label(), next_index);
                    if style == PlaceholderStyle::Indexed {
                        next_index += 1;
                    }
                    pass.map.insert(placeholder.clone(), target.as_str());
                    edits.push((target.range(), placeholder));
                }

                *pass.counts.entry(class.name()).or_default() += edits.len();
                pass.text = splice(&pass.text, &edits);
            }
        }

        pass.counts.retain(|_, n| *n > 0);
        tracing::debug!(
            placeholders = pass.map.len(),
            replacements = pass.counts.values().sum::<usize>(),
            classes = ?pass.counts,
            map_fingerprint = %pass.map.fingerprint(),
            "Anonymized source text"
        );

        Anonymized {
            text: pass.text,
            map: pass.map,
        }
    }

    /// Distinct name tokens long enough to replace on their own
    fn name_tokens<'a>(&self, name: &'a str) -> Vec<&'a str> {
        let mut tokens: Vec<&str> = Vec::new();
        for token in name.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.chars().count() >= self.min_name_token_len && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        tokens
    }
}

/// State threaded through the passes of one `anonymize` call
struct Pass {
    text: String,
    map: AnonymizationMap,
    counts: BTreeMap<&'static str, usize>,
}

impl Pass {
    fn replace_exact(&mut self, value: &str, placeholder: &str, label: &'static str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        let taken = self.placeholder_spans();
        let edits: Vec<(Range<usize>, String)> = find_bounded(&self.text, value)
            .map(|start| start..start + value.len())
            .filter(|range| !overlaps(&taken, range))
            .map(|range| (range, placeholder.to_string()))
            .collect();

        if edits.is_empty() {
            return;
        }
        self.map.insert(placeholder, value);
        *self.counts.entry(label).or_default() += edits.len();
        self.text = splice(&self.text, &edits);
    }

    /// Byte ranges of placeholders inserted so far
    fn placeholder_spans(&self) -> Vec<Range<usize>> {
        self.map
            .iter()
            .flat_map(|(placeholder, _)| {
                self.text
                    .match_indices(placeholder)
                    .map(move |(start, _)| start..start + placeholder.len())
            })
            .collect()
    }
}

fn overlaps(taken: &[Range<usize>], range: &Range<usize>) -> bool {
    taken
        .iter()
        .any(|t| t.start < range.end && range.start < t.end)
}

/// Applies non-overlapping edits given in ascending order
fn splice(text: &str, edits: &[(Range<usize>, String)]) -> String {
    if edits.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (range, replacement) in edits {
        out.push_str(&text[last..range.start]);
        out.push_str(replacement);
        last = range.end;
    }
    out.push_str(&text[last..]);
    out
}
