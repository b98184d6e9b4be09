//! Pattern classes for PHI that is not known up front
//!
//! Each class is a small set of regular expressions. When a regex defines a
//! named group `phi`, only that group is replaced and the rest of the match
//! (unit words, relation words, titles, qualifiers) stays in the text so the
//! anonymized sentence remains grammatical. Without a `phi` group the whole
//! match is replaced.
//!
//! Keyword alternations use scoped `(?i:...)` groups so that the capitalized
//! name that follows them is still matched case-sensitively.

use crate::domain::errors::ScribeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// How placeholders of a class are numbered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// One slot for every occurrence, e.g. `[PHONE]`
    Single,
    /// A fresh 1-based index per occurrence, e.g. `[DATE_1]`, `[DATE_2]`
    Indexed,
}

impl PlaceholderStyle {
    /// Formats a placeholder for a base label and occurrence index
    pub fn placeholder(&self, base: &str, index: usize) -> String {
        match self {
            Self::Single => format!("[{base}]"),
            Self::Indexed => format!("[{base}_{index}]"),
        }
    }
}

/// Pattern-matched PHI classes, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternClass {
    Email,
    Phone,
    Date,
    Age,
    Relative,
    Employer,
    Professional,
    City,
}

impl PatternClass {
    /// Every class in application order
    pub const ALL: [PatternClass; 8] = [
        Self::Email,
        Self::Phone,
        Self::Date,
        Self::Age,
        Self::Relative,
        Self::Employer,
        Self::Professional,
        Self::City,
    ];

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Date => "date",
            Self::Age => "age",
            Self::Relative => "relative",
            Self::Employer => "employer",
            Self::Professional => "professional",
            Self::City => "city",
        }
    }

    /// Placeholder label without brackets or index
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Date => "DATE",
            Self::Age => "AGE",
            Self::Relative => "RELATIVE",
            Self::Employer => "EMPLOYER",
            Self::Professional => "PROFESSIONAL",
            Self::City => "CITY",
        }
    }

    pub fn style(&self) -> PlaceholderStyle {
        match self {
            Self::Date | Self::Relative => PlaceholderStyle::Indexed,
            _ => PlaceholderStyle::Single,
        }
    }

    fn sources(&self) -> &'static [&'static str] {
        match self {
            Self::Email => &[r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}"],
            Self::Phone => &[
                r"(?:\+\d{1,3}[\s\-]?|\b8[\s\-]?)?\(\d{3}\)[\s\-]?\d{3}[\s\-]?(?:\d{2}[\s\-]?\d{2}|\d{4})\b",
                r"(?:\+\d{1,3}[\s\-]?|\b8[\s\-]?)?\b\d{3}[\s\-]\d{3}[\s\-]?(?:\d{2}[\s\-]?\d{2}|\d{4})\b",
            ],
            Self::Date => &[
                r"\b\d{4}-\d{2}-\d{2}\b",
                r"\b\d{1,2}[./\-]\d{1,2}[./\-]\d{2,4}\b",
            ],
            Self::Age => &[
                r"\b(?P<phi>\d{1,3})\s*(?i:лет|года|год|years?\s+old|y/o|yo)\b",
                r"\b(?P<phi>\d{1,3})-(?i:year-old|years-old)\b",
            ],
            Self::Relative => &[
                r"\b(?i:брат|брата|брату|сестра|сестры|сестре|мать|матери|мама|мамы|отец|отца|папа|папы|сын|сына|дочь|дочери|муж|мужа|жена|жены|бабушка|бабушки|дедушка|дедушки|brother|sister|mother|father|son|daughter|husband|wife|grandmother|grandfather)\s+(?P<phi>\p{Lu}\p{Ll}+)",
            ],
            Self::Employer => &[
                r"\b(?i:работает|работаю|работал|работала|works|worked|employed)\s+(?i:в|на|at|for|by)\s+(?P<phi>«[^»\n]{1,60}»|\x22[^\x22\n]{1,60}\x22|\p{Lu}[\p{L}\-]*(?:\s+\p{Lu}[\p{L}\-]*){0,3})",
                r"\b(?:ООО|ОАО|ЗАО|ПАО|АО|ИП)\s+(?P<phi>«[^»\n]{1,60}»|\x22[^\x22\n]{1,60}\x22)",
            ],
            Self::Professional => &[
                r"\b(?i:доктор|врач|врача|психолог|психотерапевт|терапевт|профессор|медсестра|doctor|dr\.|prof\.|nurse|therapist)\s*(?P<phi>\p{Lu}\p{Ll}+(?:\s+\p{Lu}\.\s?\p{Lu}\.|\s+\p{Lu}\p{Ll}+)?)",
            ],
            Self::City => &[
                r"\b(?i:город|городе|города|г\.|city\s+of|town\s+of)\s*(?P<phi>\p{Lu}[\p{L}\-]+)",
            ],
        }
    }
}

impl fmt::Display for PatternClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|class| class.name() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown pattern class '{s}'. Must be one of: {}",
                    Self::ALL.map(|c| c.name()).join(", ")
                )
            })
    }
}

/// Compiled regex with its class
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub class: PatternClass,
    pub regex: Regex,
}

impl CompiledPattern {
    /// Whether the regex names a `phi` group to replace
    pub fn has_phi_group(&self) -> bool {
        self.regex.capture_names().flatten().any(|name| name == "phi")
    }
}

/// Compiled pattern classes in application order
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
}

impl PatternRegistry {
    /// Compiles every built-in class
    pub fn builtin() -> Result<Self> {
        Self::with_classes(&PatternClass::ALL)
    }

    /// Compiles the given classes, keeping the built-in application order
    pub fn with_classes(classes: &[PatternClass]) -> Result<Self> {
        let mut patterns = Vec::new();
        for class in PatternClass::ALL.into_iter().filter(|c| classes.contains(c)) {
            for source in class.sources() {
                let regex = Regex::new(source).map_err(|e| {
                    ScribeError::Configuration(format!("Invalid regex for pattern '{class}': {e}"))
                })?;
                patterns.push(CompiledPattern { class, regex });
            }
        }
        Ok(Self { patterns })
    }

    /// All compiled patterns in application order
    pub fn all_patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// Patterns of one class
    pub fn patterns_for_class(&self, class: PatternClass) -> impl Iterator<Item = &CompiledPattern> {
        self.patterns.iter().filter(move |p| p.class == class)
    }

    /// Distinct classes in application order
    pub fn classes(&self) -> Vec<PatternClass> {
        let mut classes: Vec<PatternClass> = Vec::new();
        for p in &self.patterns {
            if !classes.contains(&p.class) {
                classes.push(p.class);
            }
        }
        classes
    }
}
