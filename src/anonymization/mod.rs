//! Reversible anonymization of session text
//!
//! Known patient identifiers and pattern-matched PHI are replaced with
//! placeholders before any text leaves the process. The resulting
//! [`AnonymizationMap`] reverses the substitution on generated output.
//!
//! # Architecture
//!
//! - **Boundary matching**: Unicode-aware exact replace ([`boundary`])
//! - **Patterns**: compiled regex classes ([`patterns::PatternRegistry`])
//! - **Anonymizer**: fixed-order passes producing text and map ([`Anonymizer`])
//! - **De-anonymizer**: longest-key-first reversal ([`deanonymize`])
//!
//! Exact identifiers round-trip losslessly. Pattern-matched content is
//! best-effort: single-slot classes such as `[PHONE]` keep only the first
//! original value, and PHI that neither matches an identifier nor a pattern
//! stays in the text.
//!
//! # Usage
//!
//! ```rust
//! use phiscribe::anonymization::{deanonymize, Anonymizer};
//! use phiscribe::domain::PatientIdentifiers;
//!
//! let anonymizer = Anonymizer::with_defaults().unwrap();
//! let ids = PatientIdentifiers::with_name("Jane Roe");
//! let out = anonymizer.anonymize("Jane Roe reports insomnia.", &ids);
//!
//! assert_eq!(out.text, "[PATIENT_NAME] reports insomnia.");
//! assert_eq!(deanonymize(&out.text, &out.map), "Jane Roe reports insomnia.");
//! ```

pub mod anonymizer;
pub mod boundary;
pub mod config;
pub mod deanonymizer;
pub mod map;
pub mod patterns;

// Re-export main types
pub use anonymizer::{Anonymized, Anonymizer};
pub use config::AnonymizationConfig;
pub use deanonymizer::deanonymize;
pub use map::AnonymizationMap;
pub use patterns::{PatternClass, PatternRegistry, PlaceholderStyle};
