// PHIScribe - PHI-safe clinical documentation generation
// Copyright (c) 2025 PHIScribe Contributors
// Licensed under the MIT License

//! # PHIScribe
//!
//! PHIScribe turns session transcripts and notes into structured clinical
//! documentation through an external text generation service, without ever
//! sending patient-identifying content to that service in the clear.
//!
//! ## Overview
//!
//! - **Anonymizing** known identifiers and pattern-matched PHI into
//!   placeholders, with a map that reverses them
//! - **Encrypting** results and maps with AES-256-GCM in a fixed
//!   `nonce || ciphertext || tag` wire format shared with other consumers
//! - **Orchestrating** many generation calls under a concurrency cap, with
//!   dispatch pacing, retry with backoff, model fallback and partial-failure
//!   aggregation
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Generation orchestrator, retry policy, progress, supervisor
//! - [`anonymization`] - Anonymizer, de-anonymizer and pattern registry
//! - [`crypto`] - Encryption codecs and legacy field reader
//! - [`adapters`] - Text generation client, record store, rate limiter
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use phiscribe::anonymization::{deanonymize, Anonymizer};
//! use phiscribe::crypto::{BlobCodec, EncryptionKey, FieldCipher};
//! use phiscribe::domain::PatientIdentifiers;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let anonymizer = Anonymizer::with_defaults()?;
//! let ids = PatientIdentifiers::with_name("Jane Roe");
//! let out = anonymizer.anonymize("Jane Roe reports better sleep", &ids);
//! assert_eq!(out.text, "[PATIENT_NAME] reports better sleep");
//!
//! // ... the anonymized text goes to the generation service ...
//! let restored = deanonymize(&out.text, &out.map);
//!
//! let codec = FieldCipher::new(&EncryptionKey::generate());
//! let blob = codec.encrypt(&restored)?;
//! assert_eq!(codec.decrypt(&blob)?, "Jane Roe reports better sleep");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`domain::ScribeError`]. Failures of a single
//! generation job are recorded on the job, never raised, so sibling jobs are
//! unaffected; a batch is `failed` only when every job failed.

pub mod adapters;
pub mod anonymization;
pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod domain;
pub mod logging;
