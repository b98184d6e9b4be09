//! Core business logic for PHIScribe.
//!
//! # Modules
//!
//! - [`generation`] - generation orchestrator, retry policy, progress recording and supervisor
//!
//! # Generation Workflow
//!
//! 1. **Prepare**: anonymize the source text once, encrypt the map and the
//!    source, persist the batch and its pending jobs
//! 2. **Dispatch**: start jobs in order under the concurrency cap and the
//!    inter-dispatch interval
//! 3. **Generate**: call the text generation service with retry and model fallback
//! 4. **Restore**: de-anonymize each result and encrypt it
//! 5. **Aggregate**: join every job, then persist the batch status
//!
//! # Example
//!
//! ```rust,no_run
//! use phiscribe::adapters::rate_limit;
//! use phiscribe::adapters::store::MemoryStore;
//! use phiscribe::adapters::textgen::HttpTextGenerator;
//! use phiscribe::config::load_config;
//! use phiscribe::core::generation::{GenerationOrchestrator, GenerationSupervisor};
//! use phiscribe::domain::{GenerationRequest, JobSpec, PatientIdentifiers};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("phiscribe.toml")?;
//!
//! // Create shutdown signal
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let orchestrator = GenerationOrchestrator::from_config(
//!     &config,
//!     Arc::new(HttpTextGenerator::new(&config.generation)?),
//!     Arc::new(MemoryStore::new()),
//!     shutdown_rx,
//! )?;
//! let supervisor = GenerationSupervisor::new(
//!     Arc::new(orchestrator),
//!     rate_limit::from_config(&config.rate_limit),
//!     shutdown_tx,
//! );
//!
//! let handle = supervisor
//!     .submit(GenerationRequest::new(
//!         "Session transcript...",
//!         PatientIdentifiers::with_name("Jane Roe"),
//!         vec![JobSpec::new("plan", "Write the plan section")],
//!     ))
//!     .await?;
//! let result = handle.wait().await?;
//! result.log_summary();
//! # Ok(())
//! # }
//! ```

pub mod generation;
