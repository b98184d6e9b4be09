//! External collaborators of PHIScribe.
//!
//! - [`textgen`] - text generation service (trait + OpenAI-compatible HTTP client)
//! - [`store`] - record store for job and batch state (trait + in-memory store)
//! - [`rate_limit`] - per-requester submission limiter
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the orchestrator
//! can be driven by fakes in tests:
//!
//! ```rust
//! use phiscribe::adapters::store::{EntityType, MemoryStore, Record, RecordStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let record = store.insert(EntityType::Batch, Record::new()).await?;
//! assert!(record.contains_key("id"));
//! # Ok(())
//! # }
//! ```

pub mod rate_limit;
pub mod store;
pub mod textgen;
