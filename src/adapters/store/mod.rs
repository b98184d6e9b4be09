//! Record store collaborator
//!
//! - [`RecordStore`] - per-id CRUD over JSON records
//! - [`MemoryStore`] - in-process implementation

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{from_record, to_record, EntityType, Record, RecordStore};
