//! Record store abstraction
//!
//! The orchestrator persists job and batch state through this trait. Beyond
//! per-id CRUD nothing is assumed: authorization and tenant isolation belong
//! to the implementation, and the orchestrator trusts whatever record it is
//! handed back.

use crate::domain::errors::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kinds of records the orchestrator persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A [`GenerationBatch`](crate::domain::GenerationBatch)
    Batch,
    /// A [`GenerationJob`](crate::domain::GenerationJob)
    Job,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record: a JSON object carrying at least an `"id"` field
pub type Record = Map<String, Value>;

/// Record store trait
///
/// Implementations must be safe to call concurrently from every in-flight
/// job of a batch.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by id
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such record exists.
    async fn get(&self, entity: EntityType, id: &str) -> Result<Record, StoreError>;

    /// Merge `fields` into an existing record
    ///
    /// Top-level keys in `fields` overwrite the stored ones; the `"id"` field
    /// is never changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such record exists.
    async fn update(&self, entity: EntityType, id: &str, fields: Record) -> Result<(), StoreError>;

    /// Insert a new record and return it as stored
    ///
    /// If `fields` has no string `"id"`, the store assigns one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the id is already taken.
    async fn insert(&self, entity: EntityType, fields: Record) -> Result<Record, StoreError>;
}

/// Converts a serializable value into a [`Record`]
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the value does not serialize to a JSON object.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Backend(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(StoreError::Backend(format!("Failed to serialize record: {e}"))),
    }
}

/// Converts a [`Record`] back into a typed value
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the record does not match `T`.
pub fn from_record<T: for<'de> Deserialize<'de>>(record: Record) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| StoreError::Backend(format!("Failed to deserialize record: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
