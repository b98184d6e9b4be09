//! In-process record store

use super::traits::{EntityType, Record, RecordStore};
use crate::domain::errors::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Record store kept in memory
///
/// Used by the CLI for single runs and by tests. Contents are lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(EntityType, String), Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records of one kind
    pub async fn count(&self, entity: EntityType) -> usize {
        self.records
            .read()
            .await
            .keys()
            .filter(|(e, _)| *e == entity)
            .count()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, entity: EntityType, id: &str) -> Result<Record, StoreError> {
        self.records
            .read()
            .await
            .get(&(entity, id.to_string()))
            .cloned()
            .ok_or_else(|| not_found(entity, id))
    }

    async fn update(&self, entity: EntityType, id: &str, fields: Record) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&(entity, id.to_string()))
            .ok_or_else(|| not_found(entity, id))?;

        for (key, value) in fields {
            if key != "id" {
                record.insert(key, value);
            }
        }
        Ok(())
    }

    async fn insert(&self, entity: EntityType, mut fields: Record) -> Result<Record, StoreError> {
        let id = match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            _ => {
                let id = Uuid::new_v4().to_string();
                fields.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let mut records = self.records.write().await;
        let key = (entity, id);
        if records.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{entity}/{} already exists", key.1)));
        }
        records.insert(key, fields.clone());
        Ok(fields)
    }
}

fn not_found(entity: EntityType, id: &str) -> StoreError {
    StoreError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}
