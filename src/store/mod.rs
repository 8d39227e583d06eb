// src/store/mod.rs

pub mod json;
#[cfg(test)]
pub mod memory;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// An entity already present in the backend store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownEntity {
    pub id: String,
    pub name: String,
}

/// Outbound capability to the backend record store. Calls are
/// out-of-process and may suspend; the import executor issues them
/// strictly sequentially, so implementations need no internal ordering
/// guarantees beyond their own conflict handling.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Create a new entity of `entity_type`. Errors when an entity with
    /// this name already exists; callers fall back to
    /// [`find_entity_by_name`](RecordStore::find_entity_by_name).
    async fn create_entity(&self, entity_type: &str, name: &str) -> Result<String>;

    async fn find_entity_by_name(&self, entity_type: &str, name: &str)
        -> Result<Option<String>>;

    async fn list_entities(&self, entity_type: &str) -> Result<Vec<KnownEntity>>;

    async fn create_record(&self, collection: &str, payload: &serde_json::Value)
        -> Result<String>;

    async fn update_record(
        &self,
        collection: &str,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<()>;
}
