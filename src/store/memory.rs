// src/store/memory.rs
//
// In-memory record store used by tests: records the order of backend
// calls and can inject a failure after N record writes.

use super::{KnownEntity, RecordStore};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    entities: HashMap<String, Vec<KnownEntity>>,
    records: HashMap<String, Vec<(String, serde_json::Value)>>,
    next_id: u64,
    ops: Vec<String>,
    record_writes: usize,
    fail_after_record_writes: Option<usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pre-existing entity, returning its id.
    pub fn seed_entity(&self, entity_type: &str, name: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("{}-{}", entity_type, inner.next_id);
        inner
            .entities
            .entry(entity_type.to_string())
            .or_default()
            .push(KnownEntity {
                id: id.clone(),
                name: name.to_string(),
            });
        id
    }

    /// Make the Nth record write (create or update, 1-based) fail.
    pub fn fail_on_record_write(&self, nth: usize) {
        self.inner.lock().unwrap().fail_after_record_writes = Some(nth);
    }

    /// Backend calls in issue order, e.g. `"create_entity machine Press9"`.
    pub fn ops(&self) -> Vec<String> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn records(&self, collection: &str) -> Vec<(String, serde_json::Value)> {
        self.inner
            .lock()
            .unwrap()
            .records
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn entity_names(&self, entity_type: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .entities
            .get(entity_type)
            .map(|v| v.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    async fn create_entity(&self, entity_type: &str, name: &str) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(format!("create_entity {} {}", entity_type, name));
        let exists = inner
            .entities
            .get(entity_type)
            .map(|v| v.iter().any(|e| e.name == name))
            .unwrap_or(false);
        if exists {
            anyhow::bail!("{} '{}' already exists", entity_type, name);
        }
        inner.next_id += 1;
        let id = format!("{}-{}", entity_type, inner.next_id);
        inner
            .entities
            .entry(entity_type.to_string())
            .or_default()
            .push(KnownEntity {
                id: id.clone(),
                name: name.to_string(),
            });
        Ok(id)
    }

    async fn find_entity_by_name(
        &self,
        entity_type: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .ops
            .push(format!("find_entity {} {}", entity_type, name));
        Ok(inner.entities.get(entity_type).and_then(|v| {
            v.iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
                .map(|e| e.id.clone())
        }))
    }

    async fn list_entities(&self, entity_type: &str) -> Result<Vec<KnownEntity>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entities
            .get(entity_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_record(
        &self,
        collection: &str,
        payload: &serde_json::Value,
    ) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.record_writes += 1;
        if let Some(nth) = inner.fail_after_record_writes {
            if inner.record_writes >= nth {
                anyhow::bail!("injected backend failure");
            }
        }
        inner.ops.push(format!("create_record {}", collection));
        inner.next_id += 1;
        let id = format!("rec-{}", inner.next_id);
        inner
            .records
            .entry(collection.to_string())
            .or_default()
            .push((id.clone(), payload.clone()));
        Ok(id)
    }

    async fn update_record(
        &self,
        collection: &str,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.record_writes += 1;
        if let Some(nth) = inner.fail_after_record_writes {
            if inner.record_writes >= nth {
                anyhow::bail!("injected backend failure");
            }
        }
        inner.ops.push(format!("update_record {} {}", collection, id));
        let records = inner.records.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|(rid, _)| rid == id) {
            Some(entry) => {
                entry.1 = payload.clone();
                Ok(())
            }
            None => anyhow::bail!("no record '{}' in {}", id, collection),
        }
    }
}
