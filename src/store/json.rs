// src/store/json.rs

use super::{KnownEntity, RecordStore};
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

/// Record store backed by a directory of JSON collection files:
/// `entities-<type>.json` and `records-<collection>.json`. Writes go to
/// a temp file first and are renamed into place. Single-writer; cross
/// process conflicts are not coordinated here.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("creating store directory {:?}", dir))?;
        Ok(Self { dir })
    }

    fn entity_path(&self, entity_type: &str) -> PathBuf {
        self.dir.join(format!("entities-{}.json", entity_type))
    }

    fn record_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("records-{}.json", collection))
    }

    fn load_vec<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {:?}", path))
    }

    fn write_vec<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(items).context("serializing collection")?;
        fs::write(&tmp, json).with_context(|| format!("writing {:?}", tmp))?;
        fs::rename(&tmp, path).with_context(|| format!("renaming {:?} to {:?}", tmp, path))?;
        Ok(())
    }

    /// Next `<prefix>-<n>` id, with `n` one past the highest suffix in
    /// use. Stable across deletes.
    fn next_id(prefix: &str, existing: impl Iterator<Item = String>) -> String {
        let max = existing
            .filter_map(|id| {
                id.rsplit_once('-')
                    .and_then(|(_, n)| n.parse::<u64>().ok())
            })
            .max()
            .unwrap_or(0);
        format!("{}-{}", prefix, max + 1)
    }
}

impl RecordStore for JsonFileStore {
    async fn create_entity(&self, entity_type: &str, name: &str) -> Result<String> {
        let path = self.entity_path(entity_type);
        let mut entities: Vec<KnownEntity> = Self::load_vec(&path)?;
        if entities.iter().any(|e| e.name == name) {
            anyhow::bail!("{} '{}' already exists", entity_type, name);
        }
        let id = Self::next_id(entity_type, entities.iter().map(|e| e.id.clone()));
        entities.push(KnownEntity {
            id: id.clone(),
            name: name.to_string(),
        });
        Self::write_vec(&path, &entities)?;
        debug!(entity_type, name, id, "created entity");
        Ok(id)
    }

    async fn find_entity_by_name(
        &self,
        entity_type: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let entities: Vec<KnownEntity> = Self::load_vec(&self.entity_path(entity_type))?;
        Ok(entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.id.clone()))
    }

    async fn list_entities(&self, entity_type: &str) -> Result<Vec<KnownEntity>> {
        Self::load_vec(&self.entity_path(entity_type))
    }

    async fn create_record(
        &self,
        collection: &str,
        payload: &serde_json::Value,
    ) -> Result<String> {
        let path = self.record_path(collection);
        let mut records: Vec<StoredRecord> = Self::load_vec(&path)?;
        let id = Self::next_id("rec", records.iter().map(|r| r.id.clone()));
        let fields = payload
            .as_object()
            .cloned()
            .context("record payload must be a JSON object")?;
        records.push(StoredRecord {
            id: id.clone(),
            fields,
        });
        Self::write_vec(&path, &records)?;
        debug!(collection, id, "created record");
        Ok(id)
    }

    async fn update_record(
        &self,
        collection: &str,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let path = self.record_path(collection);
        let mut records: Vec<StoredRecord> = Self::load_vec(&path)?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .with_context(|| format!("no record '{}' in {}", id, collection))?;
        record.fields = payload
            .as_object()
            .cloned()
            .context("record payload must be a JSON object")?;
        Self::write_vec(&path, &records)?;
        debug!(collection, id, "updated record");
        Ok(())
    }
}
