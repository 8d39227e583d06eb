// src/mapping/mod.rs

pub mod store;

use crate::catalog::{ImportProfile, TargetField};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// storage key → chosen source header. A key absent from the table is
/// unmapped. Session-local; a persisted copy survives across sessions
/// keyed by import profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable {
    entries: HashMap<String, String>,
}

impl MappingTable {
    pub fn header_for(&self, storage_key: &str) -> Option<&str> {
        self.entries.get(storage_key).map(String::as_str)
    }

    /// Manual override; always takes precedence over automatic
    /// resolution for the remainder of the session. `None` unmaps.
    pub fn set(&mut self, storage_key: &str, header: Option<&str>) {
        match header {
            Some(h) => {
                self.entries.insert(storage_key.to_string(), h.to_string());
            }
            None => {
                self.entries.remove(storage_key);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn match_header<'a>(field: &TargetField, headers: &'a [String]) -> Option<&'a String> {
    let find = |needle: &str| headers.iter().find(|h| h.eq_ignore_ascii_case(needle));
    find(field.label)
        .or_else(|| find(field.storage_key))
        .or_else(|| find(field.id))
        .or_else(|| field.aliases.iter().find_map(|a| find(a)))
}

/// Seed a session mapping for the current file's headers. Per field, in
/// catalog order: a persisted mapping naming a header present in the
/// file wins; else the first case-insensitive exact match against label,
/// storage key, id, then aliases; else unmapped.
pub fn resolve_mapping(
    profile: ImportProfile,
    headers: &[String],
    persisted: &MappingTable,
) -> MappingTable {
    let mut table = MappingTable::default();
    for field in profile.catalog() {
        if let Some(saved) = persisted.header_for(field.storage_key) {
            if headers.iter().any(|h| h == saved) {
                table.set(field.storage_key, Some(saved));
                continue;
            }
            debug!(
                field = field.storage_key,
                header = saved,
                "persisted mapping header not in file"
            );
        }
        if let Some(found) = match_header(field, headers) {
            table.set(field.storage_key, Some(found));
        }
    }
    table
}

/// The subset of required fields still unmapped. The session may not
/// advance past the mapping stage while this is non-empty.
pub fn missing_required(profile: ImportProfile, table: &MappingTable) -> Vec<&'static TargetField> {
    profile
        .catalog()
        .iter()
        .filter(|f| f.required && table.header_for(f.storage_key).is_none())
        .collect()
}
