// src/resolve/mod.rs

use crate::parse::RawRow;
use crate::store::KnownEntity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Operator decision for one distinct unresolved entity name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum Resolution {
    /// Link to an existing entity by identifier.
    Existing(String),
    /// Create a new entity with this name during commit.
    New(String),
}

/// Decisions for every distinct raw entity name found in the data but
/// absent from the known-entity list, keyed by raw name (case-sensitive).
/// Pure in-memory state; nothing is written until commit.
#[derive(Debug, Clone, Default)]
pub struct ResolutionSet {
    decisions: BTreeMap<String, Resolution>,
}

impl ResolutionSet {
    /// Rebuild against the current unresolved names. Names no longer
    /// unresolved are dropped, new names default to `New(raw_name)`,
    /// and surviving names keep their existing decision.
    pub fn recompute<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut next = BTreeMap::new();
        for name in names {
            let decision = self
                .decisions
                .remove(&name)
                .unwrap_or_else(|| Resolution::New(name.clone()));
            next.insert(name, decision);
        }
        debug!(unresolved = next.len(), "recomputed resolution set");
        self.decisions = next;
    }

    pub fn set(&mut self, raw_name: &str, resolution: Resolution) {
        self.decisions.insert(raw_name.to_string(), resolution);
    }

    pub fn get(&self, raw_name: &str) -> Option<&Resolution> {
        self.decisions.get(raw_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resolution)> {
        self.decisions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Distinct raw values of the entity column not found in the known-entity
/// list. Lookup is case-insensitive; identity of the returned names is
/// case-sensitive. Input order of first occurrence is preserved.
pub fn unresolved_names(
    rows: &[RawRow],
    entity_header: Option<&str>,
    known: &[KnownEntity],
) -> Vec<String> {
    let header = match entity_header {
        Some(h) => h,
        None => return Vec::new(),
    };
    let known_lower: HashSet<String> = known.iter().map(|e| e.name.to_lowercase()).collect();

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        let raw = match row.get(header) {
            Some(v) => v.trim(),
            None => continue,
        };
        if raw.is_empty() || known_lower.contains(&raw.to_lowercase()) {
            continue;
        }
        if seen.insert(raw.to_string()) {
            out.push(raw.to_string());
        }
    }
    out
}
