// src/validate/mod.rs

use crate::catalog::ImportProfile;
use crate::coerce::{self, date};
use crate::mapping::MappingTable;
use crate::parse::RawRow;
use crate::resolve::{Resolution, ResolutionSet};
use crate::store::KnownEntity;
use std::collections::HashMap;

pub use crate::coerce::Value;

/// Entity reference carried by a processed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// Resolved to a real backend identifier.
    Existing(String),
    /// Placeholder for an entity the commit phase will create, keyed by
    /// the raw source name.
    Pending(String),
}

/// One source row after mapping, coercion, derivation, entity
/// resolution, and validation.
#[derive(Debug, Clone)]
pub struct ProcessedRow {
    /// Zero-based position in the input file's data rows.
    pub index: usize,
    /// storage key → coerced value, every catalog field present.
    pub values: HashMap<String, Value>,
    pub entity: Option<EntityRef>,
    /// Record identifier from a prior export; present means update.
    pub record_id: Option<String>,
    pub errors: Vec<String>,
    pub is_valid: bool,
}

fn effective_label(
    profile: ImportProfile,
    labels: &HashMap<String, String>,
    storage_key: &str,
) -> String {
    if let Some(renamed) = labels.get(storage_key) {
        return renamed.clone();
    }
    profile
        .field(storage_key)
        .map(|f| f.label.to_string())
        .unwrap_or_else(|| storage_key.to_string())
}

/// Derive all processed rows from the current snapshot of inputs. Pure:
/// callers re-invoke on every mapping/resolution/known-entity change, so
/// the result always reflects the latest state.
pub fn process_rows(
    profile: ImportProfile,
    labels: &HashMap<String, String>,
    mapping: &MappingTable,
    rows: &[RawRow],
    known: &[KnownEntity],
    resolutions: &ResolutionSet,
) -> Vec<ProcessedRow> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| process_row(profile, labels, mapping, index, row, known, resolutions))
        .collect()
}

fn raw_cell<'a>(mapping: &MappingTable, row: &'a RawRow, storage_key: &str) -> Option<&'a str> {
    mapping
        .header_for(storage_key)
        .and_then(|h| row.get(h))
        .map(String::as_str)
}

fn process_row(
    profile: ImportProfile,
    labels: &HashMap<String, String>,
    mapping: &MappingTable,
    index: usize,
    row: &RawRow,
    known: &[KnownEntity],
    resolutions: &ResolutionSet,
) -> ProcessedRow {
    let mut values = HashMap::with_capacity(profile.catalog().len());
    let mut errors = Vec::new();

    // Coercion: unmapped fields take the kind's empty value so that
    // downstream arithmetic never sees an absent value.
    for field in profile.catalog() {
        let value = match raw_cell(mapping, row, field.storage_key) {
            Some(raw) => coerce::coerce(field.kind, raw),
            None => coerce::empty_value(field.kind),
        };
        values.insert(field.storage_key.to_string(), value);
    }

    // Date derivation pass: the dependent field must be unmapped and the
    // source field must already carry a value. ISO form wins.
    if let Some(pair) = profile.date_pair() {
        let iso_mapped = mapping.header_for(pair.iso_key).is_some();
        let display_mapped = mapping.header_for(pair.display_key).is_some();

        if !display_mapped && iso_mapped {
            let iso = values[pair.iso_key].as_text().unwrap_or("").to_string();
            if let Some(display) = date::to_display(&iso) {
                values.insert(pair.display_key.to_string(), Value::Text(display));
            }
        } else if !iso_mapped && display_mapped {
            let display = values[pair.display_key].as_text().unwrap_or("").trim().to_string();
            if !display.is_empty() {
                values.insert(
                    pair.iso_key.to_string(),
                    Value::Text(date::coerce_date(&display)),
                );
            }
        }
    }

    // Required-field presence is judged on the raw mapped cell, so a
    // cell that coerces to zero still counts as present.
    for field in profile.catalog() {
        if !field.required {
            continue;
        }
        let present = raw_cell(mapping, row, field.storage_key)
            .map(|raw| !raw.trim().is_empty())
            .unwrap_or(false);
        if !present {
            errors.push(format!(
                "{} missing",
                effective_label(profile, labels, field.storage_key)
            ));
        }
    }

    // Entity reference: known entity, explicit decision, or an error.
    let entity_key = profile.entity_field();
    let entity_raw = raw_cell(mapping, row, entity_key)
        .map(str::trim)
        .unwrap_or("");
    let entity = if entity_raw.is_empty() {
        None
    } else if let Some(found) = known
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(entity_raw))
    {
        Some(EntityRef::Existing(found.id.clone()))
    } else {
        match resolutions.get(entity_raw) {
            Some(Resolution::Existing(id)) => Some(EntityRef::Existing(id.clone())),
            Some(Resolution::New(_)) => Some(EntityRef::Pending(entity_raw.to_string())),
            None => {
                errors.push(format!(
                    "{} '{}' not recognized",
                    effective_label(profile, labels, entity_key),
                    entity_raw
                ));
                None
            }
        }
    };

    let record_id = raw_cell(mapping, row, profile.record_id_field())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let is_valid = errors.is_empty();
    ProcessedRow {
        index,
        values,
        entity,
        record_id,
        errors,
        is_valid,
    }
}
