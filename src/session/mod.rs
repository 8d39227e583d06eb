// src/session/mod.rs

use crate::catalog::ImportProfile;
use crate::commit::{commit_rows, ImportOutcome};
use crate::mapping::{self, store::PersistedProfile, MappingTable};
use crate::parse::ParsedFile;
use crate::resolve::{unresolved_names, Resolution, ResolutionSet};
use crate::store::{KnownEntity, RecordStore};
use crate::validate::{process_rows, ProcessedRow};
use anyhow::Result;
use std::collections::HashMap;
use tracing::info;

/// Valid/invalid row counts shown before any write occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    pub valid: usize,
    pub invalid: usize,
}

/// One import wizard instance: parsed file, session mapping (seeded from
/// the persisted copy), label overrides, known entities, and resolution
/// decisions. Raw and processed rows live only for the session.
///
/// Each stage reads an immutable snapshot of the previous stage's
/// output; processed rows are recomputed on read so they always reflect
/// the latest mapping/resolution state.
pub struct ImportSession {
    profile: ImportProfile,
    parsed: ParsedFile,
    mapping: MappingTable,
    labels: HashMap<String, String>,
    known: Vec<KnownEntity>,
    resolutions: ResolutionSet,
}

impl ImportSession {
    pub fn new(
        profile: ImportProfile,
        parsed: ParsedFile,
        persisted: &PersistedProfile,
        known: Vec<KnownEntity>,
    ) -> Self {
        let mapping = mapping::resolve_mapping(profile, &parsed.headers, &persisted.mapping);
        let mut session = Self {
            profile,
            parsed,
            mapping,
            labels: persisted.labels.clone(),
            known,
            resolutions: ResolutionSet::default(),
        };
        session.refresh_resolutions();
        session
    }

    pub fn profile(&self) -> ImportProfile {
        self.profile
    }

    pub fn headers(&self) -> &[String] {
        &self.parsed.headers
    }

    /// Header names that collided in the input file; worth surfacing to
    /// the operator since shadowed columns are inaccessible.
    pub fn duplicate_headers(&self) -> &[String] {
        &self.parsed.duplicate_headers
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    /// Manual mapping override. Remapping can change which column feeds
    /// the entity reference, so the unresolved set is recomputed.
    pub fn set_mapping(&mut self, storage_key: &str, header: Option<&str>) {
        self.mapping.set(storage_key, header);
        self.refresh_resolutions();
    }

    pub fn rename_label(&mut self, storage_key: &str, label: &str) {
        self.labels
            .insert(storage_key.to_string(), label.to_string());
    }

    /// Replace the known-entity list (e.g. after a refresh from the
    /// backend) and recompute the unresolved set against it.
    pub fn set_known_entities(&mut self, known: Vec<KnownEntity>) {
        self.known = known;
        self.refresh_resolutions();
    }

    pub fn set_resolution(&mut self, raw_name: &str, resolution: Resolution) {
        self.resolutions.set(raw_name, resolution);
    }

    pub fn resolutions(&self) -> &ResolutionSet {
        &self.resolutions
    }

    /// Labels of required fields still unmapped. Non-empty blocks every
    /// later stage.
    pub fn missing_required(&self) -> Vec<String> {
        mapping::missing_required(self.profile, &self.mapping)
            .into_iter()
            .map(|f| {
                self.labels
                    .get(f.storage_key)
                    .cloned()
                    .unwrap_or_else(|| f.label.to_string())
            })
            .collect()
    }

    fn refresh_resolutions(&mut self) {
        let entity_header = self
            .mapping
            .header_for(self.profile.entity_field())
            .map(String::from);
        self.resolutions.recompute(unresolved_names(
            &self.parsed.rows,
            entity_header.as_deref(),
            &self.known,
        ));
    }

    /// Derive the processed rows from the current snapshot.
    pub fn processed_rows(&self) -> Vec<ProcessedRow> {
        process_rows(
            self.profile,
            &self.labels,
            &self.mapping,
            &self.parsed.rows,
            &self.known,
            &self.resolutions,
        )
    }

    pub fn preview(&self) -> Preview {
        let rows = self.processed_rows();
        let valid = rows.iter().filter(|r| r.is_valid).count();
        Preview {
            valid,
            invalid: rows.len() - valid,
        }
    }

    /// Commit the current valid rows. Refuses to run while required
    /// fields are unmapped.
    pub async fn commit<S: RecordStore>(&self, store: &S) -> Result<ImportOutcome> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            anyhow::bail!("required fields unmapped: {}", missing.join(", "));
        }
        let rows = self.processed_rows();
        info!(
            profile = self.profile.key(),
            rows = rows.len(),
            "committing import"
        );
        Ok(commit_rows(store, self.profile, &rows, &self.resolutions).await)
    }

    /// Snapshot of mapping + labels for an explicit save.
    pub fn persisted_state(&self) -> PersistedProfile {
        PersistedProfile {
            mapping: self.mapping.clone(),
            labels: self.labels.clone(),
        }
    }
}
