// src/commit/mod.rs

use crate::catalog::ImportProfile;
use crate::resolve::{Resolution, ResolutionSet};
use crate::store::RecordStore;
use crate::validate::{EntityRef, ProcessedRow};
use anyhow::Result;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Result of a commit: counts plus the entity name → identifier map
/// realized during Phase A. `aborted` carries the backend failure that
/// stopped the remaining batch, if any; rows committed before it stay
/// committed.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub committed: usize,
    pub skipped: usize,
    pub created_entities: HashMap<String, String>,
    pub aborted: Option<String>,
}

async fn create_or_fetch<S: RecordStore>(
    store: &S,
    entity_type: &str,
    name: &str,
) -> Result<String> {
    match store.create_entity(entity_type, name).await {
        Ok(id) => Ok(id),
        Err(create_err) => {
            // Creation conflict: someone beat us to it, reuse theirs.
            warn!(entity_type, name, "create failed, trying lookup by name");
            match store.find_entity_by_name(entity_type, name).await? {
                Some(id) => Ok(id),
                None => Err(create_err
                    .context(format!("{} '{}' could not be created or found", entity_type, name))),
            }
        }
    }
}

fn build_payload(
    profile: ImportProfile,
    row: &ProcessedRow,
    entity_ids: &HashMap<String, String>,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for field in profile.catalog() {
        if field.storage_key == profile.record_id_field() {
            continue;
        }
        let value = if field.storage_key == profile.entity_field() {
            match &row.entity {
                Some(EntityRef::Existing(id)) => serde_json::json!(id),
                Some(EntityRef::Pending(raw)) => {
                    serde_json::json!(entity_ids.get(raw).cloned().unwrap_or_else(|| raw.clone()))
                }
                None => serde_json::json!(""),
            }
        } else {
            row.values[field.storage_key].to_json()
        };
        map.insert(field.storage_key.to_string(), value);
    }
    serde_json::Value::Object(map)
}

/// Two-phase sequential commit of the valid rows.
///
/// Phase A materializes every "create new entity" decision, deduplicated
/// by raw name, falling back to a lookup when creation conflicts.
/// Phase B writes rows in input order, substituting placeholder entity
/// references with the identifiers from Phase A; rows carrying a record
/// id are updates, the rest are creates. The first backend failure
/// aborts the remaining loop (fail-fast); the outcome reports how many
/// rows made it in before the abort.
pub async fn commit_rows<S: RecordStore>(
    store: &S,
    profile: ImportProfile,
    rows: &[ProcessedRow],
    resolutions: &ResolutionSet,
) -> ImportOutcome {
    let mut outcome = ImportOutcome {
        skipped: rows.iter().filter(|r| !r.is_valid).count(),
        ..Default::default()
    };

    // Phase A: realize pending entities referenced by valid rows.
    let mut entity_ids: HashMap<String, String> = HashMap::new();
    for row in rows.iter().filter(|r| r.is_valid) {
        let raw = match &row.entity {
            Some(EntityRef::Pending(raw)) => raw,
            _ => continue,
        };
        if entity_ids.contains_key(raw) {
            continue;
        }
        let new_name = match resolutions.get(raw) {
            Some(Resolution::New(name)) => name.as_str(),
            Some(Resolution::Existing(id)) => {
                entity_ids.insert(raw.clone(), id.clone());
                continue;
            }
            None => raw.as_str(),
        };
        match create_or_fetch(store, profile.entity_type(), new_name).await {
            Ok(id) => {
                info!(name = raw.as_str(), id = id.as_str(), "entity realized");
                entity_ids.insert(raw.clone(), id);
            }
            Err(e) => {
                error!("entity creation aborted the import: {:#}", e);
                outcome.aborted = Some(format!("{:#}", e));
                return outcome;
            }
        }
    }
    outcome.created_entities = entity_ids.clone();

    // Phase B: write rows sequentially, in input order.
    let collection = profile.collection();
    for row in rows.iter().filter(|r| r.is_valid) {
        let payload = build_payload(profile, row, &entity_ids);
        let result = match &row.record_id {
            Some(id) => store.update_record(collection, id, &payload).await,
            None => store.create_record(collection, &payload).await.map(|_| ()),
        };
        match result {
            Ok(()) => outcome.committed += 1,
            Err(e) => {
                error!(
                    row = row.index,
                    committed = outcome.committed,
                    "commit aborted: {:#}",
                    e
                );
                outcome.aborted = Some(format!("{:#}", e));
                break;
            }
        }
    }

    info!(
        committed = outcome.committed,
        skipped = outcome.skipped,
        entities = outcome.created_entities.len(),
        "commit finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::resolve_mapping;
    use crate::parse::parse_delimited;
    use crate::resolve::unresolved_names;
    use crate::store::memory::MemoryStore;
    use crate::validate::process_rows;
    use std::collections::HashMap as StdHashMap;

    const PROFILE: ImportProfile = ImportProfile::PrintJobs;

    /// Run the in-memory pipeline up to processed rows.
    async fn pipeline(
        text: &str,
        store: &MemoryStore,
    ) -> (Vec<ProcessedRow>, ResolutionSet) {
        let parsed = parse_delimited(text).unwrap();
        let mapping = resolve_mapping(PROFILE, &parsed.headers, &Default::default());
        let known = store.list_entities(PROFILE.entity_type()).await.unwrap();
        let entity_header = mapping.header_for(PROFILE.entity_field()).map(String::from);
        let mut resolutions = ResolutionSet::default();
        resolutions.recompute(unresolved_names(
            &parsed.rows,
            entity_header.as_deref(),
            &known,
        ));
        let rows = process_rows(
            PROFILE,
            &StdHashMap::new(),
            &mapping,
            &parsed.rows,
            &known,
            &resolutions,
        );
        (rows, resolutions)
    }

    #[tokio::test]
    async fn three_row_scenario_commits_two_and_creates_one_entity() {
        let store = MemoryStore::new();
        store.seed_entity("machine", "Press1");

        let text = "Machine,OrderNr,Naam,Netto\n\
                    Press1,1001,Flyers,136.026\n\
                    Press1,,Posters,500\n\
                    Press9,1003,Brochures,24.022\n";
        let (rows, resolutions) = pipeline(text, &store).await;

        let valid = rows.iter().filter(|r| r.is_valid).count();
        let invalid = rows.iter().filter(|r| !r.is_valid).count();
        assert_eq!((valid, invalid), (2, 1));
        assert!(rows[1].errors.contains(&"Order number missing".to_string()));

        let outcome = commit_rows(&store, PROFILE, &rows, &resolutions).await;
        assert_eq!(outcome.committed, 2);
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.created_entities.len(), 1);
        assert!(outcome.created_entities.contains_key("Press9"));

        // Exactly one entity created, before any record write.
        let ops = store.ops();
        let create_entity_ops: Vec<_> = ops
            .iter()
            .filter(|op| op.starts_with("create_entity"))
            .collect();
        assert_eq!(create_entity_ops, vec!["create_entity machine Press9"]);
        let entity_pos = ops
            .iter()
            .position(|op| op.starts_with("create_entity"))
            .unwrap();
        let first_record_pos = ops
            .iter()
            .position(|op| op.starts_with("create_record"))
            .unwrap();
        assert!(entity_pos < first_record_pos);

        // Pending reference replaced with the realized identifier.
        let records = store.records("print_jobs");
        assert_eq!(records.len(), 2);
        let press9_id = &outcome.created_entities["Press9"];
        assert_eq!(records[1].1["machine"], serde_json::json!(press9_id));
    }

    #[tokio::test]
    async fn duplicate_new_names_create_one_entity() {
        let store = MemoryStore::new();
        let text = "Machine,OrderNr,Naam\n\
                    Press9,1001,Flyers\n\
                    Press9,1002,Posters\n";
        let (rows, resolutions) = pipeline(text, &store).await;

        let outcome = commit_rows(&store, PROFILE, &rows, &resolutions).await;
        assert_eq!(outcome.committed, 2);
        assert_eq!(store.entity_names("machine"), vec!["Press9"]);
    }

    #[tokio::test]
    async fn existing_decision_links_instead_of_creating() {
        let store = MemoryStore::new();
        let existing = store.seed_entity("machine", "Press One");

        let text = "Machine,OrderNr,Naam\nPress9,1001,Flyers\n";
        let (rows, mut resolutions) = pipeline(text, &store).await;
        resolutions.set("Press9", Resolution::Existing(existing.clone()));

        let outcome = commit_rows(&store, PROFILE, &rows, &resolutions).await;
        assert_eq!(outcome.committed, 1);
        assert!(store
            .ops()
            .iter()
            .all(|op| !op.starts_with("create_entity")));
        let records = store.records("print_jobs");
        assert_eq!(records[0].1["machine"], serde_json::json!(existing));
    }

    #[tokio::test]
    async fn rows_with_record_id_are_updates() {
        let store = MemoryStore::new();
        store.seed_entity("machine", "Press1");
        let prior = store
            .create_record("print_jobs", &serde_json::json!({"name": "old"}))
            .await
            .unwrap();

        let text = format!(
            "Machine,OrderNr,Naam,Id\nPress1,1001,Flyers,{}\n",
            prior
        );
        let (rows, resolutions) = pipeline(&text, &store).await;
        assert_eq!(rows[0].record_id, Some(prior.clone()));

        let outcome = commit_rows(&store, PROFILE, &rows, &resolutions).await;
        assert_eq!(outcome.committed, 1);
        assert!(store
            .ops()
            .iter()
            .any(|op| op == &format!("update_record print_jobs {}", prior)));
        assert_eq!(store.records("print_jobs").len(), 1);
    }

    #[tokio::test]
    async fn backend_failure_is_fail_fast_with_partial_results_kept() {
        let store = MemoryStore::new();
        store.seed_entity("machine", "Press1");
        let text = "Machine,OrderNr,Naam\n\
                    Press1,1001,Flyers\n\
                    Press1,1002,Posters\n\
                    Press1,1003,Brochures\n";
        let (rows, resolutions) = pipeline(text, &store).await;

        store.fail_on_record_write(2);
        let outcome = commit_rows(&store, PROFILE, &rows, &resolutions).await;
        assert_eq!(outcome.committed, 1);
        assert!(outcome.aborted.is_some());
        // The first row stays committed; the third was never attempted.
        assert_eq!(store.records("print_jobs").len(), 1);
    }

    #[tokio::test]
    async fn entity_create_conflict_falls_back_to_lookup() {
        let store = MemoryStore::new();
        // Known list is empty at mapping time but the entity appears
        // during commit, simulating another session creating it first.
        let text = "Machine,OrderNr,Naam\nPress9,1001,Flyers\n";
        let (rows, resolutions) = pipeline(text, &store).await;
        let stolen = store.seed_entity("machine", "Press9");

        let outcome = commit_rows(&store, PROFILE, &rows, &resolutions).await;
        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.created_entities["Press9"], stolen);
        assert_eq!(outcome.committed, 1);
    }
}
