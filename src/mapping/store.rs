// src/mapping/store.rs

use super::MappingTable;
use crate::catalog::ImportProfile;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};
use tracing::{debug, error};

/// Persisted per-profile state: the last-used header mapping plus any
/// user-renamed field labels (storage key → label).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedProfile {
    #[serde(default)]
    pub mapping: MappingTable,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

const FILE_SUFFIX: &str = "_import.json";

/// Process-wide store of persisted mappings/labels, one JSON blob per
/// import profile in `dir`. Loaded at startup; written on explicit save.
/// A missing or corrupt blob degrades to an empty mapping, never an error.
pub struct MappingStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, PersistedProfile>>,
}

impl MappingStore {
    /// Scan `dir` for `<profile>_import.json` blobs, skipping any that
    /// fail to parse. Creates the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating mapping directory {:?}", dir))?;

        let mut initial = HashMap::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("reading mapping directory {:?}", dir))?
            .filter_map(Result::ok)
        {
            let path = entry.path();
            let fname = match path.file_name().and_then(|n| n.to_str()) {
                Some(f) => f,
                None => continue,
            };
            if !fname.ends_with(FILE_SUFFIX) {
                continue;
            }
            let key = fname.trim_end_matches(FILE_SUFFIX).to_string();
            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|s| serde_json::from_str(&s).map_err(anyhow::Error::from))
            {
                Ok(state) => {
                    initial.insert(key, state);
                }
                Err(e) => error!("skipping corrupt mapping blob {:?}: {}", path, e),
            }
        }
        debug!(profiles = initial.len(), "loaded persisted mappings");

        Ok(Self {
            dir,
            cache: RwLock::new(initial),
        })
    }

    /// Persisted state for `profile`; empty when nothing was saved or
    /// the blob was unreadable.
    pub fn load(&self, profile: ImportProfile) -> PersistedProfile {
        self.cache
            .read()
            .unwrap()
            .get(profile.key())
            .cloned()
            .unwrap_or_default()
    }

    /// Overwrite the persisted state for `profile`. Writes the whole
    /// blob to a temp file first and renames it into place, so a failed
    /// save never leaves a partial blob behind.
    pub fn save(&self, profile: ImportProfile, state: &PersistedProfile) -> Result<()> {
        let final_path = self.dir.join(format!("{}{}", profile.key(), FILE_SUFFIX));
        let tmp_path = self
            .dir
            .join(format!("{}{}.tmp", profile.key(), FILE_SUFFIX));

        let json = serde_json::to_string_pretty(state).context("serializing mapping blob")?;
        fs::write(&tmp_path, json)
            .with_context(|| format!("writing temporary mapping blob {:?}", tmp_path))?;
        fs::rename(&tmp_path, &final_path).with_context(|| {
            format!("renaming {:?} to {:?}", tmp_path, final_path)
        })?;

        self.cache
            .write()
            .unwrap()
            .insert(profile.key().to_string(), state.clone());
        debug!(profile = profile.key(), "saved mapping blob");
        Ok(())
    }
}
