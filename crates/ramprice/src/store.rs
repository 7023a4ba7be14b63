use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{Category, PriceRecord, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Storage document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A snapshot as persisted, keyed by category label.
///
/// Labels are kept as plain strings so documents carrying labels this crate
/// never produces still load and round-trip unchanged.
pub type StoredSnapshot = BTreeMap<String, Vec<PriceRecord>>;

/// The durable document: latest price per product plus every observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStore {
    #[serde(rename = "price_data", default)]
    pub current: StoredSnapshot,
    #[serde(rename = "price_history", default)]
    pub history: BTreeMap<String, StoredSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub key: String,
    /// An entry with the same key already existed and was overwritten.
    pub replaced_history: bool,
    pub inserted: usize,
    pub updated: usize,
}

impl MergeSummary {
    pub fn record_count(&self) -> usize {
        self.inserted + self.updated
    }
}

impl Display for MergeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {} new, {} updated",
            self.key,
            if self.replaced_history {
                "overwritten"
            } else {
                "added"
            },
            self.inserted,
            self.updated
        )
    }
}

impl PriceStore {
    /// Records `snapshot` under `key` and upserts every record into the
    /// current table.
    ///
    /// History only grows, except that an existing entry with the exact same
    /// key is replaced. Current records are matched by product name within
    /// their category: a match is replaced in place, anything else is
    /// appended.
    pub fn merge(&mut self, snapshot: Snapshot, key: &str) -> MergeSummary {
        let mut inserted = 0;
        let mut updated = 0;

        let snapshot: StoredSnapshot = snapshot
            .into_iter()
            .map(|(category, records)| (category.to_string(), records))
            .collect();

        for (label, records) in &snapshot {
            let current = self.current.entry(label.clone()).or_default();
            for record in records {
                match current.iter_mut().find(|r| r.product == record.product) {
                    Some(existing) => {
                        *existing = record.clone();
                        updated += 1;
                    }
                    None => {
                        current.push(record.clone());
                        inserted += 1;
                    }
                }
            }
        }

        let replaced_history = self.history.insert(key.to_string(), snapshot).is_some();
        if replaced_history {
            log::info!("History entry '{}' already existed and was overwritten", key);
        }

        MergeSummary {
            key: key.to_string(),
            replaced_history,
            inserted,
            updated,
        }
    }

    pub fn record_count(&self) -> usize {
        self.current.values().map(Vec::len).sum()
    }

    /// Current records of a category.
    pub fn current_for(&self, category: Category) -> &[PriceRecord] {
        self.current
            .get(&category.to_string())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A `PriceStore` persisted as a single pretty-printed JSON document.
///
/// Assumes a single writer: concurrent read-modify-write cycles race on the
/// final rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. A missing file yields an empty store.
    pub fn try_load(&self) -> Result<PriceStore, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No store at {}, starting empty", self.path.display());
                return Ok(PriceStore::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// Reads the document, substituting an empty store if it cannot be read.
    pub fn load(&self) -> PriceStore {
        self.try_load().unwrap_or_else(|e| {
            log::warn!(
                "Failed to load store {}, continuing with empty state: {}",
                self.path.display(),
                e
            );
            PriceStore::default()
        })
    }

    /// Overwrites the whole document. The JSON is written to a sibling
    /// temporary file first and renamed over the target.
    pub fn save(&self, store: &PriceStore) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(store)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json)
            .inspect_err(|e| log::error!("Failed to write {}: {e:?}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .inspect_err(|e| log::error!("Failed to replace {}: {e:?}", self.path.display()))?;
        Ok(())
    }

    /// Load, merge and save in one step.
    pub fn merge_snapshot(&self, snapshot: Snapshot, key: &str) -> Result<MergeSummary, StoreError> {
        let mut store = self.load();
        let summary = store.merge(snapshot, key);
        self.save(&store)?;

        log::info!(
            "Merged {} into {} ({} history entries, {} current records)",
            summary,
            self.path.display(),
            store.history.len(),
            store.record_count()
        );

        Ok(summary)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}
