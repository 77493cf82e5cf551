use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::StoreError;

/// Named entity lists extracted from a session summary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub configurations: Vec<String>,
}

/// One searchable metadata record pointing at a full session record.
/// Entries are append-only and never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub ai_source: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Session record file name, unique per entry.
    pub file_path: String,
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub relevance_score: f64,
}

impl IndexEntry {
    /// Relevance assigned at creation time: informed by keyword count.
    pub fn base_relevance(keyword_count: usize) -> f64 {
        keyword_count as f64 * 0.1 + 1.0
    }
}

/// The on-disk chat index: a single JSON document holding an ordered list of
/// entries (insertion order = chronological).
///
/// Readers take a snapshot via `load` and accept staleness. Writers are
/// serialized through one mutex — the format has no merge semantics, so the
/// load-append-rewrite cycle must never interleave.
pub struct IndexStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full index. A missing or malformed file is treated as empty,
    /// never as an error.
    #[instrument(skip(self))]
    pub fn load(&self) -> Vec<IndexEntry> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed chat index, treating as empty");
                Vec::new()
            }
        }
    }

    /// Append one entry: load, push, rewrite whole. Serialized per process.
    #[instrument(skip(self, entry), fields(file_path = %entry.file_path))]
    pub fn append(&self, entry: IndexEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load();
        entries.push(entry);
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, json)?;
        debug!(total = entries.len(), "chat index updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_index() -> (PathBuf, IndexStore) {
        let dir = std::env::temp_dir().join(format!("bchat_index_test_{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chat_index.json");
        (dir, IndexStore::new(path))
    }

    fn entry(file_path: &str) -> IndexEntry {
        IndexEntry {
            date: "2025-03-14".into(),
            ai_source: "claude".into(),
            keywords: vec!["config".into(), "error".into()],
            file_path: file_path.into(),
            executive_summary: "Fixed config error".into(),
            entities: Entities::default(),
            relevance_score: IndexEntry::base_relevance(2),
        }
    }

    #[test]
    fn missing_index_loads_empty() {
        let (dir, store) = temp_index();
        assert!(store.load().is_empty());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_index_loads_empty() {
        let (dir, store) = temp_index();
        fs::write(store.path(), "not json {").unwrap();
        assert!(store.load().is_empty());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn append_preserves_order() {
        let (dir, store) = temp_index();
        store.append(entry("chat_log_a.json")).unwrap();
        store.append(entry("chat_log_b.json")).unwrap();
        store.append(entry("chat_log_c.json")).unwrap();

        let entries = store.load();
        let files: Vec<&str> = entries.iter().map(|e| e.file_path.as_str()).collect();
        assert_eq!(files, vec!["chat_log_a.json", "chat_log_b.json", "chat_log_c.json"]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn append_recovers_from_corrupt_file() {
        let (dir, store) = temp_index();
        fs::write(store.path(), "][").unwrap();
        store.append(entry("chat_log_a.json")).unwrap();
        assert_eq!(store.load().len(), 1);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn base_relevance_scales_with_keywords() {
        assert!((IndexEntry::base_relevance(0) - 1.0).abs() < f64::EPSILON);
        assert!((IndexEntry::base_relevance(5) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entry_with_missing_fields_deserializes() {
        let raw = r#"[{"date": "2025-01-01", "ai_source": "gemini", "file_path": "chat_log_x.json"}]"#;
        let entries: Vec<IndexEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].keywords.is_empty());
        assert_eq!(entries[0].relevance_score, 0.0);
    }
}
