use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use bchat_core::ids::SessionId;
use bchat_core::summary::SessionSummary;

use crate::error::StoreError;

/// A titled list inside a session record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub processed_at: String,
    pub content_length: usize,
}

/// Full payload of one processed session. Owned exclusively by storage —
/// search never loads it, only the context extractor does, on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub timestamp: String,
    pub ai_source: String,
    pub original_prompt: String,
    pub final_prompt: String,
    /// SHA-256 of the final prompt. Advisory dedup signal, not enforced.
    pub content_hash: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub metadata: RecordMetadata,
}

impl SessionRecord {
    pub fn new(
        id: SessionId,
        ai_source: &str,
        original_prompt: &str,
        final_prompt: &str,
        summary: &SessionSummary,
        at: DateTime<Utc>,
    ) -> Self {
        let sections = vec![
            Section {
                title: "Key Achievements".into(),
                kind: "list".into(),
                items: summary.decisions.clone(),
            },
            Section {
                title: "Errors".into(),
                kind: "list".into(),
                items: summary.errors.clone(),
            },
            Section {
                title: "Configurations".into(),
                kind: "list".into(),
                items: summary.configurations.clone(),
            },
        ];

        Self {
            id,
            timestamp: at.to_rfc3339(),
            ai_source: ai_source.to_string(),
            original_prompt: original_prompt.to_string(),
            final_prompt: final_prompt.to_string(),
            content_hash: content_hash(final_prompt),
            keywords: summary.key_topics.clone(),
            summary: summary.summary.clone(),
            sections,
            metadata: RecordMetadata {
                processed_at: at.to_rfc3339(),
                content_length: final_prompt.len(),
            },
        }
    }

    /// Items of the first decisions-bearing section, for context excerpts.
    pub fn decisions(&self) -> &[String] {
        self.sections
            .first()
            .map(|s| s.items.as_slice())
            .unwrap_or(&[])
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Persists one JSON document per session under the chats directory.
pub struct SessionStore {
    chats_dir: PathBuf,
}

impl SessionStore {
    pub fn new(chats_dir: impl Into<PathBuf>) -> Self {
        Self {
            chats_dir: chats_dir.into(),
        }
    }

    pub fn chats_dir(&self) -> &Path {
        &self.chats_dir
    }

    /// Write the record to `chat_log_<id>.json`, returning the path.
    #[instrument(skip(self, record), fields(session_id = %record.id))]
    pub fn save(&self, record: &SessionRecord) -> Result<PathBuf, StoreError> {
        let path = self.chats_dir.join(record.id.record_file_name());
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load a record by its index `file_path`.
    pub fn load(&self, file_name: &str) -> Result<SessionRecord, StoreError> {
        let path = self.chats_dir.join(file_name);
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| StoreError::NotFound(path.display().to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
