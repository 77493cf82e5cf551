use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

/// How many recent files of each artifact kind are considered.
const MAX_ARTIFACT_FILES: usize = 3;

/// Shell state recovered from a snapshot file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShellSnapshot {
    pub functions: BTreeSet<String>,
    pub aliases: Vec<String>,
    pub exports: Vec<String>,
}

fn function_regexes() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?m)^(\w+)\s*\(\)\s*\{").unwrap(),
            Regex::new(r"(?m)^function\s+(\w+)\s*\{").unwrap(),
            Regex::new(r"(?m)^(\w+)\s*\(\)\s*\n\{").unwrap(),
        ]
    })
}

fn alias_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^alias\s+(\w+)=").unwrap())
}

fn export_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^export\s+(\w+)=").unwrap())
}

/// Extract function, alias and export names from shell snapshot text.
/// Function declarations in any of the three common styles are unioned.
pub fn parse_shell_snapshot(content: &str) -> ShellSnapshot {
    let mut snapshot = ShellSnapshot::default();
    for pattern in function_regexes() {
        for captures in pattern.captures_iter(content) {
            snapshot.functions.insert(captures[1].to_string());
        }
    }
    for captures in alias_regex().captures_iter(content) {
        snapshot.aliases.push(captures[1].to_string());
    }
    for captures in export_regex().captures_iter(content) {
        snapshot.exports.push(captures[1].to_string());
    }
    snapshot
}

#[derive(Debug, Deserialize)]
pub struct TodoItem {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub priority: String,
}

/// Todo items grouped by workflow state.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TodoBuckets {
    pub completed: Vec<String>,
    pub in_progress: Vec<String>,
    pub pending: Vec<String>,
    pub high_priority: Vec<String>,
}

/// Parse one todo file (a JSON array of items). Returns `None` when the file
/// is not valid todo JSON.
pub fn parse_todos(raw: &str) -> Option<TodoBuckets> {
    let items: Vec<TodoItem> = serde_json::from_str(raw).ok()?;
    let mut buckets = TodoBuckets::default();
    for item in items {
        match item.status.as_str() {
            "completed" => buckets.completed.push(item.content.clone()),
            "in_progress" => buckets.in_progress.push(item.content.clone()),
            "pending" => buckets.pending.push(item.content.clone()),
            _ => {}
        }
        if item.priority == "high" {
            buckets.high_priority.push(item.content);
        }
    }
    Some(buckets)
}

/// Most recently modified plain files in a directory, newest first.
pub fn recent_files(dir: &Path, limit: usize) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<(std::time::SystemTime, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some((meta.modified().ok()?, entry.path()))
        })
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0));
    files.truncate(limit);
    files.into_iter().map(|(_, path)| path).collect()
}

/// Build the local-artifact context lines from a provider's home directory.
/// Sections with nothing to report are omitted entirely.
pub fn artifact_context(provider_home: &Path) -> String {
    let mut segments = Vec::new();

    let snapshots = recent_files(&provider_home.join("shell-snapshots"), MAX_ARTIFACT_FILES);
    if let Some(latest) = snapshots.first() {
        match std::fs::read_to_string(latest) {
            Ok(content) => {
                let snapshot = parse_shell_snapshot(&content);
                if !snapshot.functions.is_empty() {
                    let names: Vec<&str> =
                        snapshot.functions.iter().map(String::as_str).collect();
                    segments.push(format!("Functions defined: {}", names.join(", ")));
                }
            }
            Err(e) => {
                warn!(path = %latest.display(), error = %e, "unreadable shell snapshot")
            }
        }
    }

    let mut completed = Vec::new();
    for file in recent_files(&provider_home.join("todos"), MAX_ARTIFACT_FILES) {
        let raw = match std::fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "unreadable todo file");
                continue;
            }
        };
        match parse_todos(&raw) {
            Some(buckets) => completed.extend(buckets.completed),
            None => warn!(path = %file.display(), "malformed todo file, skipping"),
        }
    }
    if !completed.is_empty() {
        segments.push(format!("Recently completed tasks: {}", completed.join(", ")));
    }

    segments.join("\n")
}
