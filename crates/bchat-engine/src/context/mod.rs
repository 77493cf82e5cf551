pub mod artifacts;
pub mod hierarchy;

use std::path::PathBuf;

use tracing::{debug, warn};

use bchat_core::Provider;
use bchat_store::{IndexEntry, SessionStore};

use hierarchy::HierarchyResolver;

/// Separator between merged context sources.
const SOURCE_SEPARATOR: &str = "\n\n";

/// Merges past-session excerpts, local provider artifacts and hierarchical
/// instruction documents into one context block.
pub struct ContextExtractor {
    sessions: SessionStore,
    project_root: PathBuf,
    provider_home: PathBuf,
    hierarchy: HierarchyResolver,
}

impl ContextExtractor {
    pub fn new(sessions: SessionStore, project_root: impl Into<PathBuf>) -> Self {
        let provider_home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(".claude");
        Self {
            sessions,
            project_root: project_root.into(),
            provider_home,
            hierarchy: HierarchyResolver::default(),
        }
    }

    /// Redirect artifact and hierarchy lookups. Used by tests.
    pub fn with_locations(
        mut self,
        provider_home: impl Into<PathBuf>,
        hierarchy: HierarchyResolver,
    ) -> Self {
        self.provider_home = provider_home.into();
        self.hierarchy = hierarchy;
        self
    }

    /// Excerpts from the session records behind the given index entries.
    /// Records that fail to load are skipped, never fatal.
    pub fn extract_chat_logs(&self, entries: &[IndexEntry]) -> String {
        let mut excerpts = Vec::new();
        for entry in entries {
            let record = match self.sessions.load(&entry.file_path) {
                Ok(record) => record,
                Err(e) => {
                    warn!(file = %entry.file_path, error = %e, "skipping unreadable session record");
                    continue;
                }
            };
            let mut excerpt = format!(
                "--- Context from session {} ({}) ---\nSummary: {}",
                record.id, record.timestamp, record.summary
            );
            let decisions = record.decisions();
            if !decisions.is_empty() {
                excerpt.push_str("\nDecisions: ");
                excerpt.push_str(&decisions.join(", "));
            }
            excerpts.push(excerpt);
        }
        excerpts.join("\n")
    }

    /// Local tool-state context. Only providers with a local installation
    /// footprint contribute anything.
    pub fn extract_artifacts(&self, provider: Provider) -> String {
        if !provider.supports_local_artifacts() {
            return String::new();
        }
        artifacts::artifact_context(&self.provider_home)
    }

    /// Hierarchical instruction documents for the project root.
    pub fn extract_hierarchy(&self) -> String {
        self.hierarchy.resolve(&self.project_root)
    }

    /// Merge all sources for a query. Empty sources are omitted so the result
    /// never contains separator runs; an entirely empty result means no
    /// injection should happen.
    pub fn build_context(&self, results: &[IndexEntry], provider: Provider) -> String {
        let sources = [
            self.extract_chat_logs(results),
            self.extract_artifacts(provider),
            self.extract_hierarchy(),
        ];
        let merged = sources
            .iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(SOURCE_SEPARATOR);
        let merged = merged.trim().to_string();
        debug!(bytes = merged.len(), "context assembled");
        merged
    }
}
