use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use bchat_core::tools::{Tool, ToolContext, ToolError, ToolResult};
use bchat_store::IndexStore;

use crate::context::ContextExtractor;
use crate::search::{IndexSearcher, DEFAULT_SEARCH_LIMIT};

/// Largest result count a caller may request.
const MAX_SEARCH_LIMIT: i64 = 10;
/// Keywords shown in the empty-result hint.
const TOPIC_SAMPLE_SIZE: usize = 10;

/// Searches the conversation index and returns excerpts from the matching
/// session records. The index is reloaded on every call, so sessions written
/// by a concurrently running pipeline are visible.
pub struct SearchContextTool {
    index: Arc<IndexStore>,
    searcher: IndexSearcher,
    extractor: ContextExtractor,
}

impl SearchContextTool {
    pub fn new(index: Arc<IndexStore>, extractor: ContextExtractor) -> Self {
        Self {
            searcher: IndexSearcher::new(Arc::clone(&index)),
            index,
            extractor,
        }
    }

    /// Hint shown when a search matches nothing: a sample of indexed topics,
    /// or a pointer at first use when the index is empty.
    fn empty_result_hint(&self) -> String {
        let entries = self.index.load();
        let mut seen = HashSet::new();
        let mut topics = Vec::new();
        let mut total = 0usize;
        for keyword in entries.iter().flat_map(|e| e.keywords.iter()) {
            if seen.insert(keyword.as_str()) {
                total += 1;
                if topics.len() < TOPIC_SAMPLE_SIZE {
                    topics.push(keyword.clone());
                }
            }
        }

        if topics.is_empty() {
            "No indexed conversations available. Try running a chat first to generate context."
                .to_string()
        } else {
            let ellipsis = if total > TOPIC_SAMPLE_SIZE { "..." } else { "" };
            format!("Available topics: {}{ellipsis}", topics.join(", "))
        }
    }
}

#[async_trait]
impl Tool for SearchContextTool {
    fn name(&self) -> &str {
        "search_context"
    }

    fn description(&self) -> &str {
        "Search conversation history for relevant context"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search terms or keywords"
                },
                "provider": {
                    "type": "string",
                    "description": "Filter results to one provider",
                    "enum": ["claude", "gemini"]
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results",
                    "minimum": 1,
                    "maximum": MAX_SEARCH_LIMIT
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();

        if ctx.abort_signal.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if query.is_empty() {
            return Ok(ToolResult::error(
                "Error: Search query is required",
                start.elapsed(),
            ));
        }

        let provider = args.get("provider").and_then(|v| v.as_str());
        // Non-numeric limits fall back silently, numeric ones are clamped.
        let limit = args
            .get("limit")
            .and_then(|v| v.as_i64())
            .map(|v| v.clamp(1, MAX_SEARCH_LIMIT) as usize)
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        debug!(%query, ?provider, limit, "searching conversation index");
        let keywords: Vec<String> = query.split_whitespace().map(str::to_string).collect();
        let results = self.searcher.search(&keywords, provider, limit);

        if results.is_empty() {
            let hint = self.empty_result_hint();
            return Ok(ToolResult::text(
                format!("No relevant context found for: {query}\n{hint}"),
                start.elapsed(),
            ));
        }

        let context = self.extractor.extract_chat_logs(&results);
        Ok(ToolResult::text(
            format!("Found {} relevant conversations:\n\n{context}", results.len()),
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use bchat_core::ids::SessionId;
    use bchat_core::summary::SessionSummary;
    use bchat_core::Provider;
    use bchat_store::{Entities, IndexEntry, SessionRecord, SessionStore};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bchat-sct-{tag}-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn ctx() -> ToolContext {
        ToolContext::new(PathBuf::from("."))
    }

    struct Fixture {
        root: PathBuf,
        tool: SearchContextTool,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            fs::remove_dir_all(&self.root).ok();
        }
    }

    fn fixture(seed_session: bool) -> Fixture {
        let root = temp_dir("root");
        let chats = root.join("chats");
        fs::create_dir_all(&chats).unwrap();
        let index = Arc::new(IndexStore::new(chats.join("chat_index.json")));

        if seed_session {
            let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 30, 0).unwrap();
            let summary = SessionSummary {
                summary: "Migrated the database to postgres".into(),
                decisions: vec!["use postgres".into()],
                key_topics: vec!["postgres".into(), "migration".into()],
                ..SessionSummary::default()
            };
            let record = SessionRecord::new(
                SessionId::generate_at(Provider::Claude, at),
                "claude",
                "p",
                "p",
                &summary,
                at,
            );
            SessionStore::new(chats.clone()).save(&record).unwrap();
            index
                .append(IndexEntry {
                    date: "2026-02-01".into(),
                    ai_source: "claude".into(),
                    keywords: summary.key_topics.clone(),
                    file_path: record.id.record_file_name(),
                    executive_summary: summary.summary.clone(),
                    entities: Entities::default(),
                    relevance_score: 1.2,
                })
                .unwrap();
        }

        let nowhere = std::env::temp_dir().join(format!("bchat-none-{}", uuid::Uuid::now_v7()));
        let extractor = ContextExtractor::new(SessionStore::new(chats.clone()), nowhere.clone())
            .with_locations(
                nowhere.join("home"),
                crate::context::hierarchy::HierarchyResolver::with_paths(
                    nowhere.join("u.md"),
                    nowhere.join("s.md"),
                ),
            );

        let tool = SearchContextTool::new(Arc::clone(&index), extractor);
        Fixture { root, tool }
    }

    #[tokio::test]
    async fn empty_query_is_error_result() {
        let f = fixture(false);
        for args in [json!({}), json!({"query": "   "})] {
            let result = f.tool.execute(args, &ctx()).await.unwrap();
            assert!(result.is_error);
            assert_eq!(result.content, "Error: Search query is required");
        }
    }

    #[tokio::test]
    async fn cancelled_context_aborts_before_searching() {
        let f = fixture(true);
        let ctx = ctx();
        ctx.abort_signal.cancel();

        let err = f
            .tool
            .execute(json!({"query": "postgres"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }

    #[tokio::test]
    async fn match_returns_excerpts() {
        let f = fixture(true);
        let result = f
            .tool
            .execute(json!({"query": "postgres"}), &ctx())
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result.content.starts_with("Found 1 relevant conversations:"));
        assert!(result.content.contains("Migrated the database to postgres"));
        assert!(result.content.contains("Decisions: use postgres"));
    }

    #[tokio::test]
    async fn provider_filter_excludes_other_sources() {
        let f = fixture(true);
        let result = f
            .tool
            .execute(json!({"query": "postgres", "provider": "gemini"}), &ctx())
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result
            .content
            .starts_with("No relevant context found for: postgres"));
    }

    #[tokio::test]
    async fn no_match_lists_available_topics() {
        let f = fixture(true);
        let result = f
            .tool
            .execute(json!({"query": "kubernetes"}), &ctx())
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("Available topics: postgres, migration"));
    }

    #[tokio::test]
    async fn empty_index_hint_points_at_first_run() {
        let f = fixture(false);
        let result = f
            .tool
            .execute(json!({"query": "anything"}), &ctx())
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("No indexed conversations available"));
    }

    #[tokio::test]
    async fn limit_is_clamped_and_bad_limit_defaults() {
        let f = fixture(true);
        for limit in [json!(0), json!(99), json!("three"), json!(null)] {
            let result = f
                .tool
                .execute(json!({"query": "postgres", "limit": limit}), &ctx())
                .await
                .unwrap();
            assert!(!result.is_error);
            assert!(result.content.starts_with("Found 1"));
        }
    }
}
