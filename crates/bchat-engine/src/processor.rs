use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use bchat_core::ids::SessionId;
use bchat_core::summary::SessionSummary;
use bchat_core::Provider;
use bchat_llm::{ReliableClient, SummaryProvider};
use bchat_store::{Entities, IndexEntry, IndexStore, PathManager, SessionRecord, SessionStore};

use crate::context::ContextExtractor;
use crate::error::EngineError;
use crate::query::QueryAnalyzer;
use crate::search::{IndexSearcher, DEFAULT_SEARCH_LIMIT};

/// How far back a session counts as recent in the context summary.
const RECENT_WINDOW_DAYS: i64 = 7;

/// What a processed prompt produced.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub session_id: SessionId,
    pub context_injected: bool,
    pub summary: SessionSummary,
}

/// What a consolidation run touched.
#[derive(Debug, Default)]
pub struct ConsolidationReport {
    pub raw_files_processed: usize,
}

/// Rolled-up view of the whole index, refreshed during consolidation.
#[derive(Debug, Serialize)]
struct ContextSummary {
    last_updated: String,
    total_sessions: usize,
    recent_sessions_count: usize,
    top_keywords: Vec<String>,
    key_decisions: Vec<String>,
    summary: String,
}

/// Orchestrates the full pipeline: classify the prompt, gather context,
/// summarize through the resilient client, persist record and index entry.
pub struct ChatProcessor<P: SummaryProvider> {
    paths: PathManager,
    analyzer: QueryAnalyzer,
    index: Arc<IndexStore>,
    searcher: IndexSearcher,
    sessions: SessionStore,
    extractor: ContextExtractor,
    client: ReliableClient<P>,
}

impl<P: SummaryProvider> ChatProcessor<P> {
    pub fn new(paths: PathManager, client: ReliableClient<P>) -> Self {
        let index = Arc::new(IndexStore::new(paths.chat_index_path()));
        let sessions = SessionStore::new(paths.chats_dir());
        let extractor = ContextExtractor::new(
            SessionStore::new(paths.chats_dir()),
            paths.project_root().to_path_buf(),
        );
        Self {
            searcher: IndexSearcher::new(Arc::clone(&index)),
            paths,
            analyzer: QueryAnalyzer,
            index,
            sessions,
            extractor,
            client,
        }
    }

    /// Swap the context extractor. Used by tests to redirect artifact and
    /// hierarchy lookups away from the real home directory.
    pub fn with_extractor(mut self, extractor: ContextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn index(&self) -> &Arc<IndexStore> {
        &self.index
    }

    /// Process one user prompt end to end. Summarization never fails the
    /// call; a degraded summary is persisted like any other.
    #[instrument(skip(self, prompt), fields(provider = %provider))]
    pub async fn process_prompt(
        &self,
        prompt: &str,
        provider: Provider,
    ) -> Result<ProcessOutcome, EngineError> {
        let analysis = self.analyzer.analyze(prompt);
        let mut final_prompt = prompt.to_string();
        let mut context_injected = false;

        if analysis.is_contextual {
            info!("contextual query detected, searching history");
            let filter = analysis.provider_filter.map(|p| p.as_str().to_string());
            let results = self.searcher.search(
                &analysis.search_keywords,
                filter.as_deref(),
                DEFAULT_SEARCH_LIMIT,
            );
            let context = self
                .extractor
                .build_context(&results, analysis.provider_filter.unwrap_or(provider));

            if context.is_empty() {
                info!("no relevant context found");
            } else {
                info!(sessions = results.len(), "injecting context into prompt");
                final_prompt = format!(
                    "Based on the following context from our previous conversations:\n\n{context}\n\nPlease answer the user's question: \"{prompt}\""
                );
                context_injected = true;
            }
        }

        let summary = self
            .client
            .summarize(&summarization_prompt(&final_prompt))
            .await;
        let session_id = self.persist(prompt, &final_prompt, &summary, provider, Utc::now())?;

        Ok(ProcessOutcome {
            session_id,
            context_injected,
            summary,
        })
    }

    /// Summarize and index any `*_raw.log` files in the chats directory, then
    /// refresh the context summary. Degraded summaries are not persisted here
    /// so a flaky API run can be retried later.
    #[instrument(skip(self))]
    pub async fn consolidate(&self) -> Result<ConsolidationReport, EngineError> {
        let pattern = self.paths.chats_dir().join("*_raw.log");
        let pattern = pattern.to_string_lossy();
        let raw_files = glob::glob(&pattern)
            .map_err(|e| EngineError::Internal(format!("bad raw log pattern: {e}")))?;

        let mut report = ConsolidationReport::default();
        for raw_file in raw_files.flatten() {
            let name = raw_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = match std::fs::read_to_string(&raw_file) {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping unreadable raw log");
                    continue;
                }
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }

            let provider = if name.contains("gemini") {
                Provider::Gemini
            } else {
                Provider::Claude
            };
            let summary = self.client.summarize(&summarization_prompt(content)).await;
            if summary.is_degraded() {
                warn!(file = %name, "summarization failed, leaving raw log for a later run");
                continue;
            }

            self.persist(
                &format!("Consolidated chat history from {name}"),
                content,
                &summary,
                provider,
                Utc::now(),
            )?;
            report.raw_files_processed += 1;
            info!(file = %name, "raw log consolidated");
        }

        self.update_context_summary()?;
        Ok(report)
    }

    fn persist(
        &self,
        original_prompt: &str,
        final_prompt: &str,
        summary: &SessionSummary,
        provider: Provider,
        at: DateTime<Utc>,
    ) -> Result<SessionId, EngineError> {
        let id = SessionId::generate_at(provider, at);
        let record = SessionRecord::new(
            id.clone(),
            provider.as_str(),
            original_prompt,
            final_prompt,
            summary,
            at,
        );
        self.sessions.save(&record)?;

        self.index.append(IndexEntry {
            date: at.format("%Y-%m-%d").to_string(),
            ai_source: provider.as_str().to_string(),
            keywords: summary.key_topics.clone(),
            file_path: id.record_file_name(),
            executive_summary: summary.summary.clone(),
            entities: Entities {
                decisions: summary.decisions.clone(),
                errors: summary.errors.clone(),
                configurations: summary.configurations.clone(),
            },
            relevance_score: IndexEntry::base_relevance(summary.key_topics.len()),
        })?;

        info!(session_id = %id, "session persisted");
        Ok(id)
    }

    /// Rewrite `context_summary.json` from the current index. A missing index
    /// means nothing has been processed yet and the summary is left alone.
    fn update_context_summary(&self) -> Result<(), EngineError> {
        if !self.index.path().exists() {
            return Ok(());
        }
        let entries = self.index.load();

        let cutoff = (Utc::now() - Duration::days(RECENT_WINDOW_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let recent_count = entries.iter().filter(|e| e.date >= cutoff).count();

        let summary = ContextSummary {
            last_updated: Utc::now().to_rfc3339(),
            total_sessions: entries.len(),
            recent_sessions_count: recent_count,
            top_keywords: distinct(entries.iter().flat_map(|e| e.keywords.iter()), 20),
            key_decisions: distinct(
                entries.iter().flat_map(|e| e.entities.decisions.iter()),
                10,
            ),
            summary: format!(
                "Processed {} chat sessions with {} recent sessions in the last week",
                entries.len(),
                recent_count
            ),
        };

        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| EngineError::Internal(format!("context summary encode: {e}")))?;
        std::fs::write(self.paths.context_summary_path(), json)
            .map_err(|e| EngineError::Internal(format!("context summary write: {e}")))?;
        info!("context summary updated");
        Ok(())
    }
}

/// First-seen-order deduplication, capped.
fn distinct<'a>(items: impl Iterator<Item = &'a String>, cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if out.len() == cap {
            break;
        }
        if seen.insert(item.as_str()) {
            out.push(item.clone());
        }
    }
    out
}

/// The structured-summary prompt sent for every processed session.
pub fn summarization_prompt(content: &str) -> String {
    format!(
        r#"Analyze the following chat content. Your task is to generate a structured JSON summary.

**IMPORTANT**: Your response MUST be a single, valid JSON object and nothing else. Do not include any conversational text, greetings, or explanations before or after the JSON. The entire response should be only the JSON object, enclosed in triple backticks (```json ... ```).

Content:
{content}

Please provide a JSON response with the following structure:
{{
    "summary": "Brief executive summary of the session",
    "decisions": ["Key decisions made during the session"],
    "errors": ["Errors encountered and their solutions"],
    "configurations": ["Configuration changes or settings modified"],
    "key_topics": ["Main topics discussed"],
    "files_modified": ["Files that were created, modified, or deleted"],
    "commands_executed": ["Important commands or operations performed"]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use bchat_core::config::PathsConfig;
    use bchat_llm::{MockProvider, MockResponse, ResilienceConfig};

    use crate::context::hierarchy::HierarchyResolver;

    fn temp_root() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bchat-proc-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fenced_summary(summary: &str, topics: &[&str]) -> MockResponse {
        let topics = topics
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(", ");
        MockResponse::Text(format!(
            "```json\n{{\"summary\": \"{summary}\", \"key_topics\": [{topics}], \"decisions\": [\"d1\"]}}\n```"
        ))
    }

    fn processor(root: &PathBuf, responses: Vec<MockResponse>) -> ChatProcessor<MockProvider> {
        let paths = PathManager::new(root.clone(), PathsConfig::default());
        paths.ensure_directories().unwrap();
        let client = ReliableClient::new(MockProvider::new(responses), ResilienceConfig::default());

        let nowhere = std::env::temp_dir().join(format!("bchat-none-{}", uuid::Uuid::now_v7()));
        let extractor = ContextExtractor::new(
            SessionStore::new(paths.chats_dir()),
            root.join("isolated-project"),
        )
        .with_locations(
            nowhere.join("home"),
            HierarchyResolver::with_paths(nowhere.join("u.md"), nowhere.join("s.md")),
        );

        ChatProcessor::new(paths, client).with_extractor(extractor)
    }

    #[tokio::test]
    async fn standalone_prompt_persists_without_context() {
        let root = temp_root();
        let proc = processor(&root, vec![fenced_summary("wrote a parser", &["parser"])]);

        let outcome = proc
            .process_prompt("write a parser", Provider::Gemini)
            .await
            .unwrap();
        assert!(!outcome.context_injected);
        assert_eq!(outcome.summary.summary, "wrote a parser");

        let entries = proc.index().load();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ai_source, "gemini");
        assert!(root
            .join("chats")
            .join(outcome.session_id.record_file_name())
            .is_file());

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn contextual_prompt_injects_prior_session() {
        let root = temp_root();
        let proc = processor(
            &root,
            vec![
                fenced_summary("set up redis caching", &["redis", "caching"]),
                fenced_summary("explained caching choice", &["caching"]),
            ],
        );

        proc.process_prompt("set up redis caching", Provider::Gemini)
            .await
            .unwrap();
        let outcome = proc
            .process_prompt("recall what we did about caching", Provider::Gemini)
            .await
            .unwrap();
        assert!(outcome.context_injected);

        let entries = proc.index().load();
        let record = SessionStore::new(root.join("chats"))
            .load(&entries[1].file_path)
            .unwrap();
        assert!(record
            .final_prompt
            .starts_with("Based on the following context from our previous conversations:"));
        assert!(record.final_prompt.contains("set up redis caching"));
        assert!(record
            .final_prompt
            .ends_with("Please answer the user's question: \"recall what we did about caching\""));
        assert_eq!(record.original_prompt, "recall what we did about caching");

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn contextual_prompt_without_matches_stays_unchanged() {
        let root = temp_root();
        let proc = processor(&root, vec![fenced_summary("answered directly", &[])]);

        let outcome = proc
            .process_prompt("recall the kubernetes migration", Provider::Gemini)
            .await
            .unwrap();
        assert!(!outcome.context_injected);

        let entries = proc.index().load();
        let record = SessionStore::new(root.join("chats"))
            .load(&entries[0].file_path)
            .unwrap();
        assert_eq!(record.final_prompt, "recall the kubernetes migration");

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn degraded_summary_is_still_persisted() {
        let root = temp_root();
        let proc = processor(&root, vec![MockResponse::Text("not json at all".into())]);

        let outcome = proc
            .process_prompt("hello there", Provider::Claude)
            .await
            .unwrap();
        assert!(outcome.summary.is_degraded());

        let entries = proc.index().load();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].executive_summary, "Content processed but parsing failed");

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn consolidate_processes_raw_logs_by_provider() {
        let root = temp_root();
        let proc = processor(
            &root,
            vec![
                fenced_summary("gemini session", &["alpha"]),
                fenced_summary("claude session", &["beta"]),
            ],
        );
        fs::write(root.join("chats").join("gemini_raw.log"), "gemini talk").unwrap();
        fs::write(root.join("chats").join("other_raw.log"), "claude talk").unwrap();
        fs::write(root.join("chats").join("empty_raw.log"), "   ").unwrap();

        let report = proc.consolidate().await.unwrap();
        assert_eq!(report.raw_files_processed, 2);

        let entries = proc.index().load();
        assert_eq!(entries.len(), 2);
        let sources: Vec<&str> = entries.iter().map(|e| e.ai_source.as_str()).collect();
        assert!(sources.contains(&"gemini"));
        assert!(sources.contains(&"claude"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn consolidate_skips_degraded_summaries() {
        let root = temp_root();
        let proc = processor(&root, vec![MockResponse::Text("garbage".into())]);
        fs::write(root.join("chats").join("gemini_raw.log"), "gemini talk").unwrap();

        let report = proc.consolidate().await.unwrap();
        assert_eq!(report.raw_files_processed, 0);
        assert!(proc.index().load().is_empty());

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn consolidate_refreshes_context_summary() {
        let root = temp_root();
        let proc = processor(
            &root,
            vec![
                fenced_summary("first", &["alpha", "beta"]),
                fenced_summary("second", &["beta", "gamma"]),
            ],
        );
        proc.process_prompt("one", Provider::Claude).await.unwrap();
        proc.process_prompt("two", Provider::Gemini).await.unwrap();

        proc.consolidate().await.unwrap();

        let raw = fs::read_to_string(root.join("chats").join("context_summary.json")).unwrap();
        let summary: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(summary["total_sessions"], 2);
        assert_eq!(summary["recent_sessions_count"], 2);
        let keywords: Vec<&str> = summary["top_keywords"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(keywords, vec!["alpha", "beta", "gamma"]);
        assert_eq!(summary["key_decisions"].as_array().unwrap().len(), 1);

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn consolidate_without_index_writes_no_summary() {
        let root = temp_root();
        let proc = processor(&root, vec![]);

        proc.consolidate().await.unwrap();
        assert!(!root.join("chats").join("context_summary.json").exists());

        fs::remove_dir_all(&root).unwrap();
    }
}
