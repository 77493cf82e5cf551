use std::cmp::Ordering;
use std::sync::Arc;

use bchat_store::{IndexEntry, IndexStore};

/// How many sessions a search returns unless the caller asks otherwise.
pub const DEFAULT_SEARCH_LIMIT: usize = 3;

/// Per-keyword score for a hit in the executive summary.
const SUMMARY_HIT_SCORE: f64 = 2.0;
/// Per-keyword score for a hit in the stored keyword list.
const KEYWORD_HIT_SCORE: f64 = 1.0;

/// Scores index entries against search keywords and returns the best matches.
pub struct IndexSearcher {
    index: Arc<IndexStore>,
}

impl IndexSearcher {
    pub fn new(index: Arc<IndexStore>) -> Self {
        Self { index }
    }

    /// Searches the index, reloading it from disk so concurrent appends are
    /// visible. Entries with no keyword hits are excluded regardless of their
    /// stored relevance score.
    pub fn search(
        &self,
        keywords: &[String],
        provider_filter: Option<&str>,
        limit: usize,
    ) -> Vec<IndexEntry> {
        let entries = self.index.load();
        let mut scored: Vec<(f64, IndexEntry)> = Vec::with_capacity(entries.len());

        for entry in entries {
            if let Some(filter) = provider_filter {
                if !entry.ai_source.eq_ignore_ascii_case(filter) {
                    continue;
                }
            }

            let score = keyword_score(&entry, keywords);
            if score > 0.0 {
                scored.push((score + entry.relevance_score, entry));
            }
        }

        // Stable sort keeps index order among ties, so older entries that
        // appear first in the file stay ahead of equally-scored newer ones.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        scored.into_iter().map(|(_, entry)| entry).collect()
    }
}

fn keyword_score(entry: &IndexEntry, keywords: &[String]) -> f64 {
    let summary = entry.executive_summary.to_lowercase();
    let entry_keywords = entry.keywords.join(" ").to_lowercase();

    let mut score = 0.0;
    for keyword in keywords {
        let needle = keyword.to_lowercase();
        if summary.contains(&needle) {
            score += SUMMARY_HIT_SCORE;
        }
        if entry_keywords.contains(&needle) {
            score += KEYWORD_HIT_SCORE;
        }
    }
    score
}
