use bchat_core::Provider;

/// Phrases whose presence marks a prompt as a reference to past
/// conversations rather than a standalone question.
const CONTEXTUAL_PHRASES: &[&str] = &[
    "remember",
    "recall",
    "what was",
    "what were",
    "what did",
    "what does",
    "find",
    "search for",
    "in our last conversation",
    "from last week",
];

/// Minimum word length (exclusive) for a token to count as a search keyword.
const MIN_KEYWORD_LEN: usize = 3;

/// Outcome of classifying a user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnalysis {
    /// Whether the prompt references earlier conversations.
    pub is_contextual: bool,
    /// Provider named in the prompt, used to narrow the index search.
    pub provider_filter: Option<Provider>,
    /// Tokens worth searching the index for. Empty for non-contextual prompts.
    pub search_keywords: Vec<String>,
}

impl QueryAnalysis {
    fn standalone() -> Self {
        Self {
            is_contextual: false,
            provider_filter: None,
            search_keywords: Vec::new(),
        }
    }
}

/// Classifies prompts as contextual or standalone and extracts search terms.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    pub fn analyze(&self, prompt: &str) -> QueryAnalysis {
        let lower = prompt.to_lowercase();
        let is_contextual = CONTEXTUAL_PHRASES.iter().any(|p| lower.contains(p));
        if !is_contextual {
            return QueryAnalysis::standalone();
        }

        // Length is judged on the raw token, before trailing punctuation is
        // stripped; keywords keep their original casing.
        let mut search_keywords: Vec<String> = prompt
            .split_whitespace()
            .filter(|w| w.chars().count() > MIN_KEYWORD_LEN)
            .map(|w| w.trim_end_matches(['.', ',', '!', '?']).to_string())
            .collect();

        let mut provider_filter = None;
        for provider in Provider::ALL {
            if lower.contains(provider.as_str()) {
                provider_filter = Some(*provider);
                search_keywords.retain(|kw| !kw.eq_ignore_ascii_case(provider.as_str()));
            }
        }

        QueryAnalysis {
            is_contextual: true,
            provider_filter,
            search_keywords,
        }
    }
}
