use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use bchat_core::summary::SessionSummary;

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence regex is valid")
    })
}

/// Parse the raw dependency response into a summary.
///
/// The response must contain a single JSON object, optionally inside a code
/// fence. A parse failure degrades to the same payload shape with an
/// explanatory summary — downstream persistence has no failure branch.
pub fn parse_summary(raw: &str) -> SessionSummary {
    let candidate = extract_json(raw);
    match serde_json::from_str::<SessionSummary>(candidate) {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, raw_len = raw.len(), "failed to parse summarization response");
            SessionSummary::degraded(
                "Content processed but parsing failed",
                format!("failed to parse response as JSON: {e}"),
            )
        }
    }
}

fn extract_json(raw: &str) -> &str {
    match fence_regex().captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw.trim(),
    }
}
