use serde::{Deserialize, Serialize};

/// Structured summary of one chat session, as returned by the summarization
/// call. Every field is defaulted so a partially filled response still
/// deserializes, and the degraded shape is identical — persistence never
/// needs a separate failure branch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub configurations: Vec<String>,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub commands_executed: Vec<String>,
    /// Set when the call degraded (exhausted retries, open breaker, or an
    /// unparsable response). Carries the last error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionSummary {
    /// Degraded payload: same shape, empty lists, explanatory summary.
    pub fn degraded(summary: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            summary: summary.into(),
            errors: vec![error.clone()],
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
