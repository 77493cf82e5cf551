use serde::{Deserialize, Serialize};

/// AI providers with first-class support.
///
/// The index stores `ai_source` as a free-form string, so unknown providers
/// flow through search and persistence untouched; this enum covers the ones
/// the classifier recognizes and the call orchestrator can reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    Gemini,
}

impl Provider {
    /// All recognized providers, in classifier scan order.
    pub const ALL: &'static [Provider] = &[Provider::Claude, Provider::Gemini];

    /// Whether this provider leaves local artifacts (shell snapshots, todo
    /// lists) that the context merger can mine.
    pub fn supports_local_artifacts(&self) -> bool {
        matches!(self, Self::Claude)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}
