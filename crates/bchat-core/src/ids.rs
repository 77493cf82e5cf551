use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::Provider;

/// Session identifier: `<provider>_<YYYYMMDD_HHMMSS>`.
///
/// The timestamp component keeps ids sortable by creation time, and the
/// session record file name is derived directly from it.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate(provider: Provider) -> Self {
        Self::generate_at(provider, Utc::now())
    }

    /// Deterministic variant for tests and replay.
    pub fn generate_at(provider: Provider, at: DateTime<Utc>) -> Self {
        Self(format!("{}_{}", provider, at.format("%Y%m%d_%H%M%S")))
    }

    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the session record this id points at.
    pub fn record_file_name(&self) -> String {
        format!("chat_log_{}.json", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn id_has_provider_prefix() {
        let id = SessionId::generate(Provider::Gemini);
        assert!(id.as_str().starts_with("gemini_"), "got: {id}");
    }

    #[test]
    fn id_format_is_stable() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let id = SessionId::generate_at(Provider::Claude, at);
        assert_eq!(id.as_str(), "claude_20250314_092653");
    }

    #[test]
    fn record_file_name_wraps_id() {
        let id = SessionId::from_raw("claude_20250314_092653");
        assert_eq!(id.record_file_name(), "chat_log_claude_20250314_092653.json");
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        let id = SessionId::generate(Provider::Claude);
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_roundtrip() {
        let id = SessionId::generate(Provider::Gemini);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let a = SessionId::generate_at(Provider::Claude, early);
        let b = SessionId::generate_at(Provider::Claude, late);
        assert!(a.as_str() < b.as_str());
    }
}
