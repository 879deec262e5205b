/// Page state definitions for crawl and scrape outcomes
///
/// Every fetched URL ends in exactly one of these states.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of one fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    // ===== Terminal Success States =====
    /// Page was successfully fetched and stored
    Processed,

    // ===== Terminal Error States =====
    /// Page returned HTTP 404 or 410 (permanent failure)
    DeadLink,

    /// Page returned HTTP 429
    RateLimited,

    /// Page returned any other non-success status
    HttpError,

    /// Page could not be reached (connection refused, DNS failure, TLS error)
    Unreachable,

    /// Request or render exceeded its timeout
    TimedOut,

    /// Page fetch failed for other reasons (redirect loop, body read error, etc.)
    Failed,

    // ===== Special States =====
    /// Fetch was abandoned because the crawl was cancelled
    Cancelled,
}

impl PageState {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    /// Maps a non-success HTTP status code to its page state
    pub fn from_status(status: u16) -> Self {
        match status {
            404 | 410 => Self::DeadLink,
            429 => Self::RateLimited,
            _ => Self::HttpError,
        }
    }

    /// Converts the page state to its stored string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::DeadLink => "dead_link",
            Self::RateLimited => "rate_limited",
            Self::HttpError => "http_error",
            Self::Unreachable => "unreachable",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a page state from its stored string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(Self::Processed),
            "dead_link" => Some(Self::DeadLink),
            "rate_limited" => Some(Self::RateLimited),
            "http_error" => Some(Self::HttpError),
            "unreachable" => Some(Self::Unreachable),
            "timed_out" => Some(Self::TimedOut),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PageState; 8] = [
        PageState::Processed,
        PageState::DeadLink,
        PageState::RateLimited,
        PageState::HttpError,
        PageState::Unreachable,
        PageState::TimedOut,
        PageState::Failed,
        PageState::Cancelled,
    ];

    #[test]
    fn test_db_string_roundtrip() {
        for state in ALL {
            assert_eq!(PageState::from_db_string(state.to_db_string()), Some(state));
        }
        assert_eq!(PageState::from_db_string("invalid"), None);
    }

    #[test]
    fn test_only_processed_is_success() {
        assert!(PageState::Processed.is_success());
        assert_eq!(ALL.iter().filter(|s| s.is_error()).count(), 7);
    }

    #[test]
    fn test_from_status() {
        assert_eq!(PageState::from_status(404), PageState::DeadLink);
        assert_eq!(PageState::from_status(410), PageState::DeadLink);
        assert_eq!(PageState::from_status(429), PageState::RateLimited);
        assert_eq!(PageState::from_status(500), PageState::HttpError);
        assert_eq!(PageState::from_status(403), PageState::HttpError);
    }

    #[test]
    fn test_serde_matches_db_string() {
        let json = serde_json::to_string(&PageState::DeadLink).unwrap();
        assert_eq!(json, "\"dead_link\"");
        assert_eq!(format!("{}", PageState::TimedOut), "timed_out");
    }
}
