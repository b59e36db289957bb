use crate::types::{DigestError, Result};

/// HTTP fetch settings shared by every source fetch in a run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub concurrency: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Ridgeline-Digest/0.1".to_string(),
            timeout_seconds: 10,
            concurrency: 8,
            max_redirects: 5,
        }
    }
}

/// All tunable behavior for one run. Built once in `main` (or a test) and
/// passed into each component at construction; nothing reads it globally.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Articles older than this many hours (UTC) are excluded.
    pub time_window_hours: i64,
    /// Entries considered per source, taken in feed order before filtering.
    pub max_per_source: usize,
    /// Cap on the free-tier candidate list.
    pub free_cap: usize,
    /// Cap on the restricted-tier candidate list.
    pub restricted_cap: usize,
    /// Below this many free-tier articles the run warns but proceeds.
    pub free_minimum: usize,
    /// Below this many total articles the run aborts.
    pub article_floor: usize,
    /// Stored summaries are truncated to this many characters.
    pub summary_max_chars: usize,
    /// Case-insensitive substrings that drop an entry when matched against
    /// its title+summary. Empty disables the filter.
    pub exclusion_keywords: Vec<String>,
    /// Single recipient used when the subscriber directory is unavailable.
    pub fallback_recipient: Option<String>,
    pub fetch: FetchConfig,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            time_window_hours: 72,
            max_per_source: 20,
            free_cap: 40,
            restricted_cap: 20,
            free_minimum: 5,
            article_floor: 3,
            summary_max_chars: 500,
            exclusion_keywords: default_exclusions(),
            fallback_recipient: None,
            fetch: FetchConfig::default(),
        }
    }
}

impl DigestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.time_window_hours < 1 {
            return Err(DigestError::Config(
                "time window must be at least one hour".to_string(),
            ));
        }
        if self.max_per_source == 0 {
            return Err(DigestError::Config(
                "per-source cap must be at least 1".to_string(),
            ));
        }
        if self.free_cap == 0 || self.restricted_cap == 0 {
            return Err(DigestError::Config(
                "tier caps must be at least 1".to_string(),
            ));
        }
        if self.article_floor == 0 {
            return Err(DigestError::Config(
                "article floor must be at least 1".to_string(),
            ));
        }
        if self.summary_max_chars == 0 {
            return Err(DigestError::Config(
                "summary length cap must be at least 1".to_string(),
            ));
        }
        if self.fetch.concurrency == 0 {
            return Err(DigestError::Config(
                "fetch concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch.timeout_seconds == 0 {
            return Err(DigestError::Config(
                "fetch timeout must be at least one second".to_string(),
            ));
        }
        if let Some(addr) = &self.fallback_recipient {
            if addr.trim().is_empty() || !addr.contains('@') {
                return Err(DigestError::Config(format!(
                    "fallback recipient '{}' is not a usable address",
                    addr
                )));
            }
        }
        Ok(())
    }
}

/// Default topical exclusions: this digest skips sports coverage.
pub fn default_exclusions() -> Vec<String> {
    ["sports", "football", "basketball", "baseball", "scoreboard"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
