use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Access tier of a source: openly readable or subscription-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTier {
    Free,
    Restricted,
}

/// A configured feed endpoint. Built once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub endpoint: String,
    pub tier: SourceTier,
}

impl SourceDescriptor {
    pub fn new(name: &str, endpoint: &str, tier: SourceTier) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            tier,
        }
    }
}

/// One item as it came out of a feed, before any normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Outcome of fetching a single source. Fetch failures are carried as data
/// so one broken feed can never abort the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub source: SourceDescriptor,
    pub success: bool,
    pub error: Option<String>,
    pub entries: Vec<RawFeedEntry>,
}

impl FetchResult {
    pub fn ok(source: SourceDescriptor, entries: Vec<RawFeedEntry>) -> Self {
        Self {
            source,
            success: true,
            error: None,
            entries,
        }
    }

    pub fn failed(source: SourceDescriptor, error: String) -> Self {
        Self {
            source,
            success: false,
            error: Some(error),
            entries: Vec::new(),
        }
    }
}

/// A normalized article ready for the digest. `title` and `summary` are
/// HTML-escaped exactly once; `published_at` is UTC and inside the recency
/// window at the moment of inclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateArticle {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    pub tier: SourceTier,
    pub published_at: DateTime<Utc>,
}

/// Bounded, sorted output of a collection pass over every configured source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResult {
    pub free_articles: Vec<CandidateArticle>,
    pub restricted_articles: Vec<CandidateArticle>,
    pub failed_sources: BTreeSet<String>,
}

impl CollectionResult {
    pub fn total(&self) -> usize {
        self.free_articles.len() + self.restricted_articles.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriberStatus {
    Active,
    Inactive,
    Unknown,
}

impl SubscriberStatus {
    /// Map a raw directory status field. Absent or unrecognized values are
    /// `Unknown`, which stays eligible for delivery.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            Some(ref s) if s == "active" => SubscriberStatus::Active,
            Some(ref s) if s == "inactive" => SubscriberStatus::Inactive,
            _ => SubscriberStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    pub status: SubscriberStatus,
}

impl Subscriber {
    pub fn is_eligible(&self) -> bool {
        matches!(
            self.status,
            SubscriberStatus::Active | SubscriberStatus::Unknown
        )
    }
}

/// One row as returned by the subscriber directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRow {
    pub email: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryChannel {
    Primary,
    Secondary,
}

/// Per-recipient delivery result, produced once per recipient per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub channel: DeliveryChannel,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(recipient: String, channel: DeliveryChannel) -> Self {
        Self {
            recipient,
            channel,
            succeeded: true,
            error: None,
        }
    }

    pub fn failed(recipient: String, channel: DeliveryChannel, error: String) -> Self {
        Self {
            recipient,
            channel,
            succeeded: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Digest rejected: {0}")]
    DigestRejected(String),

    #[error("Collected {count} articles, below the floor of {floor}")]
    InsufficientArticles { count: usize, floor: usize },

    #[error("No deliverable recipients: {0}")]
    NoRecipients(String),

    #[error("Delivery failed on both channels: {0}")]
    DeliveryFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Mail build error: {0}")]
    Mail(#[from] lettre::error::Error),

    #[error("Mail address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DigestError>;
