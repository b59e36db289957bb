use crate::digest::DigestRequest;
use crate::render::DigestEmail;
use crate::types::{DirectoryRow, FetchResult, Result, SourceDescriptor, Subscriber};
use async_trait::async_trait;

/// Trait for fetching one feed endpoint.
///
/// Implementations must never propagate a failure: any network, parse, or
/// timeout problem is converted into a `FetchResult` with `success: false`
/// so that sibling sources are unaffected.
#[async_trait]
pub trait FetchFeed: Send + Sync {
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult;
}

/// Trait for the external summarization service.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Turn a serialized candidate set into a digest document.
    async fn summarize(&self, request: &DigestRequest) -> Result<String>;
}

/// Trait for the external subscriber directory.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Fetch the raw directory rows. Errors here are recoverable: the
    /// resolver substitutes the configured fallback recipient.
    async fn fetch_rows(&self) -> Result<Vec<DirectoryRow>>;
}

/// Bulk delivery channel: one call submits the digest to the whole list.
#[async_trait]
pub trait PrimaryChannel: Send + Sync {
    fn describe(&self) -> &str;

    async fn send_bulk(&self, email: &DigestEmail, recipients: &[Subscriber]) -> Result<()>;
}

/// Per-recipient delivery channel used when the primary channel fails.
#[async_trait]
pub trait SecondaryChannel: Send + Sync {
    fn describe(&self) -> &str;

    async fn send_single(&self, email: &DigestEmail, recipient: &str) -> Result<()>;
}
