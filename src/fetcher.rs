use crate::config::FetchConfig;
use crate::traits::FetchFeed;
use crate::types::{FetchResult, RawFeedEntry, Result, SourceDescriptor};
use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches and parses one feed endpoint per call.
///
/// The shared client carries the per-source timeout, so a hanging remote
/// can only cost its own slot, never the whole run.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    async fn pull(&self, source: &SourceDescriptor) -> Result<Vec<RawFeedEntry>> {
        let response = self.client.get(&source.endpoint).send().await?;
        let response = response.error_for_status()?;
        let body = response.bytes().await?;

        debug!("Parsing feed from {} ({} bytes)", source.name, body.len());
        let feed = parser::parse(body.as_ref())?;

        Ok(feed.entries.into_iter().map(raw_entry).collect())
    }
}

#[async_trait]
impl FetchFeed for Fetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult {
        debug!("Fetching feed: {} ({})", source.name, source.endpoint);

        match self.pull(source).await {
            Ok(entries) => {
                debug!("Fetched {} entries from {}", entries.len(), source.name);
                FetchResult::ok(source.clone(), entries)
            }
            Err(e) => {
                warn!("Feed fetch failed for {}: {}", source.name, e);
                FetchResult::failed(source.clone(), e.to_string())
            }
        }
    }
}

fn raw_entry(entry: feed_rs::model::Entry) -> RawFeedEntry {
    RawFeedEntry {
        title: entry.title.map(|t| t.content),
        link: entry.links.first().map(|l| l.href.clone()),
        summary: entry.summary.map(|s| s.content),
        published: entry.published,
        updated: entry.updated,
    }
}
