use async_trait::async_trait;
use chrono::{Duration, Utc};
use ridgeline::types::{
    DigestError, DirectoryRow, FetchResult, RawFeedEntry, Result, SourceDescriptor, SourceTier,
    Subscriber,
};
use ridgeline::{
    DigestConfig, DigestEmail, DigestPipeline, DigestRequest, FetchFeed, PrimaryChannel,
    SecondaryChannel, SubscriberDirectory, Summarizer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

struct StubFetcher {
    articles_per_source: usize,
}

#[async_trait]
impl FetchFeed for StubFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult {
        let now = Utc::now();
        let entries = (0..self.articles_per_source)
            .map(|i| RawFeedEntry {
                title: Some(format!("{} story {}", source.name, i)),
                link: Some(format!("https://{}.example/{}", source.name, i)),
                summary: Some("Something happened in the region.".to_string()),
                published: Some(now - Duration::hours(i as i64 + 1)),
                updated: None,
            })
            .collect();
        FetchResult::ok(source.clone(), entries)
    }
}

struct StubSummarizer {
    body: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Summarizer for StubSummarizer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn summarize(&self, _request: &DigestRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

struct StubDirectory;

#[async_trait]
impl SubscriberDirectory for StubDirectory {
    async fn fetch_rows(&self) -> Result<Vec<DirectoryRow>> {
        Ok(vec![
            DirectoryRow {
                email: "a@x.com".to_string(),
                status: Some("active".to_string()),
            },
            DirectoryRow {
                email: "b@x.com".to_string(),
                status: None,
            },
        ])
    }
}

struct StubSecondary {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SecondaryChannel for StubSecondary {
    fn describe(&self) -> &str {
        "stub-smtp"
    }

    async fn send_single(&self, _email: &DigestEmail, _recipient: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(DigestError::DeliveryFailed("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

struct FailingPrimary;

#[async_trait]
impl PrimaryChannel for FailingPrimary {
    fn describe(&self) -> &str {
        "stub-bulk"
    }

    async fn send_bulk(&self, _email: &DigestEmail, _recipients: &[Subscriber]) -> Result<()> {
        Err(DigestError::DeliveryFailed("quota exceeded".to_string()))
    }
}

fn test_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new("open-a", "https://open-a.example/feed/", SourceTier::Free),
        SourceDescriptor::new("open-b", "https://open-b.example/feed/", SourceTier::Free),
        SourceDescriptor::new("gated", "https://gated.example/feed/", SourceTier::Restricted),
    ]
}

fn test_config() -> DigestConfig {
    DigestConfig {
        exclusion_keywords: Vec::new(),
        fallback_recipient: Some("fallback@x.com".to_string()),
        ..DigestConfig::default()
    }
}

const GOOD_DIGEST: &str =
    "<h2>Regional News</h2><h3>Story one</h3><p>Text.</p><h3>Story two</h3><p>Text.</p>";

#[tokio::test]
async fn full_run_collects_summarizes_and_delivers() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let summarizer_calls = Arc::new(AtomicUsize::new(0));
    let send_calls = Arc::new(AtomicUsize::new(0));

    let pipeline = DigestPipeline::builder(test_config())
        .sources(test_sources())
        .fetcher(Box::new(StubFetcher {
            articles_per_source: 4,
        }))
        .summarizer(Box::new(StubSummarizer {
            body: GOOD_DIGEST.to_string(),
            calls: summarizer_calls.clone(),
        }))
        .directory(Box::new(StubDirectory))
        .secondary_channel(Box::new(StubSecondary {
            fail: false,
            calls: send_calls.clone(),
        }))
        .from_address("digest@ridgeline.test".to_string())
        .build()
        .unwrap();

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.free_articles, 8);
    assert_eq!(report.restricted_articles, 4);
    assert_eq!(report.story_count, 2);
    assert_eq!(report.recipients_resolved, 2);
    assert!(!report.recipients_from_fallback);
    assert_eq!(summarizer_calls.load(Ordering::SeqCst), 1);
    assert_eq!(send_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.delivered_secondary, 2);
    assert!(report.failed_recipients.is_empty());
    info!("Run {} delivered cleanly", report.run_id);
}

#[tokio::test]
async fn below_floor_run_aborts_before_summarizer_and_delivery() {
    let summarizer_calls = Arc::new(AtomicUsize::new(0));
    let send_calls = Arc::new(AtomicUsize::new(0));

    let pipeline = DigestPipeline::builder(DigestConfig {
        article_floor: 3,
        ..test_config()
    })
    .sources(vec![SourceDescriptor::new(
        "open-a",
        "https://open-a.example/feed/",
        SourceTier::Free,
    )])
    .fetcher(Box::new(StubFetcher {
        articles_per_source: 2,
    }))
    .summarizer(Box::new(StubSummarizer {
        body: GOOD_DIGEST.to_string(),
        calls: summarizer_calls.clone(),
    }))
    .directory(Box::new(StubDirectory))
    .secondary_channel(Box::new(StubSecondary {
        fail: false,
        calls: send_calls.clone(),
    }))
    .from_address("digest@ridgeline.test".to_string())
    .build()
    .unwrap();

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(
        err,
        DigestError::InsufficientArticles { count: 2, floor: 3 }
    ));
    assert_eq!(
        summarizer_calls.load(Ordering::SeqCst),
        0,
        "summarizer must not be called on an aborted run"
    );
    assert_eq!(
        send_calls.load(Ordering::SeqCst),
        0,
        "no delivery on an aborted run"
    );
}

#[tokio::test]
async fn storyless_summarizer_output_fails_the_run_before_delivery() {
    let send_calls = Arc::new(AtomicUsize::new(0));

    let pipeline = DigestPipeline::builder(test_config())
        .sources(test_sources())
        .fetcher(Box::new(StubFetcher {
            articles_per_source: 4,
        }))
        .summarizer(Box::new(StubSummarizer {
            body: "<p>I could not find any stories.</p>".to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .directory(Box::new(StubDirectory))
        .secondary_channel(Box::new(StubSecondary {
            fail: false,
            calls: send_calls.clone(),
        }))
        .from_address("digest@ridgeline.test".to_string())
        .build()
        .unwrap();

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, DigestError::DigestRejected(_)));
    assert_eq!(send_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn primary_failure_still_delivers_through_secondary() {
    let send_calls = Arc::new(AtomicUsize::new(0));

    let pipeline = DigestPipeline::builder(test_config())
        .sources(test_sources())
        .fetcher(Box::new(StubFetcher {
            articles_per_source: 4,
        }))
        .summarizer(Box::new(StubSummarizer {
            body: GOOD_DIGEST.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .directory(Box::new(StubDirectory))
        .primary_channel(Box::new(FailingPrimary))
        .secondary_channel(Box::new(StubSecondary {
            fail: false,
            calls: send_calls.clone(),
        }))
        .from_address("digest@ridgeline.test".to_string())
        .build()
        .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.delivered_primary, 0);
    assert_eq!(report.delivered_secondary, 2);
    assert_eq!(send_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn total_delivery_failure_fails_the_run() {
    let pipeline = DigestPipeline::builder(test_config())
        .sources(test_sources())
        .fetcher(Box::new(StubFetcher {
            articles_per_source: 4,
        }))
        .summarizer(Box::new(StubSummarizer {
            body: GOOD_DIGEST.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .directory(Box::new(StubDirectory))
        .secondary_channel(Box::new(StubSecondary {
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .from_address("digest@ridgeline.test".to_string())
        .build()
        .unwrap();

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, DigestError::DeliveryFailed(_)));
}

#[tokio::test]
async fn pipeline_without_a_directory_delivers_to_the_fallback_recipient() {
    let send_calls = Arc::new(AtomicUsize::new(0));

    let pipeline = DigestPipeline::builder(test_config())
        .sources(test_sources())
        .fetcher(Box::new(StubFetcher {
            articles_per_source: 4,
        }))
        .summarizer(Box::new(StubSummarizer {
            body: GOOD_DIGEST.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .secondary_channel(Box::new(StubSecondary {
            fail: false,
            calls: send_calls.clone(),
        }))
        .from_address("digest@ridgeline.test".to_string())
        .build()
        .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.recipients_resolved, 1);
    assert!(report.recipients_from_fallback);
    assert_eq!(send_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn builder_rejects_missing_parts_and_bad_config() {
    let missing = DigestPipeline::builder(test_config()).build();
    assert!(matches!(missing, Err(DigestError::Config(_))));

    let bad_config = DigestPipeline::builder(DigestConfig {
        free_cap: 0,
        ..DigestConfig::default()
    })
    .build();
    assert!(matches!(bad_config, Err(DigestError::Config(_))));
}
