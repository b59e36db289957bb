use crate::collector::Collector;
use crate::config::DigestConfig;
use crate::delivery::{DeliveryDispatcher, DeliveryState};
use crate::digest::DigestRequestBuilder;
use crate::registry;
use crate::render;
use crate::report::RunReport;
use crate::subscribers::SubscriberResolver;
use crate::traits::{
    FetchFeed, PrimaryChannel, SecondaryChannel, SubscriberDirectory, Summarizer,
};
use crate::types::{DigestError, Result, SourceDescriptor};
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

/// One full digest run, wired together from the seam traits.
///
/// Run order: collect (the article floor is enforced inside collection) →
/// resolve recipients → summarize → validate → render → dispatch → report.
/// Recipients are resolved before the summarizer call so a run with nobody
/// to mail aborts before paying for the model round trip.
pub struct DigestPipeline {
    sources: Vec<SourceDescriptor>,
    collector: Collector,
    builder: DigestRequestBuilder,
    summarizer: Box<dyn Summarizer>,
    resolver: SubscriberResolver,
    dispatcher: DeliveryDispatcher,
    from_address: String,
}

impl DigestPipeline {
    pub fn builder(config: DigestConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "Starting digest run {} across {} sources",
            run_id,
            self.sources.len()
        );

        let mut report = RunReport::new(run_id, started_at, self.sources.len());

        let collection = self.collector.collect(&self.sources, started_at).await?;
        report.record_collection(&collection);

        let (recipients, resolver_outcome) = self.resolver.resolve().await?;
        report.record_recipients(recipients.len(), resolver_outcome);

        let request = self.builder.build(&collection)?;
        let raw_digest = self.summarizer.summarize(&request).await?;
        let digest = self.builder.validate_digest(&raw_digest)?;
        report.story_count = digest.story_count;
        info!(
            "Summarizer ({}) produced a digest with {} stories",
            self.summarizer.name(),
            digest.story_count
        );

        let email = render::render_email(&digest, self.from_address.clone(), started_at);
        let delivery = self.dispatcher.dispatch(&email, &recipients).await?;
        report.record_delivery(&delivery);

        // The report goes out before the failure verdict so a total
        // delivery loss is still fully diagnosable from the logs.
        report.emit();

        if delivery.state == DeliveryState::Failed {
            error!("Run {}: no recipient received the digest", run_id);
            return Err(DigestError::DeliveryFailed(format!(
                "all {} recipients failed on both channels",
                recipients.len()
            )));
        }

        Ok(report)
    }
}

/// Assembles a `DigestPipeline` from its parts. Sources default to the
/// curated registry; the primary channel and the subscriber directory are
/// optional (delivery starts at the secondary, and recipients resolve to
/// the fallback address, respectively).
pub struct PipelineBuilder {
    config: DigestConfig,
    sources: Option<Vec<SourceDescriptor>>,
    fetcher: Option<Box<dyn FetchFeed>>,
    summarizer: Option<Box<dyn Summarizer>>,
    directory: Option<Box<dyn SubscriberDirectory>>,
    primary: Option<Box<dyn PrimaryChannel>>,
    secondary: Option<Box<dyn SecondaryChannel>>,
    from_address: Option<String>,
}

impl PipelineBuilder {
    pub fn new(config: DigestConfig) -> Self {
        Self {
            config,
            sources: None,
            fetcher: None,
            summarizer: None,
            directory: None,
            primary: None,
            secondary: None,
            from_address: None,
        }
    }

    pub fn sources(mut self, sources: Vec<SourceDescriptor>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn fetcher(mut self, fetcher: Box<dyn FetchFeed>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn directory(mut self, directory: Box<dyn SubscriberDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn primary_channel(mut self, channel: Box<dyn PrimaryChannel>) -> Self {
        self.primary = Some(channel);
        self
    }

    pub fn secondary_channel(mut self, channel: Box<dyn SecondaryChannel>) -> Self {
        self.secondary = Some(channel);
        self
    }

    pub fn from_address(mut self, address: String) -> Self {
        self.from_address = Some(address);
        self
    }

    pub fn build(self) -> Result<DigestPipeline> {
        self.config.validate()?;

        let sources = self.sources.unwrap_or_else(registry::default_sources);
        registry::validate_sources(&sources)?;

        let fetcher = self
            .fetcher
            .ok_or_else(|| DigestError::Config("pipeline needs a fetcher".to_string()))?;
        let summarizer = self
            .summarizer
            .ok_or_else(|| DigestError::Config("pipeline needs a summarizer".to_string()))?;
        let secondary = self
            .secondary
            .ok_or_else(|| DigestError::Config("pipeline needs a secondary channel".to_string()))?;
        let from_address = self
            .from_address
            .ok_or_else(|| DigestError::Config("pipeline needs a from address".to_string()))?;

        let resolver =
            SubscriberResolver::new(self.directory, self.config.fallback_recipient.clone());

        Ok(DigestPipeline {
            collector: Collector::new(fetcher, self.config),
            builder: DigestRequestBuilder::new(),
            summarizer,
            resolver,
            dispatcher: DeliveryDispatcher::new(self.primary, secondary),
            from_address,
            sources,
        })
    }
}
