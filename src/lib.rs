pub mod collector;
pub mod config;
pub mod delivery;
pub mod digest;
pub mod fetcher;
pub mod normalizer;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod report;
pub mod subscribers;
pub mod summarizer;
pub mod traits;
pub mod types;
pub mod utils;

pub use collector::Collector;
pub use config::{DigestConfig, FetchConfig};
pub use delivery::{
    BulkMailChannel, DeliveryDispatcher, DeliveryReport, DeliveryState, SmtpChannel,
};
pub use digest::{DigestBody, DigestRequest, DigestRequestBuilder};
pub use fetcher::Fetcher;
pub use normalizer::Normalizer;
pub use pipeline::{DigestPipeline, PipelineBuilder};
pub use render::{render_email, DigestEmail};
pub use report::RunReport;
pub use subscribers::{HttpDirectory, ResolverOutcome, SubscriberResolver};
pub use summarizer::AnthropicSummarizer;
pub use traits::{FetchFeed, PrimaryChannel, SecondaryChannel, SubscriberDirectory, Summarizer};
pub use types::*;
