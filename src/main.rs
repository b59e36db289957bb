use anyhow::{bail, Context};
use clap::Parser;
use ridgeline::{
    AnthropicSummarizer, BulkMailChannel, DigestConfig, DigestPipeline, FetchConfig, Fetcher,
    HttpDirectory, SmtpChannel,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// ridgeline - daily Appalachian news digest
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Articles older than this many hours are excluded
    #[arg(long, env = "TIME_WINDOW_HOURS", default_value_t = 72)]
    time_window_hours: i64,

    /// Entries considered per source, in feed order
    #[arg(long, env = "MAX_PER_SOURCE", default_value_t = 20)]
    max_per_source: usize,

    /// Cap on the free-tier candidate list
    #[arg(long, env = "FREE_CAP", default_value_t = 40)]
    free_cap: usize,

    /// Cap on the restricted-tier candidate list
    #[arg(long, env = "RESTRICTED_CAP", default_value_t = 20)]
    restricted_cap: usize,

    /// Warn (but proceed) below this many free-tier articles
    #[arg(long, env = "FREE_MINIMUM", default_value_t = 5)]
    free_minimum: usize,

    /// Abort the run below this many total articles
    #[arg(long, env = "ARTICLE_FLOOR", default_value_t = 3)]
    article_floor: usize,

    /// Comma-separated exclusion keywords; empty disables the filter
    #[arg(long, env = "EXCLUDE", value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: String,

    /// Summarizer model override
    #[arg(long, env = "DIGEST_MODEL")]
    model: Option<String>,

    /// From address, also the SMTP username
    #[arg(long, env = "EMAIL_ADDRESS")]
    email_address: String,

    /// SMTP password for the from address
    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    email_password: String,

    /// Recipient used when the subscriber directory is unavailable
    #[arg(long, env = "RECIPIENT_EMAIL")]
    fallback_recipient: Option<String>,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    smtp_port: u16,

    /// Subscriber directory endpoint; unset means the fallback recipient
    /// is used every run
    #[arg(long, env = "DIRECTORY_URL")]
    directory_url: Option<String>,

    #[arg(long, env = "DIRECTORY_TOKEN", hide_env_values = true)]
    directory_token: Option<String>,

    /// Bulk mail API endpoint; unset means delivery starts at SMTP
    #[arg(long, env = "BULK_API_URL")]
    bulk_api_url: Option<String>,

    #[arg(long, env = "BULK_API_KEY", hide_env_values = true)]
    bulk_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    info!("Starting Ridgeline digest run");

    let config = DigestConfig {
        time_window_hours: args.time_window_hours,
        max_per_source: args.max_per_source,
        free_cap: args.free_cap,
        restricted_cap: args.restricted_cap,
        free_minimum: args.free_minimum,
        article_floor: args.article_floor,
        exclusion_keywords: args
            .exclude
            .unwrap_or_else(ridgeline::config::default_exclusions),
        fallback_recipient: args.fallback_recipient,
        ..DigestConfig::default()
    };

    let fetcher = Fetcher::new(&FetchConfig::default());

    let mut summarizer = AnthropicSummarizer::new(args.anthropic_api_key);
    if let Some(model) = args.model {
        summarizer = summarizer.with_model(model);
    }

    let secondary = SmtpChannel::new(
        &args.smtp_host,
        args.smtp_port,
        args.email_address.clone(),
        args.email_password,
        &args.email_address,
    )
    .context("building SMTP channel")?;

    let mut builder = DigestPipeline::builder(config)
        .fetcher(Box::new(fetcher))
        .summarizer(Box::new(summarizer))
        .secondary_channel(Box::new(secondary))
        .from_address(args.email_address);

    // No directory URL means every run goes to the fallback recipient;
    // the resolver handles that without treating it as an outage.
    if let Some(url) = args.directory_url {
        builder = builder.directory(Box::new(HttpDirectory::new(url, args.directory_token)));
    }

    if let (Some(url), Some(key)) = (args.bulk_api_url, args.bulk_api_key) {
        builder = builder.primary_channel(Box::new(BulkMailChannel::new(url, key)));
    }

    let pipeline = builder.build().context("assembling pipeline")?;

    match pipeline.run().await {
        Ok(report) => {
            info!(
                "Digest run {} delivered to {} recipients",
                report.run_id,
                report.delivered_primary + report.delivered_secondary
            );
            Ok(())
        }
        Err(e) => {
            error!("Digest run failed: {}", e);
            bail!("digest run failed: {}", e)
        }
    }
}
