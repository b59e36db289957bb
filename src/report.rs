use crate::delivery::DeliveryReport;
use crate::subscribers::ResolverOutcome;
use crate::types::{CollectionResult, DeliveryChannel};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// End-of-run accounting. Everything needed to diagnose a partial-failure
/// run from the logs alone, without re-running it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub sources_attempted: usize,
    pub sources_failed: Vec<String>,
    pub free_articles: usize,
    pub restricted_articles: usize,
    pub story_count: usize,
    pub recipients_resolved: usize,
    pub recipients_from_fallback: bool,
    pub delivered_primary: usize,
    pub delivered_secondary: usize,
    pub failed_recipients: Vec<String>,
}

impl RunReport {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>, sources_attempted: usize) -> Self {
        Self {
            run_id,
            started_at,
            sources_attempted,
            sources_failed: Vec::new(),
            free_articles: 0,
            restricted_articles: 0,
            story_count: 0,
            recipients_resolved: 0,
            recipients_from_fallback: false,
            delivered_primary: 0,
            delivered_secondary: 0,
            failed_recipients: Vec::new(),
        }
    }

    pub fn record_collection(&mut self, collection: &CollectionResult) {
        self.sources_failed = collection.failed_sources.iter().cloned().collect();
        self.free_articles = collection.free_articles.len();
        self.restricted_articles = collection.restricted_articles.len();
    }

    pub fn record_recipients(&mut self, count: usize, outcome: ResolverOutcome) {
        self.recipients_resolved = count;
        self.recipients_from_fallback = outcome == ResolverOutcome::Fallback;
    }

    pub fn record_delivery(&mut self, delivery: &DeliveryReport) {
        for outcome in &delivery.outcomes {
            match (outcome.succeeded, outcome.channel) {
                (true, DeliveryChannel::Primary) => self.delivered_primary += 1,
                (true, DeliveryChannel::Secondary) => self.delivered_secondary += 1,
                (false, _) => self.failed_recipients.push(outcome.recipient.clone()),
            }
        }
    }

    /// Log the whole report. Called on every exit path that got past
    /// collection, including delivery failure, so the logs always tell
    /// the full story of the run.
    pub fn emit(&self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        info!("=== Run {} report ===", self.run_id);
        info!(
            "Sources: {} attempted, {} empty or failed",
            self.sources_attempted,
            self.sources_failed.len()
        );
        if !self.sources_failed.is_empty() {
            warn!("Failed sources: {}", self.sources_failed.join(", "));
        }
        info!(
            "Articles: {} free, {} restricted; digest stories: {}",
            self.free_articles, self.restricted_articles, self.story_count
        );
        info!(
            "Recipients: {} resolved{}",
            self.recipients_resolved,
            if self.recipients_from_fallback {
                " (fallback address, directory unavailable)"
            } else {
                ""
            }
        );
        info!(
            "Delivery: {} via primary, {} via secondary, {} failed",
            self.delivered_primary,
            self.delivered_secondary,
            self.failed_recipients.len()
        );
        if !self.failed_recipients.is_empty() {
            warn!("Undelivered recipients: {}", self.failed_recipients.join(", "));
        }
        info!("Run finished in {}s", elapsed.num_seconds());
    }
}
