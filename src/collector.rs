use crate::config::DigestConfig;
use crate::normalizer::Normalizer;
use crate::traits::FetchFeed;
use crate::types::{
    CandidateArticle, CollectionResult, DigestError, FetchResult, Result, SourceDescriptor,
    SourceTier,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Runs fetch+normalize across every configured source and merges the
/// results into one bounded, sorted `CollectionResult`.
///
/// The two tiers are collected as independent passes: a restricted-tier
/// outage can never affect free-tier output, and vice versa.
pub struct Collector {
    fetcher: Box<dyn FetchFeed>,
    normalizer: Normalizer,
    config: DigestConfig,
}

impl Collector {
    pub fn new(fetcher: Box<dyn FetchFeed>, config: DigestConfig) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(&config),
            config,
        }
    }

    pub async fn collect(
        &self,
        sources: &[SourceDescriptor],
        now: DateTime<Utc>,
    ) -> Result<CollectionResult> {
        let free: Vec<&SourceDescriptor> = sources
            .iter()
            .filter(|s| s.tier == SourceTier::Free)
            .collect();
        let restricted: Vec<&SourceDescriptor> = sources
            .iter()
            .filter(|s| s.tier == SourceTier::Restricted)
            .collect();

        info!(
            "Collecting from {} free and {} restricted sources",
            free.len(),
            restricted.len()
        );

        let (free_articles, mut failed_sources) =
            self.collect_tier(&free, now, self.config.free_cap).await;
        let (restricted_articles, failed_restricted) = self
            .collect_tier(&restricted, now, self.config.restricted_cap)
            .await;
        failed_sources.extend(failed_restricted);

        if free_articles.len() < self.config.free_minimum {
            warn!(
                "Free tier came up short: {} articles (wanted at least {}), proceeding anyway",
                free_articles.len(),
                self.config.free_minimum
            );
        }

        let total = free_articles.len() + restricted_articles.len();
        info!(
            "Collection finished: {} free, {} restricted, {} sources with nothing to offer",
            free_articles.len(),
            restricted_articles.len(),
            failed_sources.len()
        );

        if total < self.config.article_floor {
            return Err(DigestError::InsufficientArticles {
                count: total,
                floor: self.config.article_floor,
            });
        }

        Ok(CollectionResult {
            free_articles,
            restricted_articles,
            failed_sources,
        })
    }

    /// One tier pass: bounded-concurrency fetches in registry order, then a
    /// single-threaded merge, sort, and cap.
    async fn collect_tier(
        &self,
        sources: &[&SourceDescriptor],
        now: DateTime<Utc>,
        cap: usize,
    ) -> (Vec<CandidateArticle>, BTreeSet<String>) {
        // `buffered` (not `buffer_unordered`) keeps results in submission
        // order, which keeps the sort's tie-breaking deterministic.
        let results: Vec<FetchResult> = stream::iter(sources.iter().copied())
            .map(|source| {
                let fetcher = &self.fetcher;
                async move { fetcher.fetch(source).await }
            })
            .buffered(self.config.fetch.concurrency.max(1))
            .collect()
            .await;

        let mut articles = Vec::new();
        let mut failed = BTreeSet::new();

        for result in &results {
            let candidates = self.normalizer.normalize(result, now);
            if candidates.is_empty() {
                match &result.error {
                    Some(err) => debug!("Source {} failed: {}", result.source.name, err),
                    None => debug!(
                        "Source {} yielded no qualifying articles",
                        result.source.name
                    ),
                }
                failed.insert(result.source.name.clone());
                continue;
            }

            debug!(
                "Collected {} qualifying articles from {}",
                candidates.len(),
                result.source.name
            );
            articles.extend(candidates);
        }

        // Stable sort: equal timestamps keep discovery order.
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles.truncate(cap);

        (articles, failed)
    }
}
