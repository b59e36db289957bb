use crate::config::DigestConfig;
use crate::types::{CandidateArticle, FetchResult, RawFeedEntry};
use crate::utils::text;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Turns one source's raw entries into zero or more `CandidateArticle`s.
///
/// Per entry, in order: cap by feed position, dedup by link, resolve a
/// date, apply the recency window, clean and escape text, apply the
/// exclusion keywords. Anything that fails a step is dropped silently;
/// this stage never errors.
pub struct Normalizer {
    window: Duration,
    exclusions: Vec<String>,
    max_per_source: usize,
    summary_max_chars: usize,
}

impl Normalizer {
    pub fn new(config: &DigestConfig) -> Self {
        Self {
            window: Duration::hours(config.time_window_hours),
            exclusions: config
                .exclusion_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            max_per_source: config.max_per_source,
            summary_max_chars: config.summary_max_chars,
        }
    }

    pub fn normalize(&self, fetch: &FetchResult, now: DateTime<Utc>) -> Vec<CandidateArticle> {
        let mut seen_links: HashSet<String> = HashSet::new();
        let mut articles = Vec::new();

        // The cap applies to entries considered, in feed order, so a huge
        // feed bounds work here no matter how much of it gets filtered.
        for entry in fetch.entries.iter().take(self.max_per_source) {
            if let Some(article) = self.normalize_entry(entry, fetch, now, &mut seen_links) {
                articles.push(article);
            }
        }

        articles
    }

    fn normalize_entry(
        &self,
        entry: &RawFeedEntry,
        fetch: &FetchResult,
        now: DateTime<Utc>,
        seen_links: &mut HashSet<String>,
    ) -> Option<CandidateArticle> {
        let link = entry.link.as_deref()?.trim();
        if link.is_empty() {
            return None;
        }
        if !seen_links.insert(link.to_string()) {
            debug!("Skipping duplicate entry link: {}", link);
            return None;
        }

        // No resolvable date means no way to window the entry; drop it
        // rather than guess.
        let published_at = resolve_date(entry)?;
        if published_at < now - self.window || published_at > now {
            return None;
        }

        let title = text::clean(entry.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            return None;
        }
        let summary = text::clean(entry.summary.as_deref().unwrap_or_default());

        if self.is_excluded(&title, &summary) {
            debug!(
                "Dropping '{}' from {} (exclusion keyword match)",
                title, fetch.source.name
            );
            return None;
        }

        Some(CandidateArticle {
            title: text::escape(&title),
            link: link.to_string(),
            summary: text::escape(&text::truncate_chars(&summary, self.summary_max_chars)),
            source: fetch.source.name.clone(),
            tier: fetch.source.tier,
            published_at,
        })
    }

    fn is_excluded(&self, title: &str, summary: &str) -> bool {
        if self.exclusions.is_empty() {
            return false;
        }
        let haystack = format!("{} {}", title, summary).to_lowercase();
        self.exclusions.iter().any(|kw| haystack.contains(kw.as_str()))
    }
}

/// Resolve an entry timestamp: structured published, then structured
/// updated, then a date embedded in the link path.
pub fn resolve_date(entry: &RawFeedEntry) -> Option<DateTime<Utc>> {
    entry
        .published
        .or(entry.updated)
        .or_else(|| entry.link.as_deref().and_then(date_from_link))
}

static PATH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})(?:/|$)").unwrap());
static DASH_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());

/// Best-effort date recovery from URLs like `/2025/08/21/story` or
/// `...-2025-08-21...`. Resolves to midnight UTC so a same-day match can
/// never postdate "now".
pub fn date_from_link(link: &str) -> Option<DateTime<Utc>> {
    let caps = PATH_DATE_RE
        .captures(link)
        .or_else(|| DASH_DATE_RE.captures(link))?;

    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    if !(2000..=2100).contains(&year) {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
