use chrono::{Duration, TimeZone, Utc};
use ridgeline::normalizer::{date_from_link, resolve_date, Normalizer};
use ridgeline::types::{FetchResult, RawFeedEntry, SourceDescriptor, SourceTier};
use ridgeline::DigestConfig;
use tracing::info;

fn source() -> SourceDescriptor {
    SourceDescriptor::new("Test Outlet", "https://example.org/feed/", SourceTier::Free)
}

fn entry(title: &str, link: &str, hours_ago: i64) -> RawFeedEntry {
    RawFeedEntry {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        summary: Some(format!("{} summary", title)),
        published: Some(Utc::now() - Duration::hours(hours_ago)),
        updated: None,
    }
}

#[test]
fn time_window_drops_old_and_future_entries() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let normalizer = Normalizer::new(&DigestConfig::default());
    let now = Utc::now();

    let mut stale = entry("Old story", "https://example.org/old", 0);
    stale.published = Some(now - Duration::hours(100));
    let mut future = entry("Scheduled story", "https://example.org/future", 0);
    future.published = Some(now + Duration::hours(2));
    let fresh = entry("Fresh story", "https://example.org/fresh", 5);

    let fetch = FetchResult::ok(source(), vec![stale, future, fresh]);
    let articles = normalizer.normalize(&fetch, now);

    assert_eq!(articles.len(), 1, "only the in-window entry should survive");
    assert_eq!(articles[0].link, "https://example.org/fresh");
    info!("Window filter kept {} of 3 entries", articles.len());
}

#[test]
fn date_resolution_prefers_published_then_updated_then_link() {
    let published = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
    let updated = Utc.with_ymd_and_hms(2026, 8, 21, 12, 0, 0).unwrap();

    let both = RawFeedEntry {
        published: Some(published),
        updated: Some(updated),
        link: Some("https://example.org/2026/08/25/story".to_string()),
        ..Default::default()
    };
    assert_eq!(resolve_date(&both), Some(published));

    let updated_only = RawFeedEntry {
        updated: Some(updated),
        link: Some("https://example.org/2026/08/25/story".to_string()),
        ..Default::default()
    };
    assert_eq!(resolve_date(&updated_only), Some(updated));

    let link_only = RawFeedEntry {
        link: Some("https://example.org/2026/08/25/story".to_string()),
        ..Default::default()
    };
    let resolved = resolve_date(&link_only).expect("link date should resolve");
    assert_eq!(resolved, Utc.with_ymd_and_hms(2026, 8, 25, 0, 0, 0).unwrap());

    let dateless = RawFeedEntry {
        link: Some("https://example.org/story".to_string()),
        ..Default::default()
    };
    assert!(resolve_date(&dateless).is_none(), "no date means dropped");
}

#[test]
fn link_date_patterns() {
    assert!(date_from_link("https://x.org/2026/08/21/mine-cleanup").is_some());
    assert!(date_from_link("https://x.org/news/story-2026-08-21.html").is_some());
    assert!(date_from_link("https://x.org/1850/01/01/archive").is_none());
    assert!(date_from_link("https://x.org/article/12345").is_none());
}

#[test]
fn escaping_is_applied_exactly_once() {
    let normalizer = Normalizer::new(&DigestConfig {
        exclusion_keywords: Vec::new(),
        ..DigestConfig::default()
    });
    let now = Utc::now();

    let mut raw = entry(
        "Mine safety & <b>reform</b>",
        "https://example.org/mine",
        2,
    );
    raw.summary = Some("Budget cuts \"threaten\" <i>inspections</i> & audits".to_string());

    let fetch = FetchResult::ok(source(), vec![raw]);
    let first = normalizer.normalize(&fetch, now);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].title, "Mine safety &amp; reform");
    assert!(
        !first[0].summary.contains('<'),
        "markup must not survive normalization"
    );

    // Feed the normalized text back through: output must be unchanged.
    let again = RawFeedEntry {
        title: Some(first[0].title.clone()),
        link: Some(first[0].link.clone()),
        summary: Some(first[0].summary.clone()),
        published: Some(first[0].published_at),
        updated: None,
    };
    let fetch2 = FetchResult::ok(source(), vec![again]);
    let second = normalizer.normalize(&fetch2, now);
    assert_eq!(second[0].title, first[0].title, "re-normalizing must not double-escape");
    assert_eq!(second[0].summary, first[0].summary);
}

#[test]
fn renormalizing_a_truncated_summary_leaves_it_unchanged() {
    let normalizer = Normalizer::new(&DigestConfig {
        summary_max_chars: 50,
        exclusion_keywords: Vec::new(),
        ..DigestConfig::default()
    });
    let now = Utc::now();

    let mut raw = entry("Capped story", "https://example.org/capped", 2);
    raw.summary =
        Some("alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo".to_string());

    let fetch = FetchResult::ok(source(), vec![raw]);
    let first = normalizer.normalize(&fetch, now);
    assert_eq!(first.len(), 1);
    assert!(first[0].summary.ends_with("..."));
    assert!(first[0].summary.chars().count() <= 50);

    let again = RawFeedEntry {
        title: Some(first[0].title.clone()),
        link: Some(first[0].link.clone()),
        summary: Some(first[0].summary.clone()),
        published: Some(first[0].published_at),
        updated: None,
    };
    let second = normalizer.normalize(&FetchResult::ok(source(), vec![again]), now);
    assert_eq!(
        second[0].summary, first[0].summary,
        "re-normalizing must not re-truncate an already-capped summary"
    );
}

#[test]
fn exclusion_keyword_drops_entry_case_insensitively() {
    let normalizer = Normalizer::new(&DigestConfig::default());
    let now = Utc::now();

    let fetch = FetchResult::ok(
        source(),
        vec![
            entry("Sports Day at the county fair", "https://example.org/a", 1),
            entry("School levy passes", "https://example.org/b", 1),
        ],
    );
    let articles = normalizer.normalize(&fetch, now);

    assert_eq!(articles.len(), 1);
    assert!(articles[0].title.contains("levy"));
}

#[test]
fn empty_keyword_list_disables_exclusion() {
    let normalizer = Normalizer::new(&DigestConfig {
        exclusion_keywords: Vec::new(),
        ..DigestConfig::default()
    });
    let fetch = FetchResult::ok(
        source(),
        vec![entry("Sports Day at the county fair", "https://example.org/a", 1)],
    );
    assert_eq!(normalizer.normalize(&fetch, Utc::now()).len(), 1);
}

#[test]
fn per_source_cap_applies_before_filtering() {
    let config = DigestConfig {
        max_per_source: 5,
        exclusion_keywords: Vec::new(),
        ..DigestConfig::default()
    };
    let normalizer = Normalizer::new(&config);
    let now = Utc::now();

    // First five entries are all out of window, the fresh ones sit beyond
    // the cap: the cap counts considered entries, so nothing survives.
    let mut entries: Vec<RawFeedEntry> = (0..5)
        .map(|i| {
            let mut e = entry(&format!("Old {}", i), &format!("https://x.org/old{}", i), 0);
            e.published = Some(now - Duration::hours(200));
            e
        })
        .collect();
    for i in 0..3 {
        entries.push(entry(
            &format!("Fresh {}", i),
            &format!("https://x.org/fresh{}", i),
            1,
        ));
    }

    let fetch = FetchResult::ok(source(), entries);
    assert!(normalizer.normalize(&fetch, now).is_empty());
}

#[test]
fn duplicate_links_and_missing_fields_are_dropped() {
    let normalizer = Normalizer::new(&DigestConfig {
        exclusion_keywords: Vec::new(),
        ..DigestConfig::default()
    });
    let now = Utc::now();

    let first = entry("First take", "https://example.org/story", 3);
    let dup = entry("Second take", "https://example.org/story", 1);
    let untitled = RawFeedEntry {
        title: Some("  ".to_string()),
        ..entry("x", "https://example.org/untitled", 1)
    };
    let linkless = RawFeedEntry {
        link: None,
        ..entry("No link", "https://unused", 1)
    };

    let fetch = FetchResult::ok(source(), vec![first, dup, untitled, linkless]);
    let articles = normalizer.normalize(&fetch, now);

    assert_eq!(articles.len(), 1, "dup, untitled, and linkless entries drop");
    assert_eq!(articles[0].title, "First take");
}

#[test]
fn summary_is_truncated_to_configured_chars() {
    let config = DigestConfig {
        summary_max_chars: 50,
        exclusion_keywords: Vec::new(),
        ..DigestConfig::default()
    };
    let normalizer = Normalizer::new(&config);

    let mut e = entry("Long one", "https://example.org/long", 1);
    e.summary = Some("word ".repeat(60));
    let fetch = FetchResult::ok(source(), vec![e]);

    let articles = normalizer.normalize(&fetch, Utc::now());
    assert_eq!(articles.len(), 1);
    assert!(
        articles[0].summary.chars().count() <= 50,
        "summary must not exceed the configured cap, got {}",
        articles[0].summary.chars().count()
    );
    assert!(articles[0].summary.ends_with("..."));
}
