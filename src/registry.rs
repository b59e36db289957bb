use crate::types::{DigestError, Result, SourceDescriptor, SourceTier};
use std::collections::HashSet;
use url::Url;

/// The curated Appalachian outlet registry.
///
/// Free tier: openly readable regional newsrooms and public broadcasters.
/// Restricted tier: subscription-gated dailies still worth surfacing, kept
/// separate so the digest can present them as paywalled reads.
pub fn default_sources() -> Vec<SourceDescriptor> {
    use SourceTier::{Free, Restricted};

    vec![
        // Free tier
        SourceDescriptor::new(
            "West Virginia Public Broadcasting",
            "https://wvpublic.org/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Mountain State Spotlight",
            "https://mountainstatespotlight.org/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "West Virginia Watch",
            "https://westvirginiawatch.com/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "WV MetroNews",
            "https://wvmetronews.com/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Kentucky Lantern",
            "https://kentuckylantern.com/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Tennessee Lookout",
            "https://tennesseelookout.com/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Cardinal News",
            "https://cardinalnews.org/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Daily Yonder",
            "https://dailyyonder.com/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "100 Days in Appalachia",
            "https://www.100daysinappalachia.com/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "The Allegheny Front",
            "https://www.alleghenyfront.org/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "The Appalachian Voice",
            "https://appvoices.org/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Blue Ridge Public Radio",
            "https://www.bpr.org/news.rss",
            Free,
        ),
        SourceDescriptor::new(
            "WOUB Public Media",
            "https://woub.org/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Smoky Mountain News",
            "https://smokymountainnews.com/news?format=feed",
            Free,
        ),
        SourceDescriptor::new(
            "Ohio Valley ReSource",
            "https://ohiovalleyresource.org/feed/",
            Free,
        ),
        SourceDescriptor::new(
            "Carolina Public Press",
            "https://carolinapublicpress.org/feed/",
            Free,
        ),
        // Restricted tier
        SourceDescriptor::new(
            "Charleston Gazette-Mail",
            "https://www.wvgazettemail.com/search/?f=rss&t=article&c=news&l=20",
            Restricted,
        ),
        SourceDescriptor::new(
            "Lexington Herald-Leader",
            "https://www.kentucky.com/news/state/kentucky/rss/",
            Restricted,
        ),
        SourceDescriptor::new(
            "Knoxville News Sentinel",
            "https://rssfeeds.knoxnews.com/knoxville/news",
            Restricted,
        ),
        SourceDescriptor::new(
            "The Roanoke Times",
            "https://roanoke.com/search/?f=rss&t=article&c=news&l=20",
            Restricted,
        ),
        SourceDescriptor::new(
            "Asheville Citizen-Times",
            "https://rssfeeds.citizen-times.com/asheville/news",
            Restricted,
        ),
        SourceDescriptor::new(
            "Pittsburgh Post-Gazette",
            "https://www.post-gazette.com/rss/local",
            Restricted,
        ),
        SourceDescriptor::new(
            "Johnson City Press",
            "https://www.johnsoncitypress.com/search/?f=rss&t=article&l=20",
            Restricted,
        ),
    ]
}

/// Reject a registry with duplicate names or unparsable endpoints before
/// any network work starts.
pub fn validate_sources(sources: &[SourceDescriptor]) -> Result<()> {
    if sources.is_empty() {
        return Err(DigestError::Config("source registry is empty".to_string()));
    }
    let mut seen = HashSet::new();
    for source in sources {
        if source.name.trim().is_empty() {
            return Err(DigestError::Config(format!(
                "source with endpoint '{}' has an empty name",
                source.endpoint
            )));
        }
        if !seen.insert(source.name.as_str()) {
            return Err(DigestError::Config(format!(
                "duplicate source name '{}'",
                source.name
            )));
        }
        let parsed = Url::parse(&source.endpoint)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DigestError::Config(format!(
                "source '{}' endpoint is not http(s): {}",
                source.name, source.endpoint
            )));
        }
    }
    Ok(())
}
