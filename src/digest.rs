use crate::types::{CandidateArticle, CollectionResult, DigestError, Result};
use crate::utils::text;
use tracing::{debug, info};
use url::Url;

/// Hard bound on summary length in the outbound request. The normalizer
/// caps stored summaries already; this re-truncation means the request
/// stays bounded even for articles that arrived un-capped.
const REQUEST_SUMMARY_CHARS: usize = 400;

/// Each story in a valid digest is announced by an `<h3>` heading; counting
/// them is how a returned digest proves it contains stories at all.
pub const STORY_MARKER: &str = "<h3";

/// Serialized candidate set, ready for the summarizer.
#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub prompt: String,
    pub article_count: usize,
}

/// A validated digest document returned by the summarizer.
#[derive(Debug, Clone)]
pub struct DigestBody {
    pub html: String,
    pub story_count: usize,
}

/// Builds the summarizer request from a `CollectionResult` and validates
/// what comes back.
#[derive(Debug, Default)]
pub struct DigestRequestBuilder;

impl DigestRequestBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Serialize the candidate set. Articles without a non-empty title and
    /// a parseable link are skipped; summaries are truncated here so the
    /// request size never depends on upstream behavior.
    pub fn build(&self, collection: &CollectionResult) -> Result<DigestRequest> {
        let (free_block, free_count) = render_articles(&collection.free_articles);
        let (restricted_block, restricted_count) =
            render_articles(&collection.restricted_articles);

        let article_count = free_count + restricted_count;
        if article_count == 0 {
            return Err(DigestError::DigestRejected(
                "no usable articles to build a request from".to_string(),
            ));
        }

        info!(
            "Built digest request with {} articles ({} free, {} restricted)",
            article_count, free_count, restricted_count
        );

        Ok(DigestRequest {
            prompt: compose_prompt(&free_block, &restricted_block),
            article_count,
        })
    }

    /// Accept or reject the summarizer's output. Empty bodies and bodies
    /// without a single story marker are rejected here, which keeps "the
    /// model returned junk" distinct from "the call itself failed".
    pub fn validate_digest(&self, raw: &str) -> Result<DigestBody> {
        let html = strip_code_fence(raw);
        if html.is_empty() {
            return Err(DigestError::DigestRejected(
                "summarizer returned an empty body".to_string(),
            ));
        }

        let story_count = html.matches(STORY_MARKER).count();
        if story_count == 0 {
            return Err(DigestError::DigestRejected(
                "digest contains no story sections".to_string(),
            ));
        }

        debug!("Validated digest with {} story sections", story_count);
        Ok(DigestBody {
            html: html.to_string(),
            story_count,
        })
    }
}

fn render_articles(articles: &[CandidateArticle]) -> (String, usize) {
    let mut blocks = Vec::new();

    for article in articles {
        if article.title.trim().is_empty() {
            debug!("Skipping untitled article from {}", article.source);
            continue;
        }
        if Url::parse(&article.link).is_err() {
            debug!(
                "Skipping article with unresolvable link '{}' from {}",
                article.link, article.source
            );
            continue;
        }

        blocks.push(format!(
            "Title: {}\nLink: {}\nSource: {}\nSummary: {}",
            article.title,
            article.link,
            article.source,
            text::truncate_chars(&article.summary, REQUEST_SUMMARY_CHARS)
        ));
    }

    let count = blocks.len();
    (blocks.join("\n\n"), count)
}

fn compose_prompt(free_block: &str, restricted_block: &str) -> String {
    let free_section = if free_block.is_empty() {
        "(none today)"
    } else {
        free_block
    };
    let restricted_section = if restricted_block.is_empty() {
        "(none today)"
    } else {
        restricted_block
    };

    format!(
        "Create a daily digest email from these Appalachian region news stories.\n\n\
         FREE-TO-READ STORIES:\n{free_section}\n\n\
         PAYWALLED STORIES:\n{restricted_section}\n\n\
         CRITICAL: You must respond with ONLY valid HTML code. Do NOT use Markdown syntax.\n\n\
         Use these HTML tags ONLY:\n\
         - <h2> for main section headings (like \"Regional Economy\", \"Local Politics\")\n\
         - <h3> for individual story titles\n\
         - <p> for all paragraph text\n\
         - <strong> for bold emphasis\n\
         - <br> for line breaks\n\n\
         Do NOT use: # symbols, ** for bold, --- for dividers, or any Markdown.\n\n\
         Create a well-formatted digest that:\n\
         1. Groups stories by topic using <h2>Topic Name</h2>\n\
         2. For each story: <h3>Story Title</h3> followed by <p>2-3 sentence summary</p>\n\
         3. Focuses on what matters to Appalachian communities, in a warm, local-paper tone\n\
         4. If any paywalled stories are listed, closes with an <h2>Worth a Subscription</h2> \
         section that summarizes them\n\n\
         Start directly with <h2> tags, no intro text."
    )
}

/// Models occasionally wrap the HTML in a Markdown code fence despite the
/// instructions; unwrap it before judging the body.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let body = trimmed.trim_start_matches('`');
    let body = body.strip_prefix("html").unwrap_or(body);
    let body = body.trim_start();
    body.strip_suffix("```").map(str::trim_end).unwrap_or(body)
}
