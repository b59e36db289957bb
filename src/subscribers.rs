use crate::traits::SubscriberDirectory;
use crate::types::{DigestError, DirectoryRow, Result, Subscriber, SubscriberStatus};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const DIRECTORY_TIMEOUT_SECONDS: u64 = 30;

/// Subscriber directory read over HTTP as a JSON array of rows.
pub struct HttpDirectory {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpDirectory {
    pub fn new(url: String, token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DIRECTORY_TIMEOUT_SECONDS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, url, token }
    }
}

#[async_trait]
impl SubscriberDirectory for HttpDirectory {
    async fn fetch_rows(&self) -> Result<Vec<DirectoryRow>> {
        debug!("Fetching subscriber directory from {}", self.url);

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        let rows: Vec<DirectoryRow> = response.json().await?;

        debug!("Directory returned {} rows", rows.len());
        Ok(rows)
    }
}

/// How the final recipient list came to be, for the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverOutcome {
    Directory,
    Fallback,
}

/// Turns raw directory rows into a validated recipient list.
///
/// Directory trouble of any kind (unreachable, malformed, empty, or every
/// row invalid) resolves to the single configured fallback address so the
/// run can still exercise its delivery path. A run with no directory
/// configured at all goes straight to the fallback. Only a missing or
/// failed directory with no fallback configured fails the run.
pub struct SubscriberResolver {
    directory: Option<Box<dyn SubscriberDirectory>>,
    fallback_recipient: Option<String>,
}

impl SubscriberResolver {
    pub fn new(
        directory: Option<Box<dyn SubscriberDirectory>>,
        fallback_recipient: Option<String>,
    ) -> Self {
        Self {
            directory,
            fallback_recipient,
        }
    }

    pub async fn resolve(&self) -> Result<(Vec<Subscriber>, ResolverOutcome)> {
        let Some(directory) = &self.directory else {
            info!("No subscriber directory configured");
            return self.fall_back("no directory configured");
        };

        match directory.fetch_rows().await {
            Ok(rows) => {
                let subscribers = validate_rows(&rows);
                if subscribers.is_empty() {
                    warn!(
                        "Directory returned {} rows but none survived validation",
                        rows.len()
                    );
                    self.fall_back("no valid subscribers in directory")
                } else {
                    info!(
                        "Resolved {} subscribers from {} directory rows",
                        subscribers.len(),
                        rows.len()
                    );
                    Ok((subscribers, ResolverOutcome::Directory))
                }
            }
            Err(e) => {
                warn!("Subscriber directory unavailable: {}", e);
                self.fall_back(&e.to_string())
            }
        }
    }

    fn fall_back(&self, reason: &str) -> Result<(Vec<Subscriber>, ResolverOutcome)> {
        match &self.fallback_recipient {
            Some(addr) => {
                info!("Falling back to single configured recipient: {}", addr);
                let subscriber = Subscriber {
                    email: addr.trim().to_lowercase(),
                    status: SubscriberStatus::Unknown,
                };
                Ok((vec![subscriber], ResolverOutcome::Fallback))
            }
            None => Err(DigestError::NoRecipients(format!(
                "directory failed ({}) and no fallback recipient is configured",
                reason
            ))),
        }
    }
}

/// Validate and deduplicate directory rows, preserving row order.
/// A row survives iff its trimmed, lower-cased email is non-empty with
/// exactly one `@`, and its status (absent counts as eligible) permits
/// delivery.
pub fn validate_rows(rows: &[DirectoryRow]) -> Vec<Subscriber> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut subscribers = Vec::new();

    for row in rows {
        let email = row.email.trim().to_lowercase();
        if email.is_empty() || email.matches('@').count() != 1 {
            debug!("Dropping directory row with unusable email: '{}'", row.email);
            continue;
        }

        let subscriber = Subscriber {
            email: email.clone(),
            status: SubscriberStatus::parse(row.status.as_deref()),
        };
        if !subscriber.is_eligible() {
            debug!("Dropping ineligible subscriber: {}", email);
            continue;
        }
        if !seen.insert(email) {
            continue;
        }

        subscribers.push(subscriber);
    }

    subscribers
}
