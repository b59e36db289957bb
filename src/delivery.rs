use crate::render::DigestEmail;
use crate::traits::{PrimaryChannel, SecondaryChannel};
use crate::types::{
    DeliveryChannel, DeliveryOutcome, DigestError, Result, Subscriber,
};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

const BULK_TIMEOUT_SECONDS: u64 = 60;

/// Where one run's delivery ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    NotStarted,
    PrimaryAttempted,
    FallbackAttempted,
    Delivered,
    Failed,
}

/// The dispatcher's full account of one run: terminal state plus one
/// outcome per recipient.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub state: DeliveryState,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }
}

/// Two-channel delivery with a single whole-list fallback.
///
/// The primary channel is tried once for the entire batch; any primary
/// failure moves the whole list to the secondary channel. There is no
/// per-recipient channel split and no retry beyond that one fallback —
/// the next scheduled run is the retry.
pub struct DeliveryDispatcher {
    primary: Option<Box<dyn PrimaryChannel>>,
    secondary: Box<dyn SecondaryChannel>,
}

impl DeliveryDispatcher {
    pub fn new(
        primary: Option<Box<dyn PrimaryChannel>>,
        secondary: Box<dyn SecondaryChannel>,
    ) -> Self {
        Self { primary, secondary }
    }

    pub async fn dispatch(
        &self,
        email: &DigestEmail,
        recipients: &[Subscriber],
    ) -> Result<DeliveryReport> {
        if recipients.is_empty() {
            return Err(DigestError::NoRecipients(
                "dispatcher was handed an empty recipient list".to_string(),
            ));
        }

        let mut state = DeliveryState::NotStarted;

        if let Some(primary) = &self.primary {
            state = DeliveryState::PrimaryAttempted;
            info!(
                "Attempting primary channel ({}) for {} recipients",
                primary.describe(),
                recipients.len()
            );

            match primary.send_bulk(email, recipients).await {
                Ok(()) => {
                    info!("Primary channel delivered to the whole list");
                    let outcomes = recipients
                        .iter()
                        .map(|r| {
                            DeliveryOutcome::delivered(r.email.clone(), DeliveryChannel::Primary)
                        })
                        .collect();
                    return Ok(DeliveryReport {
                        state: DeliveryState::Delivered,
                        outcomes,
                    });
                }
                Err(e) => {
                    warn!(
                        "Primary channel failed, falling back to {}: {}",
                        self.secondary.describe(),
                        e
                    );
                }
            }
        } else {
            debug!("No primary channel configured, going straight to fallback");
        }

        // Whole-list fallback: one outcome per recipient, failures logged
        // and carried but never aborting the rest of the batch.
        debug!("Entering secondary fallback from state {:?}", state);
        state = DeliveryState::FallbackAttempted;

        let mut outcomes = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            match self.secondary.send_single(email, &recipient.email).await {
                Ok(()) => {
                    debug!("Delivered to {} via secondary channel", recipient.email);
                    outcomes.push(DeliveryOutcome::delivered(
                        recipient.email.clone(),
                        DeliveryChannel::Secondary,
                    ));
                }
                Err(e) => {
                    warn!("Secondary delivery to {} failed: {}", recipient.email, e);
                    outcomes.push(DeliveryOutcome::failed(
                        recipient.email.clone(),
                        DeliveryChannel::Secondary,
                        e.to_string(),
                    ));
                }
            }
        }

        let delivered = outcomes.iter().filter(|o| o.succeeded).count();
        debug_assert_eq!(state, DeliveryState::FallbackAttempted);
        state = if delivered > 0 {
            DeliveryState::Delivered
        } else {
            DeliveryState::Failed
        };
        info!(
            "Secondary channel finished: {} delivered, {} failed",
            delivered,
            outcomes.len() - delivered
        );

        Ok(DeliveryReport { state, outcomes })
    }
}

#[derive(serde::Serialize)]
struct BulkSendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

/// Primary channel: one HTTP call submits the digest to the whole list.
pub struct BulkMailChannel {
    client: Client,
    api_url: String,
    api_key: String,
}

impl BulkMailChannel {
    pub fn new(api_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(BULK_TIMEOUT_SECONDS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl PrimaryChannel for BulkMailChannel {
    fn describe(&self) -> &str {
        "bulk-mail-api"
    }

    async fn send_bulk(&self, email: &DigestEmail, recipients: &[Subscriber]) -> Result<()> {
        let body = BulkSendRequest {
            from: &email.from,
            to: recipients.iter().map(|r| r.email.as_str()).collect(),
            subject: &email.subject,
            html: &email.html_body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        // Auth, quota, and content rejections all surface here as non-2xx;
        // every one of them is a fallback trigger, not a run failure.
        response.error_for_status()?;
        Ok(())
    }
}

/// Secondary channel: per-recipient submission over one authenticated
/// STARTTLS transport, built once and reused for the whole batch.
pub struct SmtpChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpChannel {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        from: &str,
    ) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }
}

#[async_trait]
impl SecondaryChannel for SmtpChannel {
    fn describe(&self) -> &str {
        "smtp-direct"
    }

    async fn send_single(&self, email: &DigestEmail, recipient: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse()?)
            .subject(&email.subject)
            .header(header::ContentType::TEXT_HTML)
            .body(email.html_body.clone())?;

        self.transport.send(message).await?;
        Ok(())
    }
}
