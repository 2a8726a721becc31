//! Dispatcher stage: delivers the rendered report over an external mail
//! transport with a bounded retry state machine.
//!
//! Transient failures (timeouts, connection resets) are retried up to the
//! configured attempt budget with a fixed wait between attempts. Permanent
//! failures (invalid recipient, rejected message) are reported immediately.
//! At most one successful send ever happens per delivery.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::models::{DeliveryResult, ReportArtifact};
use crate::validation::InputValidator;

/// Failure classification reported by a transport
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Expected to potentially succeed on retry (timeout, connection reset)
    Transient(String),
    /// Retrying cannot fix it (invalid address, rejected content)
    Permanent(String),
}

/// One composed message handed to the transport
#[derive(Debug)]
pub struct OutgoingMessage<'a> {
    pub recipients: &'a [String],
    pub subject: &'a str,
    pub body: &'a str,
    pub attachment_name: &'a str,
    pub attachment: &'a [u8],
}

/// External message-transport collaborator
pub trait MailTransport {
    fn send(&mut self, message: &OutgoingMessage<'_>) -> std::result::Result<(), TransportError>;
}

/// Bounded retry policy for transient failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed wait between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

/// States of one delivery sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// An attempt is in flight
    Attempting { attempt: u32 },
    /// Exactly one send succeeded
    Succeeded { attempts: u32 },
    /// The transient-retry budget ran out
    Exhausted { attempts: u32, last_error: String },
    /// A permanent failure ended the sequence
    Rejected { attempts: u32, error: String },
}

impl DeliveryState {
    /// Initial state of a fresh delivery
    #[must_use]
    pub const fn start() -> Self {
        Self::Attempting { attempt: 1 }
    }

    /// Advance the machine with the outcome of the in-flight attempt
    #[must_use]
    pub fn advance(self, outcome: std::result::Result<(), TransportError>, max_attempts: u32) -> Self {
        let Self::Attempting { attempt } = self else {
            return self;
        };

        match outcome {
            Ok(()) => Self::Succeeded { attempts: attempt },
            Err(TransportError::Permanent(error)) => Self::Rejected { attempts: attempt, error },
            Err(TransportError::Transient(error)) => {
                if attempt < max_attempts {
                    Self::Attempting { attempt: attempt + 1 }
                } else {
                    Self::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    }
                }
            }
        }
    }

    /// True once no further attempt may happen
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempting { .. })
    }
}

/// Drives delivery of a report artifact through a transport
pub struct Dispatcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: MailTransport> Dispatcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Deliver the artifact to the recipients.
    ///
    /// Never returns `Err` for delivery failures; the outcome is carried in
    /// the [`DeliveryResult`] so the orchestrator can finish the run.
    pub fn deliver(
        &mut self,
        artifact: &ReportArtifact,
        recipients: &[String],
        subject: &str,
    ) -> DeliveryResult {
        if let Err(reason) = InputValidator::validate_recipients(recipients) {
            warn!(%reason, "Rejecting delivery before the first attempt");
            return DeliveryResult {
                delivered: false,
                attempts: 0,
                error: Some(reason.to_string()),
            };
        }

        let message = OutgoingMessage {
            recipients,
            subject,
            body: &artifact.digest,
            attachment_name: &artifact.file_name,
            attachment: artifact.table.as_bytes(),
        };

        let mut state = DeliveryState::start();
        loop {
            let DeliveryState::Attempting { attempt } = state else {
                break;
            };

            info!(attempt, max = self.policy.max_attempts, "Sending report email");
            let outcome = self.transport.send(&message);
            if let Err(TransportError::Transient(ref error)) = outcome {
                if attempt < self.policy.max_attempts {
                    warn!(
                        attempt,
                        error,
                        backoff_secs = self.policy.backoff.as_secs(),
                        "Transient delivery failure; waiting before retry"
                    );
                    thread::sleep(self.policy.backoff);
                }
            }
            state = state.advance(outcome, self.policy.max_attempts);
        }

        match state {
            DeliveryState::Succeeded { attempts } => {
                info!(attempts, "Report email delivered");
                DeliveryResult {
                    delivered: true,
                    attempts,
                    error: None,
                }
            }
            DeliveryState::Exhausted { attempts, last_error } => {
                warn!(attempts, error = %last_error, "Delivery failed after exhausting retries");
                DeliveryResult {
                    delivered: false,
                    attempts,
                    error: Some(last_error),
                }
            }
            DeliveryState::Rejected { attempts, error } => {
                warn!(attempts, %error, "Delivery rejected permanently");
                DeliveryResult {
                    delivered: false,
                    attempts,
                    error: Some(error),
                }
            }
            // Loop exits only on terminal states
            DeliveryState::Attempting { attempt } => DeliveryResult {
                delivered: false,
                attempts: attempt,
                error: Some("delivery loop ended unexpectedly".to_string()),
            },
        }
    }
}

/// SMTP transport (STARTTLS) backed by lettre
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from the email configuration
    pub fn from_config(config: &EmailConfig, password: &str) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid sender address '{}': {}", config.from, e))?;

        let transport = SmtpTransport::starttls_relay(&config.smtp_server)
            .map_err(|e| anyhow::anyhow!("Failed to set up SMTP relay: {}", e))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.from.clone(), password.to_string()))
            .build();

        Ok(Self { transport, from })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&mut self, message: &OutgoingMessage<'_>) -> std::result::Result<(), TransportError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(message.subject);

        for recipient in message.recipients {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|e| TransportError::Permanent(format!("Invalid recipient '{recipient}': {e}")))?;
            builder = builder.to(mailbox);
        }

        let content_type = ContentType::parse("text/csv")
            .map_err(|e| TransportError::Permanent(e.to_string()))?;

        let email = builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(message.body.to_string()))
                    .singlepart(
                        Attachment::new(message.attachment_name.to_string())
                            .body(message.attachment.to_vec(), content_type),
                    ),
            )
            .map_err(|e| TransportError::Permanent(e.to_string()))?;

        match self.transport.send(&email) {
            Ok(_) => Ok(()),
            Err(e) if e.is_permanent() => Err(TransportError::Permanent(e.to_string())),
            Err(e) => Err(TransportError::Transient(e.to_string())),
        }
    }
}
