// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP mail channel for the crashrelay reporting toolkit.
//!
//! Implements [`ReportChannel`] over lettre's async SMTP transport with
//! STARTTLS. Live reports go out as one message to every configured
//! recipient; the offline backlog is flushed as a single digest message.

use std::path::Path;

use async_trait::async_trait;
use crashrelay_config::model::MailConfig;
use crashrelay_core::error::CrashrelayError;
use crashrelay_core::traits::ReportChannel;
use crashrelay_core::types::{BacklogReceipt, Report, StoredReport};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

/// Default subject line, shared by live reports and the backlog digest.
const DEFAULT_SUBJECT: &str = "Crash Report";

/// Intro line opening the backlog digest body.
const DIGEST_INTRO: &str = "Here is a list of crash reports that were stored offline.";

/// Rule separating stored reports inside the digest body.
const DIGEST_RULE: &str = "-------------------------------------------------";

/// Mail channel implementing [`ReportChannel`] over SMTP.
///
/// Addresses are parsed at construction so a malformed sender or recipient
/// fails at setup rather than on the first crash.
pub struct MailChannel {
    host: String,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    digest_subject: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl MailChannel {
    /// Creates a new mail channel from the `[mail]` configuration section.
    ///
    /// Requires `host`, `sender_address`, and at least one recipient. An
    /// empty `sender_credential` selects an unauthenticated relay.
    pub fn new(config: MailConfig) -> Result<Self, CrashrelayError> {
        if config.host.trim().is_empty() {
            return Err(CrashrelayError::Config(
                "mail.host cannot be empty".into(),
            ));
        }

        if config.recipients.is_empty() {
            return Err(CrashrelayError::Config(
                "mail.recipients must list at least one address".into(),
            ));
        }

        let sender: Mailbox = config.sender_address.parse().map_err(|e| {
            CrashrelayError::Config(format!(
                "mail.sender_address `{}` is not a valid address: {e}",
                config.sender_address
            ))
        })?;

        let mut recipients = Vec::with_capacity(config.recipients.len());
        for address in &config.recipients {
            let mailbox: Mailbox = address.parse().map_err(|e| {
                CrashrelayError::Config(format!(
                    "mail recipient `{address}` is not a valid address: {e}"
                ))
            })?;
            recipients.push(mailbox);
        }

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| CrashrelayError::Channel {
                message: format!("failed to configure SMTP relay for {}: {e}", config.host),
                source: Some(Box::new(e)),
            })?
            .port(config.port);

        if !config.sender_credential.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.sender_address.clone(),
                config.sender_credential.clone(),
            ));
        }

        Ok(Self {
            host: config.host,
            sender,
            recipients,
            digest_subject: DEFAULT_SUBJECT.to_string(),
            transport: builder.build(),
        })
    }

    /// Sets the subject line used for the backlog digest message.
    ///
    /// Lets the digest carry the same subject as live reports.
    pub fn with_digest_subject(mut self, subject: impl Into<String>) -> Self {
        self.digest_subject = subject.into();
        self
    }

    /// Composes a live crash report message.
    ///
    /// The body goes out as `text/plain` or `text/html` per the report's
    /// markup flag; attachments turn the message into `multipart/mixed`.
    fn compose(&self, report: &Report) -> Result<Message, CrashrelayError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(&report.subject);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        let content_type = if report.rich {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let result = if report.attachments.is_empty() {
            builder.header(content_type).body(report.body.clone())
        } else {
            let mut parts = MultiPart::mixed().singlepart(
                SinglePart::builder()
                    .header(content_type)
                    .body(report.body.clone()),
            );
            for path in &report.attachments {
                parts = parts.singlepart(attachment_part(path)?);
            }
            builder.multipart(parts)
        };

        result.map_err(|e| CrashrelayError::Channel {
            message: format!("failed to compose crash report mail: {e}"),
            source: Some(Box::new(e)),
        })
    }

    async fn deliver(&self, email: Message) -> Result<(), CrashrelayError> {
        self.transport
            .send(email)
            .await
            .map_err(|e| CrashrelayError::Channel {
                message: format!("failed to deliver mail via {}: {e}", self.host),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ReportChannel for MailChannel {
    fn name(&self) -> &str {
        "mail"
    }

    async fn send_report(&self, report: &Report) -> Result<(), CrashrelayError> {
        let email = self.compose(report)?;
        self.deliver(email).await?;
        debug!(subject = %report.subject, "crash report delivered by mail");
        Ok(())
    }

    async fn send_backlog(
        &self,
        reports: &[StoredReport],
    ) -> Result<BacklogReceipt, CrashrelayError> {
        if reports.is_empty() {
            return Ok(BacklogReceipt::empty());
        }

        let body = digest_body(reports)?;
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(&self.digest_subject);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        let email = builder
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| CrashrelayError::Channel {
                message: format!("failed to compose offline report digest: {e}"),
                source: Some(Box::new(e)),
            })?;

        self.deliver(email).await?;
        info!(count = reports.len(), "offline crash reports delivered by mail");

        // One message carries the whole backlog, so the receipt is
        // all-or-nothing.
        Ok(BacklogReceipt::covering(reports))
    }
}

/// Builds an attachment part from a file on disk.
fn attachment_part(path: &Path) -> Result<SinglePart, CrashrelayError> {
    let content = std::fs::read(path).map_err(|e| CrashrelayError::Channel {
        message: format!("failed to read attachment {}: {e}", path.display()),
        source: Some(Box::new(e)),
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());

    let content_type =
        ContentType::parse("application/octet-stream").map_err(|e| CrashrelayError::Channel {
            message: format!("failed to build attachment part: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(Attachment::new(filename).body(content, content_type))
}

/// Concatenates stored report bodies into one digest, newest first, each
/// followed by a separator rule.
fn digest_body(reports: &[StoredReport]) -> Result<String, CrashrelayError> {
    let mut body = String::new();
    body.push_str(DIGEST_INTRO);
    body.push('\n');
    body.push_str(DIGEST_RULE);
    body.push('\n');
    for report in reports {
        let content = report.read()?;
        body.push_str(&content);
        if !content.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(DIGEST_RULE);
        body.push('\n');
    }
    Ok(body)
}
