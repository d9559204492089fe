//! E-mail dispatch with attachments.
//!
//! [`send_email`] builds a `multipart/mixed` message and hands it to a
//! [`MailTransport`]. Every failure is reported through the logger and
//! turned into `false`; nothing propagates to the caller.

#![allow(missing_docs)]

pub mod smtp;

use std::fs;
use std::path::{Path, PathBuf};

use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use parking_lot::Mutex;

use crate::core::errors::{DgmError, Result};
use crate::logger::leveled::Logger;
use crate::logger::level::Severity;
use crate::logger::reporter::ErrorReport;

pub use smtp::SmtpMailTransport;

const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub sender: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

impl MailMessage {
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            to,
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    /// Render into a `lettre` message, reading every attachment.
    pub fn build(&self) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.sender.parse::<Mailbox>()?)
            .subject(self.subject.as_str())
            .date_now();
        for recipient in &self.to {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
        for path in &self.attachments {
            parts = parts.singlepart(attachment(path)?);
        }

        Ok(builder.multipart(parts)?)
    }
}

fn attachment(path: &Path) -> Result<SinglePart> {
    let bytes = fs::read(path).map_err(|source| DgmError::io(path, source))?;
    let name = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy())
        .into_owned();
    let content_type =
        ContentType::parse(ATTACHMENT_CONTENT_TYPE).map_err(|err| DgmError::Mail {
            context: "content-type",
            details: err.to_string(),
        })?;
    Ok(Attachment::new(name).body(bytes, content_type))
}

/// Something that can deliver a built message to a mail server.
pub trait MailTransport {
    fn name(&self) -> &'static str;
    fn deliver(&self, server: &str, message: &Message) -> Result<()>;
}

/// A message accepted by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub server: String,
    pub from: Option<String>,
    pub to: Vec<String>,
    /// Full RFC 5322 rendering of the message.
    pub raw: String,
}

/// In-memory transport that keeps every delivery. Can be set to fail.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<Delivery>>,
    failure: Option<String>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that rejects every message with `details`.
    #[must_use]
    pub fn failing(details: impl Into<String>) -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            failure: Some(details.into()),
        }
    }

    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }
}

impl MailTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, server: &str, message: &Message) -> Result<()> {
        if let Some(details) = &self.failure {
            return Err(DgmError::Mail {
                context: "recording",
                details: details.clone(),
            });
        }
        let envelope = message.envelope();
        self.deliveries.lock().push(Delivery {
            server: server.to_string(),
            from: envelope.from().map(ToString::to_string),
            to: envelope.to().iter().map(ToString::to_string).collect(),
            raw: String::from_utf8_lossy(&message.formatted()).into_owned(),
        });
        Ok(())
    }
}

/// Build and send `message` through `transport` to `server`.
///
/// Returns `false` after a warning when the server or the recipient list is
/// missing, and after an error report when building or delivery fails.
pub fn send_email(
    logger: &Logger,
    transport: &dyn MailTransport,
    message: &MailMessage,
    server: Option<&str>,
    indent: usize,
) -> bool {
    logger.log(Severity::Info, indent, "Sending email");
    logger.log(Severity::Info, indent + 1, &format!("From: {}", message.sender));
    logger.log(
        Severity::Info,
        indent + 1,
        &format!("To: {}", message.to.join(", ")),
    );
    logger.log(
        Severity::Info,
        indent + 1,
        &format!("Subject: {}", message.subject),
    );
    logger.log(
        Severity::Info,
        indent + 1,
        &format!(
            "Attachments: {}",
            if message.attachments.is_empty() {
                "no"
            } else {
                "yes"
            }
        ),
    );

    let Some(server) = server.map(str::trim).filter(|s| !s.is_empty()) else {
        logger.log(
            Severity::Warning,
            indent + 1,
            "No mail server configured. Email not sent.",
        );
        return false;
    };
    if message.to.is_empty() {
        logger.log(
            Severity::Warning,
            indent + 1,
            "No recipients given. Email not sent.",
        );
        return false;
    }

    let result = message
        .build()
        .and_then(|built| transport.deliver(server, &built));
    match result {
        Ok(()) => {
            logger.log(
                Severity::Info,
                indent + 1,
                &format!("Email sent via {} ({server})", transport.name()),
            );
            true
        }
        Err(e) => {
            logger.report(
                &ErrorReport::new("error sending email")
                    .cause(e)
                    .indent(indent + 1),
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::LogPaths;

    fn logger_in(dir: &Path) -> Logger {
        let paths = LogPaths::resolve(
            dir,
            "mail",
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            1,
        );
        Logger::new(paths, Severity::Debug).with_stdout_mirror(false)
    }

    fn general_log(logger: &Logger) -> String {
        fs::read_to_string(&logger.paths().general_log).unwrap_or_default()
    }

    fn message() -> MailMessage {
        MailMessage::new(
            "dgm.lib@localhost",
            vec!["ops@example.com".to_string(), "dba@example.com".to_string()],
            "Daily report",
            "see attachment",
        )
    }

    #[test]
    fn delivers_multipart_with_named_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let attachment = dir.path().join("report.csv");
        fs::write(&attachment, "a,b\n1,2\n").unwrap();

        let transport = RecordingTransport::new();
        let sent = send_email(
            &logger,
            &transport,
            &message().attach(&attachment),
            Some("smtp.local"),
            0,
        );
        assert!(sent);

        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 1);
        let delivery = &deliveries[0];
        assert_eq!(delivery.server, "smtp.local");
        assert_eq!(delivery.from.as_deref(), Some("dgm.lib@localhost"));
        assert_eq!(delivery.to, vec!["ops@example.com", "dba@example.com"]);
        assert!(delivery.raw.contains("Subject: Daily report"));
        assert!(delivery.raw.contains("multipart/mixed"));
        assert!(delivery.raw.contains("application/octet-stream"));
        assert!(delivery.raw.contains("report.csv"));
        assert!(delivery.raw.contains("Date: "));

        let log = general_log(&logger);
        assert!(log.contains("Attachments: yes"));
        assert!(log.contains("Email sent via recording"));
    }

    #[test]
    fn missing_server_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let transport = RecordingTransport::new();
        assert!(!send_email(&logger, &transport, &message(), None, 0));
        assert!(!send_email(&logger, &transport, &message(), Some("  "), 0));
        assert!(transport.deliveries().is_empty());
        assert!(general_log(&logger).contains("[WARNING]:"));
    }

    #[test]
    fn missing_recipients_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let transport = RecordingTransport::new();
        let msg = MailMessage::new("a@b.c", Vec::new(), "s", "b");
        assert!(!send_email(&logger, &transport, &msg, Some("smtp"), 0));
        assert!(general_log(&logger).contains("No recipients given"));
    }

    #[test]
    fn bad_address_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let transport = RecordingTransport::new();
        let msg = MailMessage::new("not an address", vec!["x@y.z".into()], "s", "b");
        assert!(!send_email(&logger, &transport, &msg, Some("smtp"), 0));
        let log = general_log(&logger);
        assert!(log.contains("[ERROR]:     error sending email"));
        assert!(log.contains("Reason: [DGM-3001]"));
    }

    #[test]
    fn unreadable_attachment_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let transport = RecordingTransport::new();
        let msg = message().attach(dir.path().join("missing.bin"));
        assert!(!send_email(&logger, &transport, &msg, Some("smtp"), 0));
        assert!(general_log(&logger).contains("[DGM-3002]"));
    }

    #[test]
    fn transport_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(dir.path());
        let transport = RecordingTransport::failing("relay refused");
        assert!(!send_email(&logger, &transport, &message(), Some("smtp"), 1));
        assert!(general_log(&logger).contains("relay refused"));
    }
}
