//! Message envelope, the transport seam, and the dry-run outbox.
//!
//! The outbox writes one complete RFC 5322 message per delivery into a
//! directory instead of sending it. Files are written under a temporary name
//! and renamed into place, so a watcher never picks up a partial message.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use tracing::info;

use crate::error::MailError;

/// Sender identity. The app password authenticates against the SMTP relay.
#[derive(Clone)]
pub struct Sender {
    pub address: String,
    pub app_password: String,
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("address", &self.address)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

/// A rendered letter ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Message {
    /// Subject line used for every letter: `"{title} | {author}"`, on one line.
    pub fn subject_for(title: &str, author: &str) -> String {
        format!("{title} | {author}")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the wire message: parsed mailboxes, encoded subject, HTML body.
    pub fn to_email(&self) -> Result<lettre::Message, MailError> {
        Ok(lettre::Message::builder()
            .from(mailbox(&self.from)?)
            .to(mailbox(&self.to)?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(self.html.clone())?)
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

/// Transport for a finished message. Called at most once per run.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, message: &Message) -> Result<(), MailError>;
}

/// Writes messages as `.eml` files into a directory.
pub struct Outbox {
    dir: PathBuf,
}

impl Outbox {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MailError {
    move |source| MailError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl Deliver for Outbox {
    async fn deliver(&self, message: &Message) -> Result<(), MailError> {
        let email = message.to_email()?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        let stem = format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"), std::process::id());
        let tmp = self.dir.join(format!(".{stem}.tmp"));
        let path = self.dir.join(format!("{stem}.eml"));

        tokio::fs::write(&tmp, email.formatted())
            .await
            .map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(io_error(&path))?;

        info!(path = %path.display(), to = %message.to, subject = %message.subject, "message written to outbox");
        Ok(())
    }
}
