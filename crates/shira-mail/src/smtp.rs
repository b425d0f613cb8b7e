//! SMTP delivery through an authenticated STARTTLS relay.

use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

use crate::error::MailError;
use crate::outbox::{Deliver, Message, Sender};

/// Sends messages through `relay:port`, logging in as the sender with its
/// app password.
pub struct SmtpDeliver {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl SmtpDeliver {
    pub fn new(relay: &str, port: u16, sender: &Sender, timeout: Duration) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(relay)?
            .port(port)
            .credentials(Credentials::new(
                sender.address.clone(),
                sender.app_password.clone(),
            ))
            .timeout(Some(timeout))
            .build();
        Ok(Self {
            transport,
            relay: format!("{relay}:{port}"),
        })
    }
}

#[async_trait]
impl Deliver for SmtpDeliver {
    async fn deliver(&self, message: &Message) -> Result<(), MailError> {
        let email = message.to_email()?;
        let response = self.transport.send(email).await?;
        info!(
            relay = %self.relay,
            to = %message.to,
            subject = %message.subject,
            code = %response.code(),
            "message sent"
        );
        Ok(())
    }
}
