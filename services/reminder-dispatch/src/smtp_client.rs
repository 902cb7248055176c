//! SMTP Client
//!
//! Outbound mail for reminders, sent via SMTP using lettre.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};
use vtrack_utils::EmailConfig;

/// Anything that can deliver one plain-text message to one address.
///
/// A returned error means the message must be treated as not delivered.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP client for sending emails
pub struct SmtpClient {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpClient {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .context("Invalid from address")?;

        let mut builder = if config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .context("Failed to create SMTP transport")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        builder = builder.port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            from,
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpClient {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let to: Mailbox = recipient.parse().context("Invalid to address")?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build email")?;

        let response = self
            .mailer
            .send(email)
            .await
            .context("Failed to send email")?;

        tracing::debug!(
            recipient,
            code = %response.code(),
            "SMTP relay accepted message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtrack_utils::AppConfig;

    #[test]
    fn test_client_builds_for_plain_relay() {
        let mut config = AppConfig::default().email;
        config.use_starttls = false;
        config.smtp_host = "localhost".to_string();
        assert!(SmtpClient::new(&config).is_ok());
    }

    #[test]
    fn test_rejects_bad_sender() {
        let mut config = AppConfig::default().email;
        config.use_starttls = false;
        config.from_address = "not an address".to_string();
        assert!(SmtpClient::new(&config).is_err());
    }
}
