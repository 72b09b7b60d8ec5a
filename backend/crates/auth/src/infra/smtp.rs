//! SMTP Email Sender

use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::service::{EmailMessage, EmailSender};
use crate::error::EmailError;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address, e.g. `Accounts <no-reply@example.com>`
    pub from: String,
    /// STARTTLS; plain connections are only meant for local relays
    pub starttls: bool,
}

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.parse().map_err(|e: lettre::address::AddressError| EmailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let from = parse_mailbox(&config.from)?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| EmailError::Build(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::info!(host = %config.host, port = config.port, "SMTP mailer configured");

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn compose(&self, message: &EmailMessage) -> Result<Message, EmailError> {
        Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = self.compose(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| EmailError::Delivery(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".into(),
            port: 2525,
            username: None,
            password: None,
            from: "Accounts <no-reply@example.com>".into(),
            starttls: false,
        }
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        let config = SmtpConfig {
            from: "not an address".into(),
            ..config()
        };
        assert!(matches!(
            SmtpEmailSender::new(&config),
            Err(EmailError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_compose_checks_recipient() {
        let sender = SmtpEmailSender::new(&config()).unwrap();
        let mut message = EmailMessage {
            to: "alice@example.com".into(),
            subject: "Hello".into(),
            html_body: "<p>hi</p>".into(),
        };
        assert!(sender.compose(&message).is_ok());

        message.to = "alice".into();
        assert!(matches!(
            sender.compose(&message),
            Err(EmailError::InvalidAddress { .. })
        ));
    }
}
