//! Non-delivering Mailers
//!
//! `LogEmailSender` stands in for SMTP in local runs. It keeps nothing and
//! never logs the body, which may carry a freshly generated password.

use crate::domain::service::{EmailMessage, EmailSender};
use crate::error::EmailError;

/// Logs recipient and subject, then drops the message
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

impl LogEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.html_body.len(),
            "Email not delivered (no SMTP configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
pub use outbox::OutboxEmailSender;
