//! Outbound Service Traits

use crate::error::EmailError;

/// A composed email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Email delivery; only called from the background worker
#[trait_variant::make(EmailSender: Send)]
pub trait LocalEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}
