//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod mailer;
pub mod memory;
pub mod postgres;
pub mod smtp;

pub use mailer::LogEmailSender;
#[cfg(test)]
pub use mailer::OutboxEmailSender;
pub use memory::InMemoryAccountsRepository;
pub use postgres::PgAccountsRepository;
pub use smtp::{SmtpConfig, SmtpEmailSender};

use crate::domain::entity::user::User;
use crate::domain::value_object::user_password::{RawPassword, UserPassword};
use crate::error::{AuthError, AuthResult};

/// Shared tail of `get_by_credentials`
///
/// An unknown login still pays for one hash verification so both failures
/// take about as long.
pub(crate) fn check_credentials(
    found: Option<User>,
    password: &RawPassword,
    pepper: Option<&[u8]>,
) -> AuthResult<User> {
    match found {
        Some(user) if user.password.verify(password, pepper) => Ok(user),
        Some(_) => Err(AuthError::InvalidCredentials),
        None => {
            UserPassword::verify_dummy(password, pepper);
            Err(AuthError::InvalidCredentials)
        }
    }
}
