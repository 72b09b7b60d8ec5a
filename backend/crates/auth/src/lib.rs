//! Accounts Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository and service traits
//! - `application/` - Use cases, background queue, token sweeper
//! - `infra/` - PostgreSQL and in-memory stores, SMTP and outbox mailers
//! - `presentation/` - HTTP handlers, DTOs, router, localization
//!
//! ## Features
//! - Signup with email activation, login/logout with server-side sessions
//! - Password reset through a mailed single-use token
//! - Token generation throttled per user and token kind
//! - User administration reserved to administrators
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional application pepper
//! - Unknown logins cost the same hash verification as wrong passwords
//! - Tokens validate only when kind, value and owner all match
//! - A password reset ends every session of the account

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryAccountsRepository, PgAccountsRepository};
pub use presentation::router::accounts_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
