//! Domain Layer
//!
//! Contains entities, value objects, repository and service traits.

pub mod entity;
pub mod repository;
pub mod service;
pub mod value_object;

// Re-exports
pub use entity::{session::Session, token::Token, user::User};
pub use repository::{SessionStore, TokenRepository, UserRepository};
pub use service::{EmailMessage, EmailSender};
