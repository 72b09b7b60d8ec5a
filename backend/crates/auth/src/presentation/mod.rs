//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, middleware and error localization.

pub mod dto;
pub mod handlers;
pub mod i18n;
pub mod middleware;
pub mod router;

pub use handlers::{AccountsAppState, AccountsStore, Viewer};
pub use i18n::{Language, LocalizedError, Localizer};
pub use middleware::resolve_viewer;
pub use router::accounts_router;
