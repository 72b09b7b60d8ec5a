//! Shared Kernel
//!
//! Vocabulary shared by every crate of the accounts backend:
//! - The unified HTTP-facing error type ([`error::app_error::AppError`])
//! - Typed numeric identifiers ([`id::Id`])
//!
//! Anything that is specific to one bounded context stays in that context's crate.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
