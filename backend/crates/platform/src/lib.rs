//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Password policy, Argon2id hashing and strong password generation
//! - Random session identifiers and hashing helpers
//! - Cookie management
//! - Interval-based throttling

pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
