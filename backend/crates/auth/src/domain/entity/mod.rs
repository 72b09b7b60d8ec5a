//! Entity Module

pub mod session;
pub mod token;
pub mod user;
