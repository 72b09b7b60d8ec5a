//! Token Value Objects
//!
//! Single-use tokens are identified by kind, value and owner together. The
//! value alone is never trusted.

use kernel::id::Id;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub struct TokenMarker;
pub type TokenId = Id<TokenMarker>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    #[display("activate_account")]
    #[serde(rename = "activate_account")]
    Activation,
    #[display("reset_password")]
    ResetPassword,
}

impl TokenType {
    pub const ALL: [TokenType; 2] = [TokenType::Activation, TokenType::ResetPassword];

    pub const fn code(&self) -> &'static str {
        match self {
            TokenType::Activation => "activate_account",
            TokenType::ResetPassword => "reset_password",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "activate_account" => Some(TokenType::Activation),
            "reset_password" => Some(TokenType::ResetPassword),
            _ => None,
        }
    }
}

/// Opaque token value (UUID v4 in canonical form)
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenValue(String);

impl TokenValue {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a value supplied by a client or loaded from the store
    pub fn from_input(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Token values are credentials; keep them out of debug logs.
impl fmt::Debug for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenValue").field(&"[REDACTED]").finish()
    }
}
