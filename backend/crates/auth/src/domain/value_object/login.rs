//! Login Value Object
//!
//! The unique handle a user signs in with. Input is NFKC-normalized and
//! trimmed; case is preserved for display, while uniqueness is enforced by
//! the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

use crate::error::ValidationError;

pub const LOGIN_MIN_LENGTH: usize = 2;

pub const LOGIN_MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Login(String);

impl Login {
    pub fn new(input: impl AsRef<str>) -> Result<Self, ValidationError> {
        let login = Self::normalize(input.as_ref());
        let length = login.chars().count();

        if !(LOGIN_MIN_LENGTH..=LOGIN_MAX_LENGTH).contains(&length)
            || login.chars().any(char::is_control)
        {
            return Err(ValidationError::LoginLength {
                min: LOGIN_MIN_LENGTH,
                max: LOGIN_MAX_LENGTH,
            });
        }

        Ok(Self(login))
    }

    /// Normalization applied to every login, also on lookups
    pub fn normalize(input: &str) -> String {
        input.nfkc().collect::<String>().trim().to_string()
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(login: impl Into<String>) -> Self {
        Self(login.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
