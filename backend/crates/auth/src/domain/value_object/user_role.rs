use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UserRole {
    #[default]
    Default = 0,
    Administrative = 1,
}

impl UserRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            UserRole::Default => "default",
            UserRole::Administrative => "administrative",
        }
    }

    #[inline]
    pub const fn is_administrative(&self) -> bool {
        matches!(self, UserRole::Administrative)
    }

    pub fn from_id(id: i16) -> Result<Self, ValidationError> {
        match id {
            0 => Ok(UserRole::Default),
            1 => Ok(UserRole::Administrative),
            _ => {
                tracing::error!(role_id = id, "Invalid UserRole id");
                Err(ValidationError::Role)
            }
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        match code {
            "default" => Ok(UserRole::Default),
            "administrative" => Ok(UserRole::Administrative),
            _ => Err(ValidationError::Role),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
