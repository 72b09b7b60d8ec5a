use std::fmt;

use platform::crypto::{log_fingerprint, random_token};

/// Number of random bytes behind a session id
const SESSION_ID_BYTES: usize = 32;

/// Opaque session identifier carried in the session cookie
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(random_token(SESSION_ID_BYTES))
    }

    /// Wrap a cookie value or a stored id
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tag safe to put in logs
    pub fn fingerprint(&self) -> String {
        log_fingerprint(self.0.as_bytes())
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionId").field(&self.fingerprint()).finish()
    }
}
