//! Application Configuration
//!
//! Configuration for the accounts application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;
/// Re-export SameSite from platform
pub use platform::cookie::SameSite;
use platform::rate_limit::IntervalThrottle;

/// Accounts application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shown in email subjects and bodies
    pub app_name: String,
    /// Base URL the activation/reset links point to (no trailing slash)
    pub frontend_url: String,
    /// Minimum time between two tokens of the same kind for one user
    pub interval_between_tokens_generation: Duration,
    /// Activation tokens older than this are swept
    pub activation_token_ttl: Duration,
    /// Reset tokens older than this are rejected and swept
    pub reset_password_token_ttl: Duration,
    pub session_ttl: Duration,
    pub session_cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Background queue capacity
    pub task_queue_capacity: usize,
    /// Per-task timeout in the background worker
    pub task_timeout: Duration,
    /// How often stale tokens are swept
    pub sweep_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_name: "Accounts".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            interval_between_tokens_generation: Duration::from_secs(10 * 60),
            activation_token_ttl: Duration::from_secs(24 * 3600),
            reset_password_token_ttl: Duration::from_secs(3600),
            session_ttl: Duration::from_secs(7 * 24 * 3600),
            session_cookie_name: "session_id".to_string(),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            task_queue_capacity: 1024,
            task_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl AuthConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::default()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn token_throttle(&self) -> IntervalThrottle {
        IntervalThrottle::new(self.interval_between_tokens_generation)
    }

    /// Session TTL as a chrono duration (saturates on overflow)
    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::MAX)
    }

    pub fn cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age: Some(self.session_ttl),
        }
    }

    pub fn activation_link(&self, user_id: impl std::fmt::Display, token: &str) -> String {
        format!(
            "{}/{}/activate/{}",
            self.frontend_url.trim_end_matches('/'),
            user_id,
            token
        )
    }

    pub fn reset_password_link(&self, user_id: impl std::fmt::Display, token: &str) -> String {
        format!(
            "{}/{}/reset-password/{}",
            self.frontend_url.trim_end_matches('/'),
            user_id,
            token
        )
    }
}
