//! Server Configuration
//!
//! Everything the binary needs, read once from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::AuthConfig;
use auth::infra::SmtpConfig;
use base64::Engine;
use base64::engine::general_purpose;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Where accounts are persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    /// Process-local maps; everything is lost on restart
    Memory,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    /// `None` keeps outgoing mail in a log-only outbox
    pub smtp: Option<SmtpConfig>,
    pub frontend_origins: Vec<String>,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let storage = match var("STORAGE").as_deref().unwrap_or("postgres") {
            "postgres" => StorageBackend::Postgres {
                database_url: var("DATABASE_URL").context("DATABASE_URL must be set")?,
            },
            "memory" => StorageBackend::Memory,
            other => bail!("STORAGE must be `postgres` or `memory`, got `{other}`"),
        };

        let bind_addr = parse(
            "BIND_ADDR",
            var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;

        let mut auth = if cfg!(debug_assertions) {
            AuthConfig::development()
        } else {
            AuthConfig::default()
        };
        if let Some(app_name) = var("APP_NAME") {
            auth.app_name = app_name;
        }
        if let Some(frontend_url) = var("FRONTEND_URL") {
            auth.frontend_url = frontend_url.trim_end_matches('/').to_string();
        }
        if let Some(minutes) = var("TOKEN_INTERVAL_MINUTES") {
            let minutes: u64 = parse("TOKEN_INTERVAL_MINUTES", minutes)?;
            let Some(secs) = minutes.checked_mul(60) else {
                bail!("TOKEN_INTERVAL_MINUTES is too large: {minutes}");
            };
            auth.interval_between_tokens_generation = Duration::from_secs(secs);
        }
        if let Some(secure) = var("COOKIE_SECURE") {
            auth.cookie_secure = parse("COOKIE_SECURE", secure)?;
        }
        if let Some(pepper) = var("PASSWORD_PEPPER") {
            let bytes = general_purpose::STANDARD
                .decode(pepper)
                .context("PASSWORD_PEPPER must be base64")?;
            auth.password_pepper = Some(bytes);
        }

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: match var("SMTP_PORT") {
                    Some(port) => parse("SMTP_PORT", port)?,
                    None => DEFAULT_SMTP_PORT,
                },
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                from: var("SMTP_FROM").context("SMTP_FROM must be set with SMTP_HOST")?,
                starttls: match var("SMTP_STARTTLS") {
                    Some(flag) => parse("SMTP_STARTTLS", flag)?,
                    None => true,
                },
            }),
            None => None,
        };

        let frontend_origins = var("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            bind_addr,
            storage,
            smtp,
            frontend_origins,
            auth,
        })
    }
}

fn parse<T>(key: &str, value: String) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("{key} has an invalid value `{value}`"))
}
