//! Stale Token and Session Sweep
//!
//! Removes tokens past their lifetime and expired sessions. Validation does
//! not rely on it: a token is only ever accepted if it still exists and
//! matches, and session lookups skip expired rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::application::config::AuthConfig;
use crate::domain::entity::token::TokenFilter;
use crate::domain::repository::{SessionStore, TokenRepository};
use crate::domain::value_object::token::TokenType;
use crate::error::StoreResult;

/// What one sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub tokens: usize,
    pub sessions: usize,
}

pub struct TokenSweeper<T, S>
where
    T: TokenRepository,
    S: SessionStore,
{
    token_repo: Arc<T>,
    session_store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<T, S> TokenSweeper<T, S>
where
    T: TokenRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    pub fn new(token_repo: Arc<T>, session_store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            token_repo,
            session_store,
            config,
        }
    }

    fn ttl(&self, kind: TokenType) -> Duration {
        match kind {
            TokenType::Activation => self.config.activation_token_ttl,
            TokenType::ResetPassword => self.config.reset_password_token_ttl,
        }
    }

    /// One pass over every token kind, then over sessions
    pub async fn sweep(&self) -> StoreResult<SweepSummary> {
        let now = Utc::now();
        let mut summary = SweepSummary::default();

        for kind in TokenType::ALL {
            let ttl = chrono::Duration::from_std(self.ttl(kind)).unwrap_or(chrono::Duration::MAX);
            let Some(cutoff) = now.checked_sub_signed(ttl) else {
                continue;
            };

            let ids: Vec<_> = self
                .token_repo
                .fetch(&TokenFilter::stale(kind, cutoff))
                .await?
                .into_iter()
                .map(|token| token.id)
                .collect();
            if ids.is_empty() {
                continue;
            }

            summary.tokens += self.token_repo.delete(&ids).await?.len();
        }

        summary.sessions = self.session_store.delete_expired(now).await?;

        if summary != SweepSummary::default() {
            tracing::info!(
                tokens = summary.tokens,
                sessions = summary.sessions,
                "Stale tokens and sessions swept"
            );
        }
        Ok(summary)
    }

    /// Sweep now and then every `every`
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!(error = %e, "Sweep failed");
                }
            }
        })
    }
}
