//! Password Reset Use Cases
//!
//! Two steps: a reset token is mailed to the account's address, then
//! presenting the token replaces the password with a generated one which is
//! mailed once. Consuming a token also ends every session of the account.

use std::sync::Arc;

use chrono::Utc;
use platform::rate_limit::ThrottleDecision;

use crate::application::background::{BackgroundTask, TaskQueue};
use crate::application::config::AuthConfig;
use crate::application::notification;
use crate::application::throttle::check_token_throttle;
use crate::domain::entity::token::{NewToken, TokenFilter};
use crate::domain::repository::{TokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    token::{TokenType, TokenValue},
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

// ============================================================================
// Step 1: token
// ============================================================================

pub struct GenerateResetPasswordTokenUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    queue: TaskQueue,
    config: Arc<AuthConfig>,
}

impl<U, T> GenerateResetPasswordTokenUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        token_repo: Arc<T>,
        queue: TaskQueue,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            queue,
            config,
        }
    }

    pub async fn execute(&self, email: &str) -> AuthResult<()> {
        // A malformed address cannot belong to anyone
        let Ok(email) = Email::new(email) else {
            return Err(AuthError::UserNotFound);
        };
        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let decision = check_token_throttle(
            self.token_repo.as_ref(),
            &self.config.token_throttle(),
            TokenType::ResetPassword,
            user.id,
        )
        .await?;
        if let ThrottleDecision::Rejected { retry_after_secs } = decision {
            return Err(AuthError::ReachedLimitOfResetPasswordTokens { retry_after_secs });
        }

        let token = self
            .token_repo
            .create(&NewToken::issue(TokenType::ResetPassword, user.id))
            .await
            .map_err(AuthError::ResetPasswordTokenCannotBeCreated)?;

        self.queue
            .dispatch(BackgroundTask::SendEmail(notification::reset_password_token_email(
                &self.config,
                &user,
                &token.value,
            )));

        tracing::info!(user_id = %user.id, "Reset password token generated");
        Ok(())
    }
}

// ============================================================================
// Step 2: reset
// ============================================================================

pub struct ResetPasswordUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    queue: TaskQueue,
    config: Arc<AuthConfig>,
}

impl<U, T> ResetPasswordUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        token_repo: Arc<T>,
        queue: TaskQueue,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            queue,
            config,
        }
    }

    pub async fn execute(&self, user_id: UserId, token: TokenValue) -> AuthResult<()> {
        let mut user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self
            .token_repo
            .fetch(&TokenFilter::exact(TokenType::ResetPassword, token.clone(), user_id))
            .await?
            .into_iter()
            .find(|t| t.matches(TokenType::ResetPassword, &token, user_id))
            .ok_or(AuthError::InvalidResetPasswordToken)?;

        if token.is_expired(self.config.reset_password_token_ttl, Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        let new_password = RawPassword::generate();
        user.password = UserPassword::from_raw(&new_password, self.config.pepper())
            .map_err(AuthError::CannotGeneratePassword)?;
        let user = self
            .user_repo
            .update(&user)
            .await
            .map_err(AuthError::UserCannotBeUpdated)?;

        // Independent follow-ups; one failing does not stop the others
        self.queue.dispatch(BackgroundTask::DeleteTokens {
            ids: vec![token.id],
        });
        self.queue
            .dispatch(BackgroundTask::SendEmail(notification::new_password_email(
                &self.config,
                &user,
                new_password.expose(),
            )));
        self.queue
            .dispatch(BackgroundTask::InvalidateSessions { user_id: user.id });

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }
}
