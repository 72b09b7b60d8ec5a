//! New Activation Token Use Case
//!
//! Re-sends the activation link, at most once per throttle interval.

use std::sync::Arc;

use platform::rate_limit::ThrottleDecision;

use crate::application::background::{BackgroundTask, TaskQueue};
use crate::application::config::AuthConfig;
use crate::application::throttle::check_token_throttle;
use crate::application::{notification, viewer};
use crate::domain::entity::{token::NewToken, user::User};
use crate::domain::repository::{TokenRepository, UserRepository};
use crate::domain::value_object::{token::TokenType, user_id::UserId};
use crate::error::{AuthError, AuthResult};

pub struct GenerateActivationTokenUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    queue: TaskQueue,
    config: Arc<AuthConfig>,
}

impl<U, T> GenerateActivationTokenUseCase<U, T>
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

    /// New token for the given account
    pub async fn execute(&self, user_id: UserId) -> AuthResult<()> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.issue(&user).await
    }

    /// New token for the logged-in viewer
    pub async fn execute_for_current(&self, current: Option<&User>) -> AuthResult<()> {
        let user = viewer::require_logged(current)?;
        self.issue(user).await
    }

    async fn issue(&self, user: &User) -> AuthResult<()> {
        if user.activated {
            return Err(AuthError::AccountHasBeenActivated);
        }

        let decision = check_token_throttle(
            self.token_repo.as_ref(),
            &self.config.token_throttle(),
            TokenType::Activation,
            user.id,
        )
        .await?;
        if let ThrottleDecision::Rejected { retry_after_secs } = decision {
            return Err(AuthError::ReachedLimitOfActivationTokens { retry_after_secs });
        }

        let token = self
            .token_repo
            .create(&NewToken::issue(TokenType::Activation, user.id))
            .await
            .map_err(AuthError::ActivationTokenCannotBeCreated)?;

        self.queue.dispatch(BackgroundTask::SendEmail(notification::activation_email(
            &self.config,
            user,
            &token.value,
        )));

        tracing::info!(user_id = %user.id, "Activation token generated");
        Ok(())
    }
}
