//! Activate Account Use Case

use std::sync::Arc;

use crate::application::background::{BackgroundTask, TaskQueue};
use crate::domain::entity::{token::TokenFilter, user::User};
use crate::domain::repository::{TokenRepository, UserRepository};
use crate::domain::value_object::{
    token::{TokenType, TokenValue},
    user_id::UserId,
};
use crate::error::{AuthError, AuthResult};

pub struct ActivateUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    queue: TaskQueue,
}

impl<U, T> ActivateUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    pub fn new(user_repo: Arc<U>, token_repo: Arc<T>, queue: TaskQueue) -> Self {
        Self {
            user_repo,
            token_repo,
            queue,
        }
    }

    pub async fn execute(&self, user_id: UserId, token: TokenValue) -> AuthResult<User> {
        let mut user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.activated {
            return Err(AuthError::AccountHasBeenActivated);
        }

        let found = self
            .token_repo
            .fetch(&TokenFilter::exact(TokenType::Activation, token.clone(), user_id))
            .await?;
        if !found
            .iter()
            .any(|t| t.matches(TokenType::Activation, &token, user_id))
        {
            return Err(AuthError::InvalidActivationToken);
        }

        // Two concurrent activations can both get here; the second write
        // sets the same flag again.
        user.activated = true;
        let user = self
            .user_repo
            .update(&user)
            .await
            .map_err(AuthError::AccountCannotBeActivated)?;

        self.queue.dispatch(BackgroundTask::DeleteUserTokens {
            kind: TokenType::Activation,
            user_id,
        });

        tracing::info!(user_id = %user.id, "Account activated");

        Ok(user)
    }
}
