//! Sign Up Use Case
//!
//! Creates a new, unactivated account and mails the activation link.

use std::sync::Arc;

use crate::application::background::{BackgroundTask, TaskQueue};
use crate::application::config::AuthConfig;
use crate::application::{notification, viewer};
use crate::domain::entity::{
    token::NewToken,
    user::{NewUser, User},
};
use crate::domain::repository::{TokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    login::Login,
    token::TokenType,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

/// Sign up input
pub struct SignUpInput {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// Sign up use case
pub struct SignUpUseCase<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    queue: TaskQueue,
    config: Arc<AuthConfig>,
}

impl<U, T> SignUpUseCase<U, T>
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

    pub async fn execute(&self, current: Option<&User>, input: SignUpInput) -> AuthResult<User> {
        viewer::require_logged_out(current, AuthError::CannotCreateAccountWhileLoggedIn)?;

        let login = Login::new(&input.login)?;
        let raw_password = RawPassword::new(input.password)?;
        let email = Email::new(&input.email)?;
        let password = UserPassword::from_raw(&raw_password, self.config.pepper())
            .map_err(AuthError::CannotGeneratePassword)?;

        let user = self
            .user_repo
            .create(&NewUser::signup(login, email, password))
            .await
            .map_err(|e| AuthError::from_unique(e, AuthError::UserCannotBeCreated))?;

        // The account stays even when the token insert fails; the user can
        // request a new activation token later.
        let token = match self
            .token_repo
            .create(&NewToken::issue(TokenType::Activation, user.id))
            .await
        {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(
                    user_id = %user.id,
                    error = %e,
                    "Partial signup: user stored without activation token"
                );
                return Err(AuthError::ActivationTokenCannotBeCreated(e));
            }
        };

        self.queue.dispatch(BackgroundTask::SendEmail(notification::activation_email(
            &self.config,
            &user,
            &token.value,
        )));

        tracing::info!(user_id = %user.id, login = %user.login, "User signed up");

        Ok(user)
    }
}
