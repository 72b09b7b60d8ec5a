//! Login Use Case

use std::sync::Arc;

use crate::application::viewer;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_password::RawPassword;
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub login: String,
    pub password: String,
}

/// Verifies credentials. Unknown login and wrong password are
/// indistinguishable to the caller.
pub struct LoginUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> LoginUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn execute(&self, current: Option<&User>, input: LoginInput) -> AuthResult<User> {
        viewer::require_logged_out(current, AuthError::CannotLoginWhileLoggedIn)?;

        let password = RawPassword::for_login(input.password);
        let user = self
            .user_repo
            .get_by_credentials(&input.login, &password)
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(user)
    }
}
