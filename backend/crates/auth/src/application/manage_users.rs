//! User Administration Use Case
//!
//! Listing, creating, updating and deleting accounts is reserved to
//! administrators. Profile reads by id or slug are public.

use std::sync::Arc;

use crate::application::background::{BackgroundTask, TaskQueue};
use crate::application::config::AuthConfig;
use crate::application::viewer;
use crate::domain::entity::user::{NewUser, User, UserChanges, UserFilter, UserList};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email,
    login::Login,
    slug::Slug,
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// Account created by an administrator
pub struct CreateUserInput {
    pub login: String,
    pub email: String,
    pub password: String,
    /// Role code (`default` / `administrative`); default role when absent
    pub role: Option<String>,
    pub activated: Option<bool>,
}

/// Partial update; only present fields are validated and written
#[derive(Default)]
pub struct UpdateUserInput {
    pub login: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub activated: Option<bool>,
}

pub struct ManageUsersUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    queue: TaskQueue,
    config: Arc<AuthConfig>,
}

impl<U> ManageUsersUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, queue: TaskQueue, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            queue,
            config,
        }
    }

    pub async fn fetch(&self, current: Option<&User>, filter: UserFilter) -> AuthResult<UserList> {
        viewer::require_admin(current)?;
        Ok(self.user_repo.fetch(&filter.normalized()).await?)
    }

    pub async fn get_by_id(&self, id: UserId) -> AuthResult<User> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn get_by_slug(&self, slug: &str) -> AuthResult<User> {
        self.user_repo
            .find_by_slug(&Slug::from_db(slug))
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn create(&self, current: Option<&User>, input: CreateUserInput) -> AuthResult<User> {
        let admin = viewer::require_admin(current)?;

        let login = Login::new(&input.login)?;
        let raw_password = RawPassword::new(input.password)?;
        let email = Email::new(&input.email)?;
        let role = match input.role.as_deref() {
            Some(code) => UserRole::from_code(code)?,
            None => UserRole::Default,
        };

        let mut new_user = NewUser::signup(login, email, self.hash(&raw_password)?);
        new_user.role = role;
        new_user.activated = input.activated.unwrap_or(false);

        let user = self
            .user_repo
            .create(&new_user)
            .await
            .map_err(|e| AuthError::from_unique(e, AuthError::UserCannotBeCreated))?;

        tracing::info!(user_id = %user.id, admin_id = %admin.id, "User created");
        Ok(user)
    }

    pub async fn update(
        &self,
        current: Option<&User>,
        id: UserId,
        input: UpdateUserInput,
    ) -> AuthResult<User> {
        let admin = viewer::require_admin(current)?;

        let changes = self.validate_changes(input)?;
        let mut user = self
            .user_repo
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if changes.is_empty() {
            return Ok(user);
        }

        user.apply(changes);
        let user = self
            .user_repo
            .update(&user)
            .await
            .map_err(|e| AuthError::from_unique(e, AuthError::UserCannotBeUpdated))?;

        tracing::info!(user_id = %user.id, admin_id = %admin.id, "User updated");
        Ok(user)
    }

    /// Returns the users that existed; their tokens and sessions are removed
    /// in the background
    pub async fn delete(&self, current: Option<&User>, ids: &[UserId]) -> AuthResult<Vec<User>> {
        let admin = viewer::require_admin(current)?;
        if ids.contains(&admin.id) {
            return Err(AuthError::CannotDeleteOwnAccount);
        }

        let deleted = self.user_repo.delete(ids).await?;
        for user in &deleted {
            self.queue
                .dispatch(BackgroundTask::DeleteUserData { user_id: user.id });
        }

        tracing::info!(admin_id = %admin.id, deleted = deleted.len(), "Users deleted");
        Ok(deleted)
    }

    fn validate_changes(&self, input: UpdateUserInput) -> AuthResult<UserChanges> {
        let password = match input.password {
            Some(raw) => Some(self.hash(&RawPassword::new(raw)?)?),
            None => None,
        };

        Ok(UserChanges {
            login: input.login.as_deref().map(Login::new).transpose()?,
            email: input.email.as_deref().map(Email::new).transpose()?,
            password,
            role: input.role.as_deref().map(UserRole::from_code).transpose()?,
            activated: input.activated,
        })
    }

    fn hash(&self, raw: &RawPassword) -> AuthResult<UserPassword> {
        UserPassword::from_raw(raw, self.config.pepper()).map_err(AuthError::CannotGeneratePassword)
    }
}
