//! Session Use Cases
//!
//! Opening a session after signup/login, closing it on logout and turning a
//! session cookie back into the current user.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::AuthConfig;
use crate::application::viewer;
use crate::domain::entity::{session::Session, user::User};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::session_id::SessionId;
use crate::error::AuthResult;

/// Open a session for a freshly authenticated user
pub struct StartSessionUseCase<S>
where
    S: SessionStore,
{
    session_store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> StartSessionUseCase<S>
where
    S: SessionStore,
{
    pub fn new(session_store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_store,
            config,
        }
    }

    pub async fn execute(&self, user: &User) -> AuthResult<Session> {
        let session = Session::for_user(user.id, self.config.session_ttl_chrono());
        self.session_store.save(&session).await?;

        tracing::debug!(
            user_id = %user.id,
            session = %session.id.fingerprint(),
            "Session started"
        );

        Ok(session)
    }
}

/// Logout: requires a logged-in viewer and drops the presented session
pub struct LogoutUseCase<S>
where
    S: SessionStore,
{
    session_store: Arc<S>,
}

impl<S> LogoutUseCase<S>
where
    S: SessionStore,
{
    pub fn new(session_store: Arc<S>) -> Self {
        Self { session_store }
    }

    pub async fn execute(
        &self,
        current: Option<&User>,
        session_id: Option<&SessionId>,
    ) -> AuthResult<()> {
        let user = viewer::require_logged(current)?;

        if let Some(session_id) = session_id {
            self.session_store
                .delete_by_ids(std::slice::from_ref(session_id))
                .await?;
        }

        tracing::info!(user_id = %user.id, "User logged out");
        Ok(())
    }
}

/// Session cookie -> current user
///
/// Missing or expired sessions, sessions without an owner and owners that
/// no longer exist all resolve to an anonymous viewer.
pub struct ResolveViewerUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    user_repo: Arc<U>,
    session_store: Arc<S>,
}

impl<U, S> ResolveViewerUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    pub fn new(user_repo: Arc<U>, session_store: Arc<S>) -> Self {
        Self {
            user_repo,
            session_store,
        }
    }

    pub async fn execute(&self, session_id: &SessionId) -> AuthResult<Option<User>> {
        let Some(session) = self.session_store.find(session_id).await? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            return Ok(None);
        }
        let Some(user_id) = session.user_id() else {
            tracing::debug!(session = %session_id.fingerprint(), "Session without owner");
            return Ok(None);
        };

        Ok(self.user_repo.find_by_id(user_id).await?)
    }
}
