//! Viewer checks
//!
//! The current user is resolved once per request by the presentation layer
//! and handed to use cases as `Option<&User>`.

use crate::domain::entity::user::User;
use crate::error::{AuthError, AuthResult};

/// Logged in means a stored user (positive id) is attached to the request
pub fn is_logged(current: Option<&User>) -> bool {
    current.is_some_and(|user| user.id.is_assigned())
}

pub fn has_administrative_privileges(current: Option<&User>) -> bool {
    is_logged(current) && current.is_some_and(User::is_administrative)
}

/// Never fails; anonymous requests get `None`
pub fn current_user(current: Option<&User>) -> Option<&User> {
    current.filter(|user| user.id.is_assigned())
}

pub(crate) fn require_logged(current: Option<&User>) -> AuthResult<&User> {
    current_user(current).ok_or(AuthError::NotLoggedIn)
}

pub(crate) fn require_logged_out(current: Option<&User>, err: AuthError) -> AuthResult<()> {
    if is_logged(current) { Err(err) } else { Ok(()) }
}

/// Anonymous callers get `NotLoggedIn`, logged-in non-admins `Unauthorized`
pub(crate) fn require_admin(current: Option<&User>) -> AuthResult<&User> {
    let user = require_logged(current)?;
    if user.is_administrative() {
        Ok(user)
    } else {
        Err(AuthError::Unauthorized)
    }
}
