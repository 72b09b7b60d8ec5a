//! Accounts Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::{AuthConfig, TaskQueue};
use crate::presentation::handlers::{self, AccountsAppState, AccountsStore};
use crate::presentation::middleware::resolve_viewer;

/// Create the accounts router for any store implementation
///
/// Background tasks queued by the handlers go to `queue`; the caller owns
/// the worker draining it.
pub fn accounts_router<R>(repo: Arc<R>, queue: TaskQueue, config: Arc<AuthConfig>) -> Router
where
    R: AccountsStore,
{
    let state = AccountsAppState {
        repo,
        queue,
        config,
    };

    Router::new()
        .route("/auth/signup", post(handlers::sign_up::<R>))
        .route("/auth/login", post(handlers::login::<R>))
        .route("/auth/logout", post(handlers::logout::<R>))
        .route("/auth/me", get(handlers::me))
        .route("/auth/activate", post(handlers::activate::<R>))
        .route("/auth/activation-token", post(handlers::activation_token::<R>))
        .route("/auth/reset-password-token", post(handlers::reset_password_token::<R>))
        .route("/auth/reset-password", post(handlers::reset_password::<R>))
        .route(
            "/users",
            get(handlers::list_users::<R>)
                .post(handlers::create_user::<R>)
                .delete(handlers::delete_users::<R>),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user::<R>).patch(handlers::update_user::<R>),
        )
        .route("/users/slug/{slug}", get(handlers::get_user_by_slug::<R>))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer::<R>))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
