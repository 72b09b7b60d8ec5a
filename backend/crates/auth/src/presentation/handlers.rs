//! HTTP Handlers
//!
//! Each handler resolves its inputs, calls one use case and localizes the
//! error. Session cookies are set on signup/login and cleared on logout.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header, request::Parts};
use axum::response::{IntoResponse, Response};
use std::convert::Infallible;
use std::sync::Arc;

use platform::cookie::{delete_cookie_header, extract_cookie, set_cookie_header};

use crate::application::{
    ActivateUseCase, AuthConfig, GenerateActivationTokenUseCase,
    GenerateResetPasswordTokenUseCase, LoginUseCase, LogoutUseCase, ManageUsersUseCase,
    ResetPasswordUseCase, SignUpUseCase, StartSessionUseCase, TaskQueue, viewer,
};
use crate::domain::entity::user::User;
use crate::domain::repository::{SessionStore, TokenRepository, UserRepository};
use crate::domain::value_object::{session_id::SessionId, token::TokenValue, user_id::UserId};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    CreateUserRequest, DeleteUsersRequest, HealthResponse, LoginRequest, ResetPasswordTokenRequest,
    SignUpRequest, TokenRequest, UpdateUserRequest, UserListQuery, UserListResponse, UserResponse,
};
use crate::presentation::i18n::{Language, LocalizedError};

/// Everything the accounts routes need from storage
pub trait AccountsStore:
    UserRepository + TokenRepository + SessionStore + Send + Sync + 'static
{
}

impl<R> AccountsStore for R where
    R: UserRepository + TokenRepository + SessionStore + Send + Sync + 'static
{
}

/// Shared state for accounts handlers
pub struct AccountsAppState<R>
where
    R: AccountsStore,
{
    pub repo: Arc<R>,
    pub queue: TaskQueue,
    pub config: Arc<AuthConfig>,
}

impl<R> Clone for AccountsAppState<R>
where
    R: AccountsStore,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            queue: self.queue.clone(),
            config: self.config.clone(),
        }
    }
}

/// User attached to the request by `resolve_viewer`; anonymous when absent
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

type HandlerResult<T> = Result<T, LocalizedError>;

trait Localize<T> {
    fn localize(self, language: Language) -> HandlerResult<T>;
}

impl<T> Localize<T> for AuthResult<T> {
    fn localize(self, language: Language) -> HandlerResult<T> {
        self.map_err(|e| LocalizedError::new(e, language))
    }
}

fn payload<T>(result: Result<Json<T>, JsonRejection>, language: Language) -> HandlerResult<T> {
    result
        .map(|Json(value)| value)
        .map_err(|e| AuthError::InvalidPayload(e.body_text()))
        .localize(language)
}

fn path<T>(result: Result<Path<T>, PathRejection>, language: Language) -> HandlerResult<T> {
    result
        .map(|Path(value)| value)
        .map_err(|e| AuthError::InvalidPayload(e.body_text()))
        .localize(language)
}

/// Open a session for `user` and answer with its cookie
async fn respond_with_session<R>(
    state: &AccountsAppState<R>,
    user: &User,
    status: StatusCode,
    language: Language,
) -> HandlerResult<Response>
where
    R: AccountsStore,
{
    let session = StartSessionUseCase::new(state.repo.clone(), state.config.clone())
        .execute(user)
        .await
        .localize(language)?;

    let body = Json(UserResponse::private(user));
    match set_cookie_header(&state.config.cookie(), session.id.as_str()) {
        Some(cookie) => Ok((status, [(header::SET_COOKIE, cookie)], body).into_response()),
        None => {
            tracing::error!("Session cookie header could not be built");
            Ok((status, body).into_response())
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

/// POST /auth/signup
pub async fn sign_up<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    req: Result<Json<SignUpRequest>, JsonRejection>,
) -> HandlerResult<Response>
where
    R: AccountsStore,
{
    let req = payload(req, language)?;

    let use_case = SignUpUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.queue.clone(),
        state.config.clone(),
    );
    let user = use_case
        .execute(viewer.user(), req.into())
        .await
        .localize(language)?;

    respond_with_session(&state, &user, StatusCode::CREATED, language).await
}

/// POST /auth/login
pub async fn login<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> HandlerResult<Response>
where
    R: AccountsStore,
{
    let req = payload(req, language)?;

    let user = LoginUseCase::new(state.repo.clone())
        .execute(viewer.user(), req.into())
        .await
        .localize(language)?;

    respond_with_session(&state, &user, StatusCode::OK, language).await
}

/// POST /auth/logout
pub async fn logout<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    headers: HeaderMap,
) -> HandlerResult<Response>
where
    R: AccountsStore,
{
    let session_id =
        extract_cookie(&headers, &state.config.session_cookie_name).map(SessionId::from_raw);

    LogoutUseCase::new(state.repo.clone())
        .execute(viewer.user(), session_id.as_ref())
        .await
        .localize(language)?;

    Ok(match delete_cookie_header(&state.config.cookie()) {
        Some(cookie) => (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// GET /auth/me
pub async fn me(viewer: Viewer) -> Json<Option<UserResponse>> {
    Json(viewer::current_user(viewer.user()).map(UserResponse::private))
}

/// POST /auth/activate
pub async fn activate<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    req: Result<Json<TokenRequest>, JsonRejection>,
) -> HandlerResult<Json<UserResponse>>
where
    R: AccountsStore,
{
    let req = payload(req, language)?;

    let user = ActivateUseCase::new(state.repo.clone(), state.repo.clone(), state.queue.clone())
        .execute(UserId::new(req.user_id), TokenValue::from_input(req.token))
        .await
        .localize(language)?;

    Ok(Json(UserResponse::public(&user)))
}

/// POST /auth/activation-token
pub async fn activation_token<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
) -> HandlerResult<StatusCode>
where
    R: AccountsStore,
{
    GenerateActivationTokenUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.queue.clone(),
        state.config.clone(),
    )
    .execute_for_current(viewer.user())
    .await
    .localize(language)?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/reset-password-token
pub async fn reset_password_token<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    req: Result<Json<ResetPasswordTokenRequest>, JsonRejection>,
) -> HandlerResult<StatusCode>
where
    R: AccountsStore,
{
    let req = payload(req, language)?;

    GenerateResetPasswordTokenUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.queue.clone(),
        state.config.clone(),
    )
    .execute(&req.email)
    .await
    .localize(language)?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/reset-password
pub async fn reset_password<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    req: Result<Json<TokenRequest>, JsonRejection>,
) -> HandlerResult<StatusCode>
where
    R: AccountsStore,
{
    let req = payload(req, language)?;

    ResetPasswordUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.queue.clone(),
        state.config.clone(),
    )
    .execute(UserId::new(req.user_id), TokenValue::from_input(req.token))
    .await
    .localize(language)?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Users
// ============================================================================

fn manage_users<R>(state: &AccountsAppState<R>) -> ManageUsersUseCase<R>
where
    R: AccountsStore,
{
    ManageUsersUseCase::new(state.repo.clone(), state.queue.clone(), state.config.clone())
}

/// GET /users
pub async fn list_users<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> HandlerResult<Json<UserListResponse>>
where
    R: AccountsStore,
{
    let filter = query
        .map_err(|e| AuthError::InvalidPayload(e.body_text()))
        .and_then(|Query(query)| query.into_filter())
        .localize(language)?;

    let list = manage_users(&state)
        .fetch(viewer.user(), filter)
        .await
        .localize(language)?;

    Ok(Json(list.into()))
}

/// POST /users
pub async fn create_user<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    req: Result<Json<CreateUserRequest>, JsonRejection>,
) -> HandlerResult<(StatusCode, Json<UserResponse>)>
where
    R: AccountsStore,
{
    let req = payload(req, language)?;

    let user = manage_users(&state)
        .create(viewer.user(), req.into())
        .await
        .localize(language)?;

    Ok((StatusCode::CREATED, Json(UserResponse::private(&user))))
}

/// DELETE /users
pub async fn delete_users<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    req: Result<Json<DeleteUsersRequest>, JsonRejection>,
) -> HandlerResult<Json<Vec<UserResponse>>>
where
    R: AccountsStore,
{
    let req = payload(req, language)?;
    let ids: Vec<UserId> = req.ids.into_iter().map(UserId::new).collect();

    let deleted = manage_users(&state)
        .delete(viewer.user(), &ids)
        .await
        .localize(language)?;

    Ok(Json(deleted.iter().map(UserResponse::private).collect()))
}

/// GET /users/{id}
pub async fn get_user<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    id: Result<Path<i64>, PathRejection>,
) -> HandlerResult<Json<UserResponse>>
where
    R: AccountsStore,
{
    let id = path(id, language)?;

    let user = manage_users(&state)
        .get_by_id(UserId::new(id))
        .await
        .localize(language)?;

    Ok(Json(UserResponse::for_viewer(&user, viewer.user())))
}

/// PATCH /users/{id}
pub async fn update_user<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    id: Result<Path<i64>, PathRejection>,
    req: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> HandlerResult<Json<UserResponse>>
where
    R: AccountsStore,
{
    let id = path(id, language)?;
    let req = payload(req, language)?;

    let user = manage_users(&state)
        .update(viewer.user(), UserId::new(id), req.into())
        .await
        .localize(language)?;

    Ok(Json(UserResponse::private(&user)))
}

/// GET /users/slug/{slug}
pub async fn get_user_by_slug<R>(
    State(state): State<AccountsAppState<R>>,
    language: Language,
    viewer: Viewer,
    slug: Result<Path<String>, PathRejection>,
) -> HandlerResult<Json<UserResponse>>
where
    R: AccountsStore,
{
    let slug = path(slug, language)?;

    let user = manage_users(&state)
        .get_by_slug(&slug)
        .await
        .localize(language)?;

    Ok(Json(UserResponse::for_viewer(&user, viewer.user())))
}

/// GET /healthz
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
