//! Viewer Middleware
//!
//! Resolves the session cookie into the current user once per request.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::cookie::extract_cookie;

use crate::application::ResolveViewerUseCase;
use crate::domain::value_object::session_id::SessionId;
use crate::presentation::handlers::{AccountsAppState, AccountsStore, Viewer};
use crate::presentation::i18n::{Language, LocalizedError};

/// Insert `Viewer` into the request extensions
///
/// Unknown or expired sessions leave the request anonymous. A store failure
/// ends the request with a localized 500.
pub async fn resolve_viewer<R>(
    State(state): State<AccountsAppState<R>>,
    mut req: Request,
    next: Next,
) -> Response
where
    R: AccountsStore,
{
    let session_id = extract_cookie(req.headers(), &state.config.session_cookie_name)
        .map(SessionId::from_raw);

    let user = match session_id {
        Some(session_id) => {
            let use_case = ResolveViewerUseCase::new(state.repo.clone(), state.repo.clone());
            match use_case.execute(&session_id).await {
                Ok(user) => user,
                Err(e) => {
                    let language = req
                        .headers()
                        .get(header::ACCEPT_LANGUAGE)
                        .and_then(|value| value.to_str().ok())
                        .map(Language::from_accept_language)
                        .unwrap_or_default();
                    return LocalizedError::new(e, language).into_response();
                }
            }
        }
        None => None,
    };

    if let Some(user) = &user {
        tracing::debug!(user_id = %user.id, "Viewer resolved");
    }
    req.extensions_mut().insert(Viewer(user));

    next.run(req).await
}
