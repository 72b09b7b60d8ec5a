//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{CreateUserInput, LoginInput, SignUpInput, UpdateUserInput};
use crate::domain::entity::user::{SortOrder, User, UserFilter, UserList, UserSortField};
use crate::domain::value_object::{user_id::UserId, user_role::UserRole};
use crate::error::AuthError;

// ============================================================================
// Users
// ============================================================================

/// User as seen by clients; the email is only shown to its owner and to
/// administrators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub slug: String,
    pub login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: UserRole,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn public(user: &User) -> Self {
        Self {
            id: user.id.get(),
            slug: user.slug.as_str().to_string(),
            login: user.login.as_str().to_string(),
            email: None,
            role: user.role,
            activated: user.activated,
            created_at: user.created_at,
        }
    }

    pub fn private(user: &User) -> Self {
        Self {
            email: Some(user.email.as_str().to_string()),
            ..Self::public(user)
        }
    }

    /// Private view for the user themselves and for administrators
    pub fn for_viewer(user: &User, viewer: Option<&User>) -> Self {
        match viewer {
            Some(v) if v.id == user.id || v.is_administrative() => Self::private(user),
            _ => Self::public(user),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: u64,
}

impl From<UserList> for UserListResponse {
    fn from(list: UserList) -> Self {
        Self {
            items: list.items.iter().map(UserResponse::private).collect(),
            total: list.total,
        }
    }
}

/// `GET /users` query string; `ids` is comma separated
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub ids: Option<String>,
    pub login: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub only_activated: bool,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl UserListQuery {
    pub fn into_filter(self) -> Result<UserFilter, AuthError> {
        let ids = match self.ids.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| {
                    id.parse::<UserId>()
                        .map_err(|_| AuthError::InvalidPayload(format!("invalid user id {id}")))
                })
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };

        let sort_by = match self.sort_by.as_deref() {
            None | Some("id") => UserSortField::Id,
            Some("login") => UserSortField::Login,
            Some("createdAt") | Some("created_at") => UserSortField::CreatedAt,
            Some(other) => {
                return Err(AuthError::InvalidPayload(format!("cannot sort by {other}")));
            }
        };
        let order = match self.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(AuthError::InvalidPayload(format!("unknown order {other}")));
            }
        };

        let defaults = UserFilter::default();
        Ok(UserFilter {
            ids,
            login: self.login,
            email: self.email,
            role: self.role.as_deref().map(UserRole::from_code).transpose()?,
            only_activated: self.only_activated,
            sort_by,
            order,
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub login: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub activated: Option<bool>,
}

impl From<CreateUserRequest> for CreateUserInput {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            login: req.login,
            email: req.email,
            password: req.password,
            role: req.role,
            activated: req.activated,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub login: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub activated: Option<bool>,
}

impl From<UpdateUserRequest> for UpdateUserInput {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            login: req.login,
            email: req.email,
            password: req.password,
            role: req.role,
            activated: req.activated,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteUsersRequest {
    pub ids: Vec<i64>,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

impl From<SignUpRequest> for SignUpInput {
    fn from(req: SignUpRequest) -> Self {
        Self {
            login: req.login,
            email: req.email,
            password: req.password,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

impl From<LoginRequest> for LoginInput {
    fn from(req: LoginRequest) -> Self {
        Self {
            login: req.login,
            password: req.password,
        }
    }
}

/// Activation and password reset both present a user id and a token
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordTokenRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
