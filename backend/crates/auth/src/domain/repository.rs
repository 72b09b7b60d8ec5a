//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    session::Session,
    token::{NewToken, Token, TokenFilter},
    user::{NewUser, User, UserFilter, UserList},
};
use crate::domain::value_object::{
    email::Email,
    login::Login,
    session_id::SessionId,
    slug::Slug,
    token::{TokenId, TokenType},
    user_id::UserId,
    user_password::RawPassword,
};
use crate::error::{AuthResult, StoreResult};

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a user; the store assigns id and slug
    ///
    /// Unique violations are reported as `StoreError::UniqueViolation`.
    async fn create(&self, user: &NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_by_slug(&self, slug: &Slug) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>>;

    async fn find_by_login(&self, login: &Login) -> StoreResult<Option<User>>;

    /// Look up by login and verify the password
    ///
    /// Unknown login and wrong password both yield
    /// `AuthError::InvalidCredentials`.
    async fn get_by_credentials(&self, login: &str, password: &RawPassword) -> AuthResult<User>;

    /// Persist every field of `user`, recomputing the slug
    async fn update(&self, user: &User) -> StoreResult<User>;

    async fn fetch(&self, filter: &UserFilter) -> StoreResult<UserList>;

    /// Delete and return the users that existed
    async fn delete(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;
}

/// Token repository trait
#[trait_variant::make(TokenRepository: Send)]
pub trait LocalTokenRepository {
    async fn create(&self, token: &NewToken) -> StoreResult<Token>;

    /// Tokens matching the filter, newest first
    async fn fetch(&self, filter: &TokenFilter) -> StoreResult<Vec<Token>>;

    async fn delete(&self, ids: &[TokenId]) -> StoreResult<Vec<Token>>;

    async fn delete_by_owner(&self, kind: TokenType, user_id: UserId) -> StoreResult<Vec<Token>>;
}

/// Session store trait
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Insert or replace
    async fn save(&self, session: &Session) -> StoreResult<()>;

    /// Unexpired session by id
    async fn find(&self, id: &SessionId) -> StoreResult<Option<Session>>;

    async fn get_all(&self) -> StoreResult<Vec<Session>>;

    async fn delete_by_ids(&self, ids: &[SessionId]) -> StoreResult<()>;

    /// Drop sessions whose expiry is at or before `now`; returns how many
    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}
