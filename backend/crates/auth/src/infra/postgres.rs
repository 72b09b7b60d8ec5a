//! PostgreSQL Repository Implementations
//!
//! Tables (created outside this crate):
//!
//! - `users (id BIGSERIAL, slug TEXT UNIQUE, login TEXT UNIQUE, email TEXT UNIQUE,
//!   password TEXT, role SMALLINT, activated BOOLEAN, created_at TIMESTAMPTZ)`
//! - `tokens (id BIGSERIAL, token_type TEXT, value TEXT, user_id BIGINT,
//!   created_at TIMESTAMPTZ)`
//! - `sessions (id TEXT PRIMARY KEY, data JSONB, expires_at TIMESTAMPTZ)`
//!
//! Unique constraints are told apart by name, so they must mention the
//! column (`users_login_key`, `users_email_key`, `users_slug_key`).

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::entity::{
    session::Session,
    token::{NewToken, Token, TokenFilter},
    user::{NewUser, User, UserFilter, UserList},
};
use crate::domain::repository::{SessionStore, TokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    login::Login,
    session_id::SessionId,
    slug::Slug,
    token::{TokenId, TokenType, TokenValue},
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
    user_role::UserRole,
};
use crate::error::{AuthResult, StoreError, StoreResult, UniqueField};
use crate::infra::check_credentials;

const USER_COLUMNS: &str = "id, slug, login, email, password, role, activated, created_at";
const TOKEN_COLUMNS: &str = "id, token_type, value, user_id, created_at";

/// PostgreSQL-backed store for users, tokens and sessions
#[derive(Clone)]
pub struct PgAccountsRepository {
    pool: PgPool,
    pepper: Option<Vec<u8>>,
}

impl PgAccountsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, pepper: None }
    }

    /// Pepper used by `get_by_credentials`; must match the one used to hash
    pub fn with_pepper(mut self, pepper: Option<Vec<u8>>) -> Self {
        self.pepper = pepper;
        self
    }

    async fn find_user_where(&self, column: &str, value: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }
}

/// Unique violations become typed errors, everything else stays a database error
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some(name) if name.contains("email") => UniqueField::Email,
                Some(name) if name.contains("slug") => UniqueField::Slug,
                _ => UniqueField::Login,
            };
            return StoreError::UniqueViolation(field);
        }
    }
    StoreError::Database(err)
}

fn like_pattern(input: &str) -> String {
    let escaped = input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE TRUE");
    if !filter.ids.is_empty() {
        let ids: Vec<i64> = filter.ids.iter().map(UserId::get).collect();
        qb.push(" AND id = ANY(").push_bind(ids).push(")");
    }
    if let Some(login) = &filter.login {
        qb.push(" AND login ILIKE ").push_bind(like_pattern(login));
    }
    if let Some(email) = &filter.email {
        qb.push(" AND email ILIKE ").push_bind(like_pattern(email));
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.id());
    }
    if filter.only_activated {
        qb.push(" AND activated");
    }
}

fn push_token_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TokenFilter) {
    qb.push(" WHERE TRUE");
    if let Some(kind) = filter.kind {
        qb.push(" AND token_type = ").push_bind(kind.code());
    }
    if let Some(value) = &filter.value {
        qb.push(" AND value = ")
            .push_bind(value.as_str().to_string());
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id.get());
    }
    if let Some(cutoff) = filter.created_before {
        qb.push(" AND created_at < ").push_bind(cutoff);
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAccountsRepository {
    async fn create(&self, user: &NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (login, email, password, role, activated, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user.login.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_phc_string())
        .bind(user.role.id())
        .bind(user.activated)
        .bind(user.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        // The slug embeds the id, so it is written once the id exists
        let created = user.clone().into_user(UserId::new(id));
        sqlx::query("UPDATE users SET slug = $2 WHERE id = $1")
            .bind(id)
            .bind(created.slug.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;

        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_slug(&self, slug: &Slug) -> StoreResult<Option<User>> {
        self.find_user_where("slug", slug.as_str()).await
    }

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        self.find_user_where("email", email.as_str()).await
    }

    async fn find_by_login(&self, login: &Login) -> StoreResult<Option<User>> {
        self.find_user_where("login", login.as_str()).await
    }

    async fn get_by_credentials(&self, login: &str, password: &RawPassword) -> AuthResult<User> {
        let found = self
            .find_user_where("login", &Login::normalize(login))
            .await?;
        check_credentials(found, password, self.pepper.as_deref())
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        let slug = Slug::for_user(user.id, &user.login);

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                slug = $2,
                login = $3,
                email = $4,
                password = $5,
                role = $6,
                activated = $7
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.get())
        .bind(slug.as_str())
        .bind(user.login.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_phc_string())
        .bind(user.role.id())
        .bind(user.activated)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.into_user()
    }

    async fn fetch(&self, filter: &UserFilter) -> StoreResult<UserList> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filter(&mut select, filter);
        select
            .push(format!(
                " ORDER BY {} {}, id ASC",
                filter.sort_by.column(),
                filter.order.keyword()
            ))
            .push(" LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(UserList {
            items: rows
                .into_iter()
                .map(UserRow::into_user)
                .collect::<StoreResult<_>>()?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn delete(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let ids: Vec<i64> = ids.iter().map(UserId::get).collect();

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "DELETE FROM users WHERE id = ANY($1) RETURNING {USER_COLUMNS}"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }
}

// ============================================================================
// Token Repository Implementation
// ============================================================================

impl TokenRepository for PgAccountsRepository {
    async fn create(&self, token: &NewToken) -> StoreResult<Token> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tokens (token_type, value, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(token.kind.code())
        .bind(token.value.as_str())
        .bind(token.user_id.get())
        .bind(token.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(token.clone().into_token(TokenId::new(id)))
    }

    async fn fetch(&self, filter: &TokenFilter) -> StoreResult<Vec<Token>> {
        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {TOKEN_COLUMNS} FROM tokens"));
        push_token_filter(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC");

        let rows = select
            .build_query_as::<TokenRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TokenRow::into_token).collect()
    }

    async fn delete(&self, ids: &[TokenId]) -> StoreResult<Vec<Token>> {
        let ids: Vec<i64> = ids.iter().map(TokenId::get).collect();

        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "DELETE FROM tokens WHERE id = ANY($1) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TokenRow::into_token).collect()
    }

    async fn delete_by_owner(&self, kind: TokenType, user_id: UserId) -> StoreResult<Vec<Token>> {
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "DELETE FROM tokens WHERE token_type = $1 AND user_id = $2 RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(kind.code())
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TokenRow::into_token).collect()
    }
}

// ============================================================================
// Session Store Implementation
// ============================================================================

impl SessionStore for PgAccountsRepository {
    async fn save(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                data = EXCLUDED.data,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session.id.as_str())
        .bind(Json(&session.values))
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, data, expires_at FROM sessions WHERE id = $1 AND expires_at > $2",
        )
        .bind(id.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn get_all(&self) -> StoreResult<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>("SELECT id, data, expires_at FROM sessions")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(SessionRow::into_session).collect())
    }

    async fn delete_by_ids(&self, ids: &[SessionId]) -> StoreResult<()> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();

        sqlx::query("DELETE FROM sessions WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

fn decode_error(message: String) -> StoreError {
    StoreError::Database(sqlx::Error::Decode(message.into()))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    slug: Option<String>,
    login: String,
    email: String,
    password: String,
    role: i16,
    activated: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> StoreResult<User> {
        let id = UserId::new(self.id);
        let login = Login::from_db(self.login);
        let password = UserPassword::from_phc_string(self.password)
            .map_err(|e| decode_error(format!("user {}: {e}", self.id)))?;
        let role = UserRole::from_id(self.role)
            .map_err(|e| decode_error(format!("user {}: {e}", self.id)))?;

        Ok(User {
            slug: self
                .slug
                .map(Slug::from_db)
                .unwrap_or_else(|| Slug::for_user(id, &login)),
            id,
            login,
            email: Email::from_db(self.email),
            password,
            role,
            activated: self.activated,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: i64,
    token_type: String,
    value: String,
    user_id: i64,
    created_at: DateTime<Utc>,
}

impl TokenRow {
    fn into_token(self) -> StoreResult<Token> {
        let kind = TokenType::from_code(&self.token_type).ok_or_else(|| {
            decode_error(format!("token {}: unknown type {}", self.id, self.token_type))
        })?;

        Ok(Token {
            id: TokenId::new(self.id),
            kind,
            value: TokenValue::from_input(self.value),
            created_at: self.created_at,
            user_id: UserId::new(self.user_id),
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    data: Json<Map<String, Value>>,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: SessionId::from_raw(self.id),
            values: self.data.0,
            expires_at: self.expires_at,
        }
    }
}
