//! In-Memory Store
//!
//! Used by tests and by `STORAGE=memory` local runs. Behaves like the
//! Postgres store for everything the use cases can observe: store-assigned
//! ids, unique login/email/slug, newest-first token listings and
//! unexpired-only session lookups.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::entity::{
    session::Session,
    token::{NewToken, Token, TokenFilter},
    user::{NewUser, SortOrder, User, UserFilter, UserList, UserSortField},
};
use crate::domain::repository::{SessionStore, TokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    login::Login,
    session_id::SessionId,
    slug::Slug,
    token::{TokenId, TokenType},
    user_id::UserId,
    user_password::RawPassword,
};
use crate::error::{AuthResult, StoreError, StoreResult, UniqueField};
use crate::infra::check_credentials;

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, User>,
    last_user_id: i64,
    tokens: BTreeMap<TokenId, Token>,
    last_token_id: i64,
    sessions: HashMap<String, Session>,
}

impl State {
    fn check_unique(&self, candidate: &User) -> StoreResult<()> {
        for other in self.users.values().filter(|u| u.id != candidate.id) {
            if other.login == candidate.login {
                return Err(StoreError::UniqueViolation(UniqueField::Login));
            }
            if other.email == candidate.email {
                return Err(StoreError::UniqueViolation(UniqueField::Email));
            }
            if other.slug == candidate.slug {
                return Err(StoreError::UniqueViolation(UniqueField::Slug));
            }
        }
        Ok(())
    }
}

/// Store for users, tokens and sessions behind one lock
#[derive(Default)]
pub struct InMemoryAccountsRepository {
    state: RwLock<State>,
    pepper: Option<Vec<u8>>,
    fail_writes: AtomicBool,
    fail_token_writes: AtomicBool,
}

impl InMemoryAccountsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pepper(mut self, pepper: Option<Vec<u8>>) -> Self {
        self.pepper = pepper;
        self
    }

    /// Make every write fail with `StoreError::Unavailable` until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only token writes fail, leaving users and sessions writable
    pub fn set_fail_token_writes(&self, fail: bool) {
        self.fail_token_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_token_writable(&self) -> StoreResult<()> {
        self.check_writable()?;
        if self.fail_token_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("token writes disabled".to_string()))
        } else {
            Ok(())
        }
    }

    async fn find_user(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|user| predicate(*user))
            .cloned()
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for InMemoryAccountsRepository {
    async fn create(&self, user: &NewUser) -> StoreResult<User> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let user = user.clone().into_user(UserId::new(state.last_user_id + 1));
        state.check_unique(&user)?;
        state.last_user_id += 1;
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &Slug) -> StoreResult<Option<User>> {
        Ok(self.find_user(|user| &user.slug == slug).await)
    }

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        Ok(self.find_user(|user| &user.email == email).await)
    }

    async fn find_by_login(&self, login: &Login) -> StoreResult<Option<User>> {
        Ok(self.find_user(|user| &user.login == login).await)
    }

    async fn get_by_credentials(&self, login: &str, password: &RawPassword) -> AuthResult<User> {
        let login = Login::normalize(login);
        let found = self.find_user(|user| user.login.as_str() == login).await;
        check_credentials(found, password, self.pepper.as_deref())
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let mut updated = user.clone();
        updated.slug = Slug::for_user(user.id, &user.login);
        state.check_unique(&updated)?;

        match state.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = updated.clone();
                Ok(updated)
            }
            None => Err(StoreError::Database(sqlx::Error::RowNotFound)),
        }
    }

    async fn fetch(&self, filter: &UserFilter) -> StoreResult<UserList> {
        let state = self.state.read().await;

        let mut matched: Vec<User> = state
            .users
            .values()
            .filter(|user| filter.matches(user))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            let ordering = match filter.sort_by {
                UserSortField::Id => a.id.cmp(&b.id),
                UserSortField::Login => a.login.as_str().cmp(b.login.as_str()),
                UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            let ordering = match filter.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then(a.id.cmp(&b.id))
        });

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();

        Ok(UserList { items, total })
    }

    async fn delete(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        Ok(ids.iter().filter_map(|id| state.users.remove(id)).collect())
    }
}

// ============================================================================
// Token Repository Implementation
// ============================================================================

impl TokenRepository for InMemoryAccountsRepository {
    async fn create(&self, token: &NewToken) -> StoreResult<Token> {
        self.check_token_writable()?;
        let mut state = self.state.write().await;

        state.last_token_id += 1;
        let token = token.clone().into_token(TokenId::new(state.last_token_id));
        state.tokens.insert(token.id, token.clone());

        Ok(token)
    }

    async fn fetch(&self, filter: &TokenFilter) -> StoreResult<Vec<Token>> {
        let state = self.state.read().await;

        let mut tokens: Vec<Token> = state
            .tokens
            .values()
            .filter(|token| filter.matches(token))
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(tokens)
    }

    async fn delete(&self, ids: &[TokenId]) -> StoreResult<Vec<Token>> {
        self.check_token_writable()?;
        let mut state = self.state.write().await;
        Ok(ids.iter().filter_map(|id| state.tokens.remove(id)).collect())
    }

    async fn delete_by_owner(&self, kind: TokenType, user_id: UserId) -> StoreResult<Vec<Token>> {
        self.check_token_writable()?;
        let mut state = self.state.write().await;

        let owned = TokenFilter::owned(kind, user_id);
        let ids: Vec<TokenId> = state
            .tokens
            .values()
            .filter(|token| owned.matches(token))
            .map(|token| token.id)
            .collect();

        Ok(ids.iter().filter_map(|id| state.tokens.remove(id)).collect())
    }
}

// ============================================================================
// Session Store Implementation
// ============================================================================

impl SessionStore for InMemoryAccountsRepository {
    async fn save(&self, session: &Session) -> StoreResult<()> {
        self.check_writable()?;
        self.state
            .write()
            .await
            .sessions
            .insert(session.id.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn find(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let now = Utc::now();
        Ok(self
            .state
            .read()
            .await
            .sessions
            .get(id.as_str())
            .filter(|session| !session.is_expired(now))
            .cloned())
    }

    async fn get_all(&self) -> StoreResult<Vec<Session>> {
        Ok(self.state.read().await.sessions.values().cloned().collect())
    }

    async fn delete_by_ids(&self, ids: &[SessionId]) -> StoreResult<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        for id in ids {
            state.sessions.remove(id.as_str());
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - state.sessions.len())
    }
}
